//! The anatomy façade combining a project's roots and templates

use std::path::Path;

use crate::config::AnatomyConfig;
use crate::context::Context;
use crate::error::ConfigError;
use crate::roots::{Platform, RootTree};
use crate::template::{ResolvedTree, TemplateResolver, TemplateTree};

/// One project's root definitions and template definitions.
///
/// Built from an [`AnatomyConfig`] in one validating step; configuration
/// problems surface here and a partially built value is never handed out.
/// All resolution operations are pure functions of the anatomy and the
/// given context, so a built anatomy is safe to share between threads.
/// Configuration reload means building a new `Anatomy` and swapping the
/// reference, never mutating in place.
#[derive(Debug, Clone)]
pub struct Anatomy {
    project: Option<String>,
    platform: Platform,
    roots: RootTree,
    templates: TemplateTree,
}

impl Anatomy {
    /// Build and validate an anatomy for the current platform
    pub fn new(config: AnatomyConfig) -> Result<Self, ConfigError> {
        Self::with_platform(config, Platform::current())
    }

    /// Build and validate an anatomy resolving root values for `platform`
    pub fn with_platform(config: AnatomyConfig, platform: Platform) -> Result<Self, ConfigError> {
        let roots = RootTree::from_toml(&config.roots)?;
        let templates = TemplateTree::from_toml(&config.templates)?;

        // Templates may use `{root}` or named roots, never both
        let root_keys = templates.root_keys();
        if root_keys.len() > 1 && root_keys.iter().any(|key| key == "root") {
            return Err(ConfigError::RootCombination { roots: root_keys });
        }

        Ok(Self {
            project: config.project,
            platform,
            roots,
            templates,
        })
    }

    /// Load, build and validate from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::new(AnatomyConfig::from_file(path)?)
    }

    /// Load, build and validate from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::new(AnatomyConfig::from_str(content)?)
    }

    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    /// Platform root values resolve against
    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn roots(&self) -> &RootTree {
        &self.roots
    }

    pub fn templates(&self) -> &TemplateTree {
        &self.templates
    }

    fn resolver<'a>(&'a self, context: &'a Context) -> TemplateResolver<'a> {
        let roots = (!self.roots.is_empty()).then_some(&self.roots);
        TemplateResolver::new(context, roots, self.platform)
    }

    /// Resolve every template against `context`; strict reads of the result
    /// fail on unsolved leaves
    pub fn resolve_all(&self, context: &Context) -> ResolvedTree {
        self.templates.resolve(&self.resolver(context), true)
    }

    /// Resolve every template against `context`; reads of the result return
    /// best-effort values without failing
    pub fn resolve_all_lenient(&self, context: &Context) -> ResolvedTree {
        self.templates.resolve(&self.resolver(context), false)
    }

    /// Replace a recognized root prefix in `path` with its formattable key
    pub fn strip_to_key(&self, path: &str) -> Option<String> {
        self.roots.strip_to_key(path)
    }

    /// Remap a path onto `dst`'s root value.
    ///
    /// Rootless input (`{root[work]}/...`) is first filled with this
    /// anatomy's platform values. Returns `None` when the path contains no
    /// recognizable root.
    pub fn remap(&self, path: &str, dst: Platform, src: Option<Platform>) -> Option<String> {
        if path.contains("{root") {
            let filled = self.roots.fill_root(path, self.platform)?;
            return self.roots.remap(&filled, dst, src);
        }
        self.roots.remap(path, dst, src)
    }

    /// Format root placeholders in `text` with this platform's values
    pub fn fill_root(&self, text: &str) -> Option<String> {
        self.roots.fill_root(text, self.platform)
    }

    /// Environment pairs for every root on this platform
    pub fn root_environment_pairs(&self) -> Vec<(String, String)> {
        self.roots.environment_pairs(self.platform)
    }

    /// Root names referenced by the templates.
    ///
    /// `None` when templates only use the unnamed `{root}`; an empty list
    /// when no template references a root at all.
    pub fn used_root_names(&self) -> Option<Vec<String>> {
        let keys = self.templates.root_keys();
        if keys.len() == 1 && keys[0] == "root" {
            return None;
        }
        Some(
            keys.iter()
                .filter_map(|key| {
                    let name = key.strip_prefix("root[")?;
                    let end = name.find(']')?;
                    Some(name[..end].to_string())
                })
                .collect(),
        )
    }
}
