//! Root definitions and cross-platform path remapping
//!
//! A root is a named, per-platform absolute path prefix substitutable into
//! templates via `{root}` or `{root[name]}`. Roots also work standalone:
//! a concrete path can have its root prefix stripped back to the formattable
//! key, or swapped for another platform's value.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::parser::lexer::{self, Token};

/// Prefix for exported root environment variables
pub const ROOT_ENV_PREFIX: &str = "ANATOMY_ROOT";

/// Platforms a root may define a value for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Platform {
    Windows,
    Linux,
    Darwin,
}

impl Platform {
    /// Platform of the running process
    pub fn current() -> Self {
        match std::env::consts::OS {
            "windows" => Platform::Windows,
            "macos" => Platform::Darwin,
            _ => Platform::Linux,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Linux => "linux",
            Platform::Darwin => "darwin",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "windows" => Ok(Platform::Windows),
            "linux" => Ok(Platform::Linux),
            "darwin" | "macos" => Ok(Platform::Darwin),
            other => Err(format!("unknown platform `{}`", other)),
        }
    }
}

/// Normalize path separators to forward slashes
pub fn clean_path(path: &str) -> String {
    path.replace('\\', "/")
}

fn clean_root_value(value: &str) -> String {
    let mut value = clean_path(value);
    while value.ends_with('/') {
        value.pop();
    }
    value
}

/// One named root's path value per target platform
#[derive(Debug, Clone, PartialEq)]
pub struct RootItem {
    /// Ancestor names down to and including this root; empty for a
    /// single-root setup
    path: Vec<String>,
    /// Cleaned values in configuration order
    values: Vec<(Platform, String)>,
}

impl RootItem {
    pub fn new(path: Vec<String>, values: Vec<(Platform, String)>) -> Self {
        let values = values
            .into_iter()
            .map(|(platform, value)| (platform, clean_root_value(&value)))
            .collect();
        Self { path, values }
    }

    /// Last path segment; `None` for a single-root setup
    pub fn name(&self) -> Option<&str> {
        self.path.last().map(|s| s.as_str())
    }

    /// Replacement key for formatting, e.g. `root` or `root[work]`
    pub fn format_key(&self) -> String {
        let mut key = "root".to_string();
        for segment in &self.path {
            key.push('[');
            key.push_str(segment);
            key.push(']');
        }
        key
    }

    /// The formattable placeholder, e.g. `{root[work]}`
    pub fn placeholder(&self) -> String {
        format!("{{{}}}", self.format_key())
    }

    /// Cleaned value for one platform
    pub fn value(&self, platform: Platform) -> Option<&str> {
        self.values
            .iter()
            .find(|(p, _)| *p == platform)
            .map(|(_, v)| v.as_str())
    }

    /// Platforms this root defines a value for, in configuration order
    pub fn platforms(&self) -> impl Iterator<Item = Platform> + '_ {
        self.values.iter().map(|(p, _)| *p)
    }

    /// Replace a recognized root prefix with the formattable key.
    ///
    /// All platform values are tried; the remainder of the path is kept
    /// verbatim. Returns `None` when no platform value prefixes `path`.
    pub fn strip_to_key(&self, path: &str) -> Option<String> {
        let cleaned = clean_path(path);
        for (_, value) in &self.values {
            if let Some(rest) = cleaned.strip_prefix(value.as_str()) {
                return Some(format!("{}{}", self.placeholder(), rest));
            }
        }
        None
    }

    /// Remap a concrete path onto `dst`'s value for this root.
    ///
    /// With `src` given the path must start with that platform's value;
    /// without it the source platform is inferred by prefix scan. A path
    /// already under `dst`'s value is returned unchanged.
    pub fn remap(&self, path: &str, dst: Platform, src: Option<Platform>) -> Option<String> {
        let cleaned = clean_path(path);

        let Some(dst_value) = self.value(dst) else {
            warn!(
                root = %self.format_key(),
                platform = %dst,
                "root has no value for destination platform"
            );
            return None;
        };
        if cleaned.starts_with(dst_value) {
            return Some(cleaned);
        }

        if let Some(src) = src {
            let Some(src_value) = self.value(src) else {
                warn!(
                    root = %self.format_key(),
                    platform = %src,
                    "root has no value for source platform"
                );
                return None;
            };
            let rest = cleaned.strip_prefix(src_value)?;
            return Some(format!("{}{}", dst_value, rest));
        }

        for (_, value) in &self.values {
            if let Some(rest) = cleaned.strip_prefix(value.as_str()) {
                return Some(format!("{}{}", dst_value, rest));
            }
        }
        None
    }
}

/// Outcome of walking a bracket path through the root tree
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RootLookup<'a> {
    Item(&'a RootItem),
    /// Path ended on a nested level rather than a single root
    Branch,
    Missing,
    /// Path continued through a root item; `depth` counts the segments
    /// consumed before the item
    TooDeep { depth: usize },
}

/// A single root or a nested namespace of roots.
///
/// Leaves are reached only where all values at a configuration level are
/// platform path strings; a level mixing strings with nested tables is a
/// configuration error.
#[derive(Debug, Clone, PartialEq)]
pub enum RootTree {
    Item(RootItem),
    Branch(Vec<(String, RootTree)>),
}

impl RootTree {
    /// Build a root tree from raw configuration data.
    ///
    /// Configuration key order is preserved and drives match precedence in
    /// [`RootTree::strip_to_key`] and [`RootTree::remap`].
    pub fn from_toml(table: &toml::Table) -> Result<Self, ConfigError> {
        Self::parse_level(table, &[])
    }

    fn parse_level(table: &toml::Table, path: &[String]) -> Result<Self, ConfigError> {
        let path_label = || {
            if path.is_empty() {
                "roots".to_string()
            } else {
                path.join(".")
            }
        };

        let any_string = table.values().any(|v| !v.is_table());
        let any_table = table.values().any(|v| v.is_table());
        if any_string && any_table {
            return Err(ConfigError::MixedRootLevel { path: path_label() });
        }

        if any_string {
            let mut values = Vec::new();
            for (key, value) in table {
                let platform = Platform::from_str(key).map_err(|_| ConfigError::UnknownPlatform {
                    path: path_label(),
                    platform: key.clone(),
                })?;
                let raw = value.as_str().ok_or_else(|| ConfigError::InvalidRootValue {
                    path: path_label(),
                    platform: key.clone(),
                })?;
                if clean_root_value(raw).is_empty() {
                    return Err(ConfigError::EmptyRootValue {
                        path: path_label(),
                        platform: key.clone(),
                    });
                }
                values.push((platform, raw.to_string()));
            }
            return Ok(RootTree::Item(RootItem::new(path.to_vec(), values)));
        }

        let mut children = Vec::new();
        for (key, value) in table {
            let sub = value
                .as_table()
                .expect("non-table values were handled above");
            let mut child_path = path.to_vec();
            child_path.push(key.clone());
            children.push((key.clone(), Self::parse_level(sub, &child_path)?));
        }
        Ok(RootTree::Branch(children))
    }

    /// True when no roots are configured at all
    pub fn is_empty(&self) -> bool {
        matches!(self, RootTree::Branch(children) if children.is_empty())
    }

    /// Walk a bracket path below `root`; empty segments address the tree
    /// itself (the `{root}` placeholder).
    pub(crate) fn lookup(&self, segments: &[String]) -> RootLookup<'_> {
        let mut current = self;
        for (depth, segment) in segments.iter().enumerate() {
            match current {
                RootTree::Branch(children) => {
                    match children.iter().find(|(name, _)| name == segment) {
                        Some((_, child)) => current = child,
                        None => return RootLookup::Missing,
                    }
                }
                RootTree::Item(_) => return RootLookup::TooDeep { depth },
            }
        }
        match current {
            RootTree::Item(item) => RootLookup::Item(item),
            RootTree::Branch(_) => RootLookup::Branch,
        }
    }

    /// All root items, depth-first in configuration order
    pub fn items(&self) -> Vec<&RootItem> {
        let mut out = Vec::new();
        self.collect_items(&mut out);
        out
    }

    fn collect_items<'a>(&'a self, out: &mut Vec<&'a RootItem>) {
        match self {
            RootTree::Item(item) => out.push(item),
            RootTree::Branch(children) => {
                for (_, child) in children {
                    child.collect_items(out);
                }
            }
        }
    }

    /// Replace a recognized root prefix in `path` with its formattable key.
    ///
    /// Items are tried depth-first in configuration order; the first match
    /// wins.
    pub fn strip_to_key(&self, path: &str) -> Option<String> {
        for item in self.items() {
            if let Some(stripped) = item.strip_to_key(path) {
                debug!(root = %item.format_key(), "found matching root in path");
                return Some(stripped);
            }
        }
        warn!(path, "no matching root was found for path");
        None
    }

    /// Remap a concrete path onto `dst`'s root value, trying every root.
    ///
    /// Returns `None` when the path contains no recognizable root prefix;
    /// callers decide whether that is an error.
    pub fn remap(&self, path: &str, dst: Platform, src: Option<Platform>) -> Option<String> {
        for item in self.items() {
            if let Some(remapped) = item.remap(path, dst, src) {
                return Some(remapped);
            }
        }
        None
    }

    /// Format root placeholders in `text` with concrete values for
    /// `platform`, leaving every other placeholder untouched.
    ///
    /// This is the read-back half of a rootless path. Returns `None` when a
    /// root placeholder names an unknown root or the root has no value for
    /// `platform`.
    pub fn fill_root(&self, text: &str, platform: Platform) -> Option<String> {
        let mut out = String::with_capacity(text.len());
        for (token, span) in lexer::lex(text) {
            match &token {
                Token::Placeholder(p) if !p.inner && p.path.first().map(String::as_str) == Some("root") => {
                    match self.lookup(&p.path[1..]) {
                        RootLookup::Item(item) => match item.value(platform) {
                            Some(value) => out.push_str(value),
                            None => return None,
                        },
                        _ => return None,
                    }
                }
                _ => out.push_str(&text[span]),
            }
        }
        Some(out)
    }

    /// One environment pair per root, keyed by [`ROOT_ENV_PREFIX`] plus the
    /// upper-cased root path. A single-root setup produces exactly one bare
    /// key. Roots without a value for `platform` are skipped.
    pub fn environment_pairs(&self, platform: Platform) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for item in self.items() {
            let Some(value) = item.value(platform) else {
                warn!(
                    root = %item.format_key(),
                    platform = %platform,
                    "skipping environment pair, no value for platform"
                );
                continue;
            };
            let mut key = ROOT_ENV_PREFIX.to_string();
            for segment in &item.path {
                key.push('_');
                key.push_str(&segment.to_uppercase());
            }
            pairs.push((key, value.to_string()));
        }
        pairs
    }

    /// Every configured root value across all platforms
    pub fn all_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        for item in self.items() {
            for (_, value) in &item.values {
                out.push(value.clone());
            }
        }
        out
    }
}
