//! Template definitions and their resolution
//!
//! Templates are loaded once from configuration: inner `{@key}` references
//! are expanded, every leaf is tokenized and parsed to an AST, and the
//! result is immutable. Per-call resolution then walks the parsed tree
//! against a context snapshot.

mod inner;
mod resolved;
mod resolver;

use crate::error::ConfigError;
use crate::parser::{self, Node};

pub use resolved::{ResolvedNode, ResolvedTemplate, ResolvedTree};
pub(crate) use resolver::TemplateResolver;

/// One raw template, parsed and ready for resolution
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateString {
    raw: String,
    nodes: Vec<Node>,
}

impl TemplateString {
    /// Parse template text; `name` identifies the template in error reports
    pub fn parse(name: &str, raw: &str) -> Result<Self, ConfigError> {
        let nodes = parser::parse(raw).map_err(|errors| {
            let report = errors
                .iter()
                .map(|error| error.format(raw, name))
                .collect::<Vec<_>>()
                .join("\n");
            ConfigError::TemplateSyntax {
                name: name.to_string(),
                report,
            }
        })?;
        Ok(Self {
            raw: raw.to_string(),
            nodes,
        })
    }

    /// The template exactly as configured
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub(crate) fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Root keys referenced by this template, e.g. `root` or `root[work]`
    pub fn root_keys(&self) -> Vec<String> {
        fn collect(nodes: &[Node], out: &mut Vec<String>) {
            for node in nodes {
                match node {
                    Node::Placeholder(p) if p.path.is_root() => {
                        let key = p.path.to_string();
                        if !out.contains(&key) {
                            out.push(key);
                        }
                    }
                    Node::Optional(children) => collect(children, out),
                    _ => {}
                }
            }
        }
        let mut out = Vec::new();
        collect(&self.nodes, &mut out);
        out
    }
}

/// One entry of a [`TemplateTree`]
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateEntry {
    Template(TemplateString),
    Group(TemplateTree),
}

/// Nested mapping of named templates, grouped by usage
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateTree {
    entries: Vec<(String, TemplateEntry)>,
}

impl TemplateTree {
    /// Build a template tree from raw configuration data.
    ///
    /// Inner references are expanded first, so failures there surface as
    /// configuration errors before any template is parsed.
    pub fn from_toml(table: &toml::Table) -> Result<Self, ConfigError> {
        let expanded = inner::resolve_inner_references(table)?;
        Self::build(&expanded, &[])
    }

    fn build(table: &toml::Table, path: &[String]) -> Result<Self, ConfigError> {
        let mut entries = Vec::new();
        for (key, value) in table {
            let mut entry_path = path.to_vec();
            entry_path.push(key.clone());
            let name = entry_path.join(".");
            match value {
                toml::Value::Table(sub) => {
                    entries.push((
                        key.clone(),
                        TemplateEntry::Group(Self::build(sub, &entry_path)?),
                    ));
                }
                toml::Value::String(text) => {
                    entries.push((
                        key.clone(),
                        TemplateEntry::Template(TemplateString::parse(&name, text)?),
                    ));
                }
                toml::Value::Integer(i) => {
                    entries.push((
                        key.clone(),
                        TemplateEntry::Template(TemplateString::parse(&name, &i.to_string())?),
                    ));
                }
                toml::Value::Float(f) => {
                    entries.push((
                        key.clone(),
                        TemplateEntry::Template(TemplateString::parse(&name, &f.to_string())?),
                    ));
                }
                other => {
                    return Err(ConfigError::InvalidTemplateValue {
                        name,
                        kind: other.type_str().to_string(),
                    });
                }
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[(String, TemplateEntry)] {
        &self.entries
    }

    /// Distinct root keys referenced anywhere in the tree, first-seen order
    pub fn root_keys(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_root_keys(&mut out);
        out
    }

    fn collect_root_keys(&self, out: &mut Vec<String>) {
        for (_, entry) in &self.entries {
            match entry {
                TemplateEntry::Template(template) => {
                    for key in template.root_keys() {
                        if !out.contains(&key) {
                            out.push(key);
                        }
                    }
                }
                TemplateEntry::Group(sub) => sub.collect_root_keys(out),
            }
        }
    }

    /// Resolve every leaf with `resolver`, mirroring the tree's nesting
    pub(crate) fn resolve(&self, resolver: &TemplateResolver<'_>, strict: bool) -> ResolvedTree {
        self.resolve_at(resolver, strict, &[])
    }

    fn resolve_at(
        &self,
        resolver: &TemplateResolver<'_>,
        strict: bool,
        path: &[String],
    ) -> ResolvedTree {
        let mut entries = Vec::new();
        for (key, entry) in &self.entries {
            match entry {
                TemplateEntry::Template(template) => {
                    entries.push((
                        key.clone(),
                        ResolvedNode::Template(resolver.resolve(template)),
                    ));
                }
                TemplateEntry::Group(sub) => {
                    let mut sub_path = path.to_vec();
                    sub_path.push(key.clone());
                    entries.push((
                        key.clone(),
                        ResolvedNode::Tree(sub.resolve_at(resolver, strict, &sub_path)),
                    ));
                }
            }
        }
        ResolvedTree::new(path.to_vec(), entries, strict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tree_from_toml() {
        let table: toml::Table = toml::from_str(
            r#"
            version_padding = 3

            [work]
            folder = "{root[work]}/{project[name]}"
            file = "{project[name]}_v{version:0>{@version_padding}}"
            "#,
        )
        .expect("Should parse");
        let tree = TemplateTree::from_toml(&table).expect("Should build");

        // Top-level scalar stays as a leaf and is merged into the group
        assert_eq!(tree.entries().len(), 2);
        let (_, work) = &tree.entries()[1];
        let TemplateEntry::Group(work) = work else {
            panic!("Expected group");
        };
        let file = work
            .entries()
            .iter()
            .find(|(key, _)| key == "file")
            .map(|(_, entry)| entry)
            .expect("Should exist");
        let TemplateEntry::Template(file) = file else {
            panic!("Expected template");
        };
        assert_eq!(file.raw(), "{project[name]}_v{version:0>3}");
    }

    #[test]
    fn test_tree_rejects_bad_template_syntax() {
        let table: toml::Table =
            toml::from_str(r#"broken = "{unclosed""#).expect("Should parse");
        let result = TemplateTree::from_toml(&table);
        match result {
            Err(ConfigError::TemplateSyntax { name, .. }) => assert_eq!(name, "broken"),
            other => panic!("Expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_tree_rejects_non_template_values() {
        let table: toml::Table = toml::from_str("flag = true").expect("Should parse");
        let result = TemplateTree::from_toml(&table);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidTemplateValue { .. })
        ));
    }

    #[test]
    fn test_root_keys() {
        let table: toml::Table = toml::from_str(
            r#"
            [work]
            folder = "{root[work]}/{project[name]}"
            file = "{project[name]}.ma"

            [publish]
            folder = "{root[publish]}/<{comment}/>{root[work]}"
            "#,
        )
        .expect("Should parse");
        let tree = TemplateTree::from_toml(&table).expect("Should build");
        assert_eq!(
            tree.root_keys(),
            vec!["root[work]".to_string(), "root[publish]".to_string()]
        );
    }

    #[test]
    fn test_template_string_root_keys_inside_optional() {
        let template =
            TemplateString::parse("t", "<{root[render]}/>{project[name]}").expect("Should parse");
        assert_eq!(template.root_keys(), vec!["root[render]".to_string()]);
    }
}
