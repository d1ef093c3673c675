//! Resolved template values and strict/lenient access over them
//!
//! Resolution never fails mid-call; missing context keys and invalid value
//! types are recorded on the [`ResolvedTemplate`] and only escalate to an
//! error when read through a strict [`ResolvedTree`]. The same resolution
//! result therefore serves both "give me the final path or fail" call sites
//! and best-effort preview consumers.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::context::Value;
use crate::error::AnatomyError;

/// One formatted template with its resolution metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTemplate {
    text: String,
    template: String,
    solved: bool,
    rootless_text: String,
    used_values: HashMap<String, Value>,
    missing_keys: Vec<String>,
    invalid_types: BTreeMap<String, String>,
}

impl ResolvedTemplate {
    pub(crate) fn new(
        text: String,
        template: String,
        solved: bool,
        rootless_text: String,
        used_values: HashMap<String, Value>,
        missing_keys: Vec<String>,
        invalid_types: BTreeMap<String, String>,
    ) -> Self {
        Self {
            text,
            template,
            solved,
            rootless_text,
            used_values,
            missing_keys,
            invalid_types,
        }
    }

    /// The fully or partially formatted output
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The original template text
    pub fn template(&self) -> &str {
        &self.template
    }

    /// True only if every required placeholder resolved with a valid type;
    /// optional groups never affect this
    pub fn solved(&self) -> bool {
        self.solved
    }

    /// `text` with concrete root values replaced by their formattable keys,
    /// or `text` itself when no root substitution applies
    pub fn rootless_text(&self) -> &str {
        &self.rootless_text
    }

    /// The subset of context actually consumed, mirroring placeholder
    /// bracket paths
    pub fn used_values(&self) -> &HashMap<String, Value> {
        &self.used_values
    }

    /// Bracket paths absent from context, deduplicated, including optional
    /// group findings
    pub fn missing_keys(&self) -> &[String] {
        &self.missing_keys
    }

    /// Path prefix -> offending type name for values a template cannot
    /// consume
    pub fn invalid_types(&self) -> &BTreeMap<String, String> {
        &self.invalid_types
    }

    fn unsolved_error(&self) -> AnatomyError {
        AnatomyError::UnsolvedTemplate {
            template: self.template.clone(),
            missing_keys: self.missing_keys.clone(),
            invalid_types: self.invalid_types.clone(),
        }
    }
}

impl fmt::Display for ResolvedTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// One entry of a [`ResolvedTree`]
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedNode {
    Tree(ResolvedTree),
    Template(ResolvedTemplate),
}

/// Resolved templates mirroring the template tree's nesting.
///
/// Strict trees raise structured errors on reads of keys that do not exist
/// or leaves that did not solve; lenient trees hand back best-effort values
/// through the `try_` accessors without ever failing.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTree {
    path: Vec<String>,
    entries: Vec<(String, ResolvedNode)>,
    strict: bool,
}

impl ResolvedTree {
    pub(crate) fn new(path: Vec<String>, entries: Vec<(String, ResolvedNode)>, strict: bool) -> Self {
        Self {
            path,
            entries,
            strict,
        }
    }

    pub fn strict(&self) -> bool {
        self.strict
    }

    pub fn entries(&self) -> &[(String, ResolvedNode)] {
        &self.entries
    }

    fn missing_key_error(&self, rest: &[&str]) -> AnatomyError {
        let mut full = self.path.clone();
        full.extend(rest.iter().map(|s| s.to_string()));
        AnatomyError::MissingKey { path: full }
    }

    fn find(&self, key: &str) -> Option<&ResolvedNode> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, node)| node)
    }

    /// Walk `path` and return the node there.
    ///
    /// A key absent at any depth is a missing-anatomy-key error naming the
    /// full access path. In strict mode an unsolved leaf is an
    /// unsolved-template error carrying its missing keys and invalid types.
    pub fn get(&self, path: &[&str]) -> Result<&ResolvedNode, AnatomyError> {
        let (first, rest) = match path.split_first() {
            Some(split) => split,
            None => return Err(self.missing_key_error(&[])),
        };
        let node = self
            .find(first)
            .ok_or_else(|| self.missing_key_error(&path[..1]))?;
        let node = match (node, rest.is_empty()) {
            (node, true) => node,
            (ResolvedNode::Tree(subtree), false) => return subtree.get(rest),
            (ResolvedNode::Template(_), false) => {
                return Err(self.missing_key_error(&path[..2]));
            }
        };
        if self.strict {
            if let ResolvedNode::Template(template) = node {
                if !template.solved() {
                    return Err(template.unsolved_error());
                }
            }
        }
        Ok(node)
    }

    /// Strict-style read of a leaf template
    pub fn template(&self, path: &[&str]) -> Result<&ResolvedTemplate, AnatomyError> {
        match self.get(path)? {
            ResolvedNode::Template(template) => Ok(template),
            ResolvedNode::Tree(_) => Err(self.missing_key_error(path)),
        }
    }

    /// Strict-style read of a nested group
    pub fn subtree(&self, path: &[&str]) -> Result<&ResolvedTree, AnatomyError> {
        match self.get(path)? {
            ResolvedNode::Tree(subtree) => Ok(subtree),
            ResolvedNode::Template(_) => Err(self.missing_key_error(path)),
        }
    }

    /// Lenient read: never fails, returns whatever is there
    pub fn try_get(&self, path: &[&str]) -> Option<&ResolvedNode> {
        let (first, rest) = path.split_first()?;
        match (self.find(first)?, rest.is_empty()) {
            (node, true) => Some(node),
            (ResolvedNode::Tree(subtree), false) => subtree.try_get(rest),
            (ResolvedNode::Template(_), false) => None,
        }
    }

    /// Lenient read of a leaf, solved or not
    pub fn try_template(&self, path: &[&str]) -> Option<&ResolvedTemplate> {
        match self.try_get(path)? {
            ResolvedNode::Template(template) => Some(template),
            ResolvedNode::Tree(_) => None,
        }
    }

    /// All leaves with dotted access paths, in tree order
    pub fn leaves(&self) -> Vec<(String, &ResolvedTemplate)> {
        let mut out = Vec::new();
        self.collect_leaves(String::new(), &mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, prefix: String, out: &mut Vec<(String, &'a ResolvedTemplate)>) {
        for (key, node) in &self.entries {
            let name = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", prefix, key)
            };
            match node {
                ResolvedNode::Template(template) => out.push((name, template)),
                ResolvedNode::Tree(subtree) => subtree.collect_leaves(name, out),
            }
        }
    }

    /// Missing keys of all leaves, deduplicated in first-seen order
    pub fn missing_keys(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for (_, leaf) in self.leaves() {
            for key in leaf.missing_keys() {
                if !out.contains(key) {
                    out.push(key.clone());
                }
            }
        }
        out
    }

    /// Invalid types of all leaves; the first finding per path wins
    pub fn invalid_types(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for (_, leaf) in self.leaves() {
            for (key, kind) in leaf.invalid_types() {
                out.entry(key.clone()).or_insert_with(|| kind.clone());
            }
        }
        out
    }

    /// Context values consumed by any leaf, merged into one nested mapping
    pub fn used_values(&self) -> HashMap<String, Value> {
        let mut out = HashMap::new();
        for (_, leaf) in self.leaves() {
            merge_values(&mut out, leaf.used_values());
        }
        out
    }

    /// Copy of this tree keeping only solved leaves; groups left empty by
    /// the filter are dropped
    pub fn solved_only(&self) -> ResolvedTree {
        let entries = self
            .entries
            .iter()
            .filter_map(|(key, node)| match node {
                ResolvedNode::Template(template) if template.solved() => {
                    Some((key.clone(), node.clone()))
                }
                ResolvedNode::Template(_) => None,
                ResolvedNode::Tree(subtree) => {
                    let filtered = subtree.solved_only();
                    if filtered.entries.is_empty() {
                        None
                    } else {
                        Some((key.clone(), ResolvedNode::Tree(filtered)))
                    }
                }
            })
            .collect();
        ResolvedTree {
            path: self.path.clone(),
            entries,
            strict: self.strict,
        }
    }
}

pub(crate) fn merge_values(target: &mut HashMap<String, Value>, source: &HashMap<String, Value>) {
    for (key, value) in source {
        match (target.get_mut(key), value) {
            (Some(Value::Map(existing)), Value::Map(incoming)) => {
                merge_values(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}
