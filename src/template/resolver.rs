//! Per-call template resolution
//!
//! Turns one parsed template plus a context into a [`ResolvedTemplate`].
//! Resolution is a pure function of its inputs and records failures as data
//! instead of returning errors:
//!
//! - optional `<...>` spans are elided wholesale when any placeholder inside
//!   them cannot resolve,
//! - unresolved required placeholders stay literally visible in the output
//!   (the partially filled form preview consumers rely on),
//! - a second pass produces the rootless variant with concrete root values
//!   swapped back to their formattable keys.

use std::collections::{BTreeMap, HashMap};

use crate::context::{Context, Lookup, Value};
use crate::parser::{Node, Placeholder};
use crate::roots::{Platform, RootLookup, RootTree};
use crate::template::resolved::ResolvedTemplate;
use crate::template::TemplateString;

/// Outcome of evaluating one placeholder against the context
enum Evaluated {
    /// Formatted value ready for output
    Text(String),
    /// Formatted root value; `key` is the formattable placeholder used in
    /// the rootless variant
    RootText { key: String, value: String },
    /// Reported with the placeholder's full bracket path
    Missing(String),
    /// Reported at the path prefix where a non-mapping value was hit
    Invalid { path: String, kind: String },
}

/// Resolves templates against one context snapshot
pub(crate) struct TemplateResolver<'a> {
    context: &'a Context,
    roots: Option<&'a RootTree>,
    platform: Platform,
}

impl<'a> TemplateResolver<'a> {
    pub(crate) fn new(
        context: &'a Context,
        roots: Option<&'a RootTree>,
        platform: Platform,
    ) -> Self {
        Self {
            context,
            roots,
            platform,
        }
    }

    /// Resolve one template into its result value
    pub(crate) fn resolve(&self, template: &TemplateString) -> ResolvedTemplate {
        let mut optional_missing: Vec<String> = Vec::new();
        let mut optional_invalid: BTreeMap<String, String> = BTreeMap::new();

        // Step A: drop optional groups with any unresolvable placeholder;
        // the delimiters of surviving groups are stripped, their literal
        // content retained.
        let mut flat: Vec<&Node> = Vec::new();
        for node in template.nodes() {
            match node {
                Node::Optional(children) => {
                    let mut valid = true;
                    for child in children {
                        if let Node::Placeholder(placeholder) = child {
                            match self.evaluate(placeholder) {
                                Evaluated::Text(_) | Evaluated::RootText { .. } => {}
                                Evaluated::Missing(path) => {
                                    optional_missing.push(path);
                                    valid = false;
                                }
                                Evaluated::Invalid { path, kind } => {
                                    optional_invalid.entry(path).or_insert(kind);
                                    valid = false;
                                }
                            }
                        }
                    }
                    if valid {
                        flat.extend(children.iter());
                    }
                }
                other => flat.push(other),
            }
        }

        // Steps B/C: format the remaining nodes; unresolved placeholders
        // keep their raw text in the output.
        let mut text = String::new();
        let mut rootless = String::new();
        let mut used_values: HashMap<String, Value> = HashMap::new();
        let mut used_root = false;
        let mut required_missing: Vec<String> = Vec::new();
        let mut required_invalid: BTreeMap<String, String> = BTreeMap::new();

        for node in flat {
            match node {
                Node::Literal(literal) => {
                    text.push_str(literal);
                    rootless.push_str(literal);
                }
                Node::Placeholder(placeholder) => match self.evaluate(placeholder) {
                    Evaluated::Text(value) => {
                        record_used(&mut used_values, placeholder, &value);
                        text.push_str(&value);
                        rootless.push_str(&value);
                    }
                    Evaluated::RootText { key, value } => {
                        record_used(&mut used_values, placeholder, &value);
                        used_root = true;
                        text.push_str(&value);
                        rootless.push_str(&key);
                    }
                    Evaluated::Missing(path) => {
                        required_missing.push(path);
                        text.push_str(&placeholder.raw);
                        rootless.push_str(&placeholder.raw);
                    }
                    Evaluated::Invalid { path, kind } => {
                        required_invalid.entry(path).or_insert(kind);
                        text.push_str(&placeholder.raw);
                        rootless.push_str(&placeholder.raw);
                    }
                },
                Node::Optional(_) => unreachable!("optional groups were flattened in step A"),
            }
        }

        let solved = required_missing.is_empty() && required_invalid.is_empty();

        let mut missing_keys = required_missing;
        for path in optional_missing {
            missing_keys.push(path);
        }
        dedup_in_order(&mut missing_keys);

        let mut invalid_types = required_invalid;
        for (path, kind) in optional_invalid {
            invalid_types.entry(path).or_insert(kind);
        }

        // Step D: the rootless variant only applies when a root value was
        // consumed and no finding touches the root namespace.
        let root_finding = missing_keys.iter().any(|key| is_root_path(key))
            || invalid_types.keys().any(|key| is_root_path(key));
        let rootless_text = if used_root && !root_finding {
            rootless
        } else {
            text.clone()
        };

        ResolvedTemplate::new(
            text,
            template.raw().to_string(),
            solved,
            rootless_text,
            used_values,
            missing_keys,
            invalid_types,
        )
    }

    fn evaluate(&self, placeholder: &Placeholder) -> Evaluated {
        if placeholder.path.is_root() {
            if let Some(roots) = self.roots.filter(|tree| !tree.is_empty()) {
                return self.evaluate_root(placeholder, roots);
            }
        }
        self.evaluate_context(placeholder)
    }

    fn evaluate_root(&self, placeholder: &Placeholder, roots: &RootTree) -> Evaluated {
        let segments = &placeholder.path.segments()[1..];
        match roots.lookup(segments) {
            RootLookup::Item(item) => {
                let Some(value) = item.value(self.platform) else {
                    return Evaluated::Missing(placeholder.path.to_string());
                };
                let formatted = match &placeholder.spec {
                    Some(spec) => match spec.apply(crate::parser::Formattable::Str(value)) {
                        Ok(formatted) => formatted,
                        Err(_) => return Evaluated::Missing(placeholder.path.to_string()),
                    },
                    None => value.to_string(),
                };
                Evaluated::RootText {
                    key: item.placeholder(),
                    value: formatted,
                }
            }
            RootLookup::Branch => Evaluated::Invalid {
                path: placeholder.path.to_string(),
                kind: "mapping".to_string(),
            },
            RootLookup::Missing => Evaluated::Missing(placeholder.path.to_string()),
            RootLookup::TooDeep { depth } => Evaluated::Invalid {
                path: placeholder.path.prefix(depth + 1),
                kind: "root".to_string(),
            },
        }
    }

    fn evaluate_context(&self, placeholder: &Placeholder) -> Evaluated {
        match self.context.lookup(placeholder.path.segments()) {
            Lookup::Found(value) => match value.as_formattable() {
                Some(formattable) => {
                    let formatted = match &placeholder.spec {
                        Some(spec) => match spec.apply(formattable) {
                            Ok(formatted) => formatted,
                            Err(_) => {
                                return Evaluated::Missing(placeholder.path.to_string());
                            }
                        },
                        None => formattable.to_string(),
                    };
                    Evaluated::Text(formatted)
                }
                None => Evaluated::Invalid {
                    path: placeholder.path.to_string(),
                    kind: value.type_name().to_string(),
                },
            },
            Lookup::Missing => Evaluated::Missing(placeholder.path.to_string()),
            Lookup::NotAMapping { depth, kind } => Evaluated::Invalid {
                path: placeholder.path.prefix(depth),
                kind: kind.to_string(),
            },
        }
    }
}

/// Store a consumed value under its bracket path, building nested mappings
fn record_used(used: &mut HashMap<String, Value>, placeholder: &Placeholder, value: &str) {
    let segments = placeholder.path.segments();
    let mut current = used;
    for segment in &segments[..segments.len() - 1] {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Map(HashMap::new()));
        if !matches!(entry, Value::Map(_)) {
            *entry = Value::Map(HashMap::new());
        }
        let Value::Map(map) = entry else { unreachable!() };
        current = map;
    }
    current.insert(
        segments[segments.len() - 1].clone(),
        Value::Str(value.to_string()),
    );
}

fn dedup_in_order(keys: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    keys.retain(|key| seen.insert(key.clone()));
}

fn is_root_path(key: &str) -> bool {
    key == "root" || key.starts_with("root[")
}
