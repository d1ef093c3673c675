//! Context data filled into templates
//!
//! Callers collect per-resolution data (project and task names, frame and
//! version numbers, nested groupings) into a [`Context`]. Values are a closed
//! tagged type so bracket-path traversal and type validation are exhaustive
//! matches rather than runtime probing.

use std::collections::HashMap;

use crate::parser::Formattable;

/// One context value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Real(f64),
    /// Present so a boolean in the data reports a precise invalid type
    /// instead of being coerced to text
    Bool(bool),
    Map(HashMap<String, Value>),
    List(Vec<Value>),
}

impl Value {
    /// Build a mapping value from key/value pairs
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Human-readable type name used in invalid-type diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Int(_) => "integer",
            Value::Real(_) => "real",
            Value::Bool(_) => "boolean",
            Value::Map(_) => "mapping",
            Value::List(_) => "sequence",
        }
    }

    /// Scalar view of this value, if it is one a template may consume
    pub fn as_formattable(&self) -> Option<Formattable<'_>> {
        match self {
            Value::Str(s) => Some(Formattable::Str(s)),
            Value::Int(i) => Some(Formattable::Int(*i)),
            Value::Real(r) => Some(Formattable::Real(*r)),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<toml::Value> for Value {
    fn from(value: toml::Value) -> Self {
        match value {
            toml::Value::String(s) => Value::Str(s),
            toml::Value::Integer(i) => Value::Int(i),
            toml::Value::Float(f) => Value::Real(f),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(dt) => Value::Str(dt.to_string()),
            toml::Value::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            toml::Value::Table(table) => Value::Map(
                table
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Outcome of walking a bracket path through context data
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<'a> {
    Found(&'a Value),
    /// Some segment along the path is absent
    Missing,
    /// The walk reached a non-mapping value before the path ended;
    /// `depth` counts the segments leading to that value
    NotAMapping { depth: usize, kind: &'static str },
}

/// Top-level context mapping supplied by pipeline callers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    entries: HashMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Insert a value at a nested path, creating mappings along the way.
    /// An existing non-mapping value on the path is replaced.
    pub fn insert_path(&mut self, path: &[&str], value: impl Into<Value>) {
        let (last, parents) = match path.split_last() {
            Some(split) => split,
            None => return,
        };
        let mut current = &mut self.entries;
        for segment in parents {
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Map(HashMap::new()));
            if !matches!(entry, Value::Map(_)) {
                *entry = Value::Map(HashMap::new());
            }
            let Value::Map(map) = entry else { unreachable!() };
            current = map;
        }
        current.insert(last.to_string(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load context data from a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        let table: toml::Table = toml::from_str(content)?;
        Ok(Self::from(table))
    }

    /// Walk a bracket path (`["task", "name"]` for `{task[name]}`)
    pub fn lookup(&self, segments: &[String]) -> Lookup<'_> {
        let mut current = match self.entries.get(&segments[0]) {
            Some(value) => value,
            None => return Lookup::Missing,
        };
        for (depth, segment) in segments.iter().enumerate().skip(1) {
            match current {
                Value::Map(map) => match map.get(segment) {
                    Some(value) => current = value,
                    None => return Lookup::Missing,
                },
                other => {
                    return Lookup::NotAMapping {
                        depth,
                        kind: other.type_name(),
                    }
                }
            }
        }
        Lookup::Found(current)
    }
}

impl From<toml::Table> for Context {
    fn from(table: toml::Table) -> Self {
        Self {
            entries: table
                .into_iter()
                .map(|(k, v)| (k, Value::from(v)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Context {
        Context::new()
            .with("project", Value::map([("name", Value::from("demo"))]))
            .with("frame", 12)
    }

    #[test]
    fn test_lookup_top_level() {
        let ctx = sample();
        assert_eq!(
            ctx.lookup(&["frame".to_string()]),
            Lookup::Found(&Value::Int(12))
        );
    }

    #[test]
    fn test_lookup_nested() {
        let ctx = sample();
        let path = vec!["project".to_string(), "name".to_string()];
        assert_eq!(
            ctx.lookup(&path),
            Lookup::Found(&Value::Str("demo".to_string()))
        );
    }

    #[test]
    fn test_lookup_missing_top_and_nested() {
        let ctx = sample();
        assert_eq!(ctx.lookup(&["task".to_string()]), Lookup::Missing);
        let path = vec!["project".to_string(), "code".to_string()];
        assert_eq!(ctx.lookup(&path), Lookup::Missing);
    }

    #[test]
    fn test_lookup_through_scalar_reports_depth() {
        let ctx = sample();
        let path = vec!["frame".to_string(), "padding".to_string()];
        assert_eq!(
            ctx.lookup(&path),
            Lookup::NotAMapping {
                depth: 1,
                kind: "integer"
            }
        );
    }

    #[test]
    fn test_from_toml() {
        let ctx = Context::from_toml_str(
            r#"
            frame = 7

            [project]
            name = "demo"
            "#,
        )
        .expect("Should parse");
        assert_eq!(ctx.get("frame"), Some(&Value::Int(7)));
        let path = vec!["project".to_string(), "name".to_string()];
        assert_eq!(
            ctx.lookup(&path),
            Lookup::Found(&Value::Str("demo".to_string()))
        );
    }

    #[test]
    fn test_insert_path_merges_into_existing_maps() {
        let mut ctx = sample();
        ctx.insert_path(&["project", "code"], "dm");
        let name = vec!["project".to_string(), "name".to_string()];
        let code = vec!["project".to_string(), "code".to_string()];
        assert_eq!(ctx.lookup(&name), Lookup::Found(&Value::Str("demo".to_string())));
        assert_eq!(ctx.lookup(&code), Lookup::Found(&Value::Str("dm".to_string())));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::from(true).type_name(), "boolean");
        assert_eq!(Value::List(vec![]).type_name(), "sequence");
        assert_eq!(Value::map::<&str, Value, _>([]).type_name(), "mapping");
    }
}
