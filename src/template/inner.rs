//! Load-time expansion of `{@key}` inner references
//!
//! Inner references let one template key splice in another key's value, so
//! shared fragments (version padding, file-name stems) are written once.
//! They are expanded when templates are loaded, before any per-call
//! formatting; later stages only ever see real placeholders.
//!
//! Scalar entries at the top grouping level are shared defaults: each sibling
//! group sees them merged under its own overrides. Substituted text is inert,
//! it is never re-evaluated as a template. Reference cycles, references to
//! unknown keys, and references to non-scalar values are configuration
//! errors.

use std::collections::HashMap;

use crate::error::ConfigError;
use crate::parser::lexer::{self, Token};

/// Expand all inner references in raw template data.
///
/// The returned table mirrors the input with top-level defaults merged into
/// every group and every `{@key}` occurrence replaced by the referenced
/// value. Deeper levels inherit the scalar set of the level above for
/// substitution but keep only their own keys.
pub(crate) fn resolve_inner_references(table: &toml::Table) -> Result<toml::Table, ConfigError> {
    resolve_level(table, &toml::Table::new(), 0)
}

fn is_scalar(value: &toml::Value) -> bool {
    matches!(
        value,
        toml::Value::String(_) | toml::Value::Integer(_) | toml::Value::Float(_)
    )
}

fn resolve_level(
    table: &toml::Table,
    inherited: &toml::Table,
    depth: usize,
) -> Result<toml::Table, ConfigError> {
    // Working set: inherited scalars under this level's own entries.
    // Overriding an inherited key keeps its position, so merged defaults
    // stay in configuration order.
    let mut working = inherited.clone();
    for (key, value) in table {
        if is_scalar(value) {
            working.insert(key.clone(), value.clone());
        }
    }

    // Keys that exist at this level but can never be spliced into a value
    let non_scalar_keys: Vec<&String> = table
        .iter()
        .filter(|(_, value)| !is_scalar(value))
        .map(|(key, _)| key)
        .collect();

    let resolved = resolve_scalar_set(&working, &non_scalar_keys)?;

    // First-level groups receive the full merged default set; deeper levels
    // only keep their own keys, resolved against the inherited scalars.
    let mut out = toml::Table::new();
    if depth == 1 {
        for (key, value) in &resolved {
            out.insert(key.clone(), value.clone());
        }
    }
    for (key, value) in table {
        match value {
            toml::Value::Table(sub) => {
                out.insert(
                    key.clone(),
                    toml::Value::Table(resolve_level(sub, &working, depth + 1)?),
                );
            }
            value if is_scalar(value) => {
                out.insert(key.clone(), resolved[key].clone());
            }
            other => {
                out.insert(key.clone(), other.clone());
            }
        }
    }

    Ok(out)
}

/// References of one scalar value, in order of appearance
fn references(value: &toml::Value) -> Vec<String> {
    let toml::Value::String(text) = value else {
        return Vec::new();
    };
    lexer::lex(text)
        .filter_map(|(token, _)| match token {
            Token::Placeholder(p) if p.inner => Some(if p.path.len() == 1 {
                p.path[0].clone()
            } else {
                // Bracket paths are not valid inner references; keep the
                // raw body so the unknown-reference error names it
                p.raw[2..p.raw.len() - 1].to_string()
            }),
            _ => None,
        })
        .collect()
}

#[derive(Clone, Copy, PartialEq)]
enum VisitState {
    Visiting,
    Done,
}

/// Resolve every reference inside one flat scalar set.
///
/// Runs in dependency order, which reaches the same fixed point as repeated
/// scanning but lets cycles be rejected up front instead of looping.
fn resolve_scalar_set(
    working: &toml::Table,
    non_scalar_keys: &[&String],
) -> Result<toml::Table, ConfigError> {
    let mut deps: HashMap<String, Vec<String>> = HashMap::new();
    for (key, value) in working {
        let refs = references(value);
        for reference in &refs {
            if reference == key {
                return Err(ConfigError::InnerReferenceCycle {
                    chain: format!("{} -> {}", key, key),
                });
            }
            if non_scalar_keys.iter().any(|k| *k == reference) {
                return Err(ConfigError::InvalidInnerReference {
                    key: key.clone(),
                    reference: reference.clone(),
                });
            }
            if !working.contains_key(reference) {
                return Err(ConfigError::UnknownInnerReference {
                    key: key.clone(),
                    reference: reference.clone(),
                });
            }
        }
        deps.insert(key.clone(), refs);
    }

    let mut resolved = toml::Table::new();
    let mut state: HashMap<String, VisitState> = HashMap::new();
    for key in working.keys() {
        visit(key, working, &deps, &mut state, &mut resolved, &mut Vec::new())?;
    }
    Ok(resolved)
}

fn visit(
    key: &str,
    working: &toml::Table,
    deps: &HashMap<String, Vec<String>>,
    state: &mut HashMap<String, VisitState>,
    resolved: &mut toml::Table,
    stack: &mut Vec<String>,
) -> Result<(), ConfigError> {
    match state.get(key) {
        Some(VisitState::Done) => return Ok(()),
        Some(VisitState::Visiting) => {
            let mut chain: Vec<&str> = stack
                .iter()
                .skip_while(|k| *k != key)
                .map(|k| k.as_str())
                .collect();
            chain.push(key);
            return Err(ConfigError::InnerReferenceCycle {
                chain: chain.join(" -> "),
            });
        }
        None => {}
    }

    state.insert(key.to_string(), VisitState::Visiting);
    stack.push(key.to_string());
    for reference in &deps[key] {
        visit(reference, working, deps, state, resolved, stack)?;
    }
    stack.pop();

    let value = match &working[key] {
        toml::Value::String(text) => {
            let mut text = text.clone();
            for reference in &deps[key] {
                let replacement = scalar_text(&resolved[reference.as_str()]);
                text = text.replace(&format!("{{@{}}}", reference), &replacement);
            }
            toml::Value::String(text)
        }
        other => other.clone(),
    };
    resolved.insert(key.to_string(), value);
    state.insert(key.to_string(), VisitState::Done);
    Ok(())
}

fn scalar_text(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => f.to_string(),
        other => other.to_string(),
    }
}
