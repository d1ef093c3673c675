//! Error types for configuration loading and resolved-tree access

use std::collections::BTreeMap;

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::parser::lexer::Span;

/// Errors raised while turning raw configuration into an [`crate::Anatomy`].
///
/// All of these are load-time failures; a caller never receives a partially
/// built anatomy.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// Template text did not parse (stray brace, bad optional group, bad spec)
    #[error("template `{name}` has invalid syntax:\n{report}")]
    TemplateSyntax { name: String, report: String },

    /// Inner references form a cycle, directly or through other keys
    #[error("unsolvable recursion in template inner references: {chain}")]
    InnerReferenceCycle { chain: String },

    /// An inner reference names a key absent from its group
    #[error("template key `{key}` has unknown inner reference `{reference}`")]
    UnknownInnerReference { key: String, reference: String },

    /// An inner reference names a key whose value is not a scalar
    #[error("template key `{key}` refers to `{reference}` which does not hold a scalar value")]
    InvalidInnerReference { key: String, reference: String },

    /// A template entry holds something that cannot be a template
    #[error("template `{name}` has a non-template value ({kind})")]
    InvalidTemplateValue { name: String, kind: String },

    /// A root configuration level mixes platform values with nested roots
    #[error("root `{path}` mixes platform path values with nested roots")]
    MixedRootLevel { path: String },

    #[error("root `{path}` has unknown platform key `{platform}`")]
    UnknownPlatform { path: String, platform: String },

    #[error("root `{path}` value for platform `{platform}` is not a string")]
    InvalidRootValue { path: String, platform: String },

    #[error("root `{path}` has an empty value for platform `{platform}`")]
    EmptyRootValue { path: String, platform: String },

    /// Templates reference both `{root}` and named roots like `{root[work]}`
    #[error("templates combine unnamed and named root references: {}", .roots.join(", "))]
    RootCombination { roots: Vec<String> },
}

/// Errors raised by strict reads of a [`crate::ResolvedTree`]
#[derive(Error, Debug)]
pub enum AnatomyError {
    /// The requested key does not exist in the template structure at all
    #[error("anatomy key does not exist: `templates{}`", quoted_path(.path))]
    MissingKey { path: Vec<String> },

    /// The leaf exists but required placeholders did not resolve
    #[error("anatomy template \"{template}\" is unsolved.{}", unsolved_details(.missing_keys, .invalid_types))]
    UnsolvedTemplate {
        template: String,
        missing_keys: Vec<String>,
        invalid_types: BTreeMap<String, String>,
    },
}

fn quoted_path(path: &[String]) -> String {
    path.iter()
        .map(|key| format!("[\"{}\"]", key))
        .collect::<Vec<_>>()
        .join("")
}

fn unsolved_details(missing_keys: &[String], invalid_types: &BTreeMap<String, String>) -> String {
    let mut details = String::new();
    if !missing_keys.is_empty() {
        details.push_str(&format!(" Missing keys: \"{}\".", missing_keys.join("\", \"")));
    }
    if !invalid_types.is_empty() {
        let items = invalid_types
            .iter()
            .map(|(key, kind)| format!("\"{}\" ({})", key, kind))
            .collect::<Vec<_>>()
            .join(", ");
        details.push_str(&format!(" Keys with invalid value type: {}.", items));
    }
    details
}

/// A syntax error in one template string
#[derive(Error, Debug)]
pub enum TemplateParseError {
    #[error("parse error at {span:?}: {message}")]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },
}

impl TemplateParseError {
    /// Format the error with the template text as context using ariadne
    pub fn format(&self, template: &str, name: &str) -> String {
        let mut buf = Vec::new();
        match self {
            TemplateParseError::Syntax {
                span,
                message,
                expected,
            } => {
                let expected_str = if expected.is_empty() {
                    String::new()
                } else {
                    format!("\nExpected: {}", expected.join(", "))
                };

                Report::build(ReportKind::Error, name, span.start)
                    .with_message(message)
                    .with_label(
                        Label::new((name, span.clone()))
                            .with_message(format!("{}{}", message, expected_str))
                            .with_color(Color::Red),
                    )
                    .finish()
                    .write((name, Source::from(template)), &mut buf)
                    .unwrap();
            }
        }
        String::from_utf8(buf).unwrap()
    }
}

impl<'a> From<chumsky::error::Rich<'a, crate::parser::lexer::Token>> for TemplateParseError {
    fn from(err: chumsky::error::Rich<'a, crate::parser::lexer::Token>) -> Self {
        use chumsky::error::RichReason;

        let message = match err.reason() {
            RichReason::ExpectedFound { found, .. } => match found {
                Some(tok) => format!("Unexpected {}", format_token(tok)),
                None => "Unexpected end of template".to_string(),
            },
            RichReason::Custom(msg) => msg.to_string(),
        };

        let expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                chumsky::error::RichPattern::Token(tok) => Some(format_token(tok)),
                chumsky::error::RichPattern::Label(label) => Some(label.to_string()),
                chumsky::error::RichPattern::EndOfInput => Some("end of template".to_string()),
                chumsky::error::RichPattern::Identifier(s) => Some(format!("identifier '{}'", s)),
                chumsky::error::RichPattern::Any => Some("any token".to_string()),
                chumsky::error::RichPattern::SomethingElse => None,
            })
            .collect();

        TemplateParseError::Syntax {
            span: err.span().into_range(),
            message,
            expected,
        }
    }
}

/// Format a token for human-readable error messages
fn format_token(tok: &crate::parser::lexer::Token) -> String {
    use crate::parser::lexer::Token;
    match tok {
        Token::Placeholder(p) => format!("placeholder '{}'", p.raw),
        Token::AngleOpen => "'<'".to_string(),
        Token::AngleClose => "'>'".to_string(),
        Token::BraceOpen => "stray '{'".to_string(),
        Token::BraceClose => "stray '}'".to_string(),
        Token::Text(s) => format!("text {:?}", s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_message() {
        let err = AnatomyError::MissingKey {
            path: vec!["work".to_string(), "folder".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "anatomy key does not exist: `templates[\"work\"][\"folder\"]`"
        );
    }

    #[test]
    fn test_unsolved_message_lists_findings() {
        let mut invalid_types = BTreeMap::new();
        invalid_types.insert("project".to_string(), "sequence".to_string());
        let err = AnatomyError::UnsolvedTemplate {
            template: "{project[name]}/{task[name]}".to_string(),
            missing_keys: vec!["task[name]".to_string()],
            invalid_types,
        };
        let message = err.to_string();
        assert!(message.contains("is unsolved"));
        assert!(message.contains("Missing keys: \"task[name]\""));
        assert!(message.contains("\"project\" (sequence)"));
    }
}
