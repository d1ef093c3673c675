//! Lexer for anatomy template strings using logos

use logos::Logos;

/// Byte range in template text
pub type Span = std::ops::Range<usize>;

/// A `{...}` placeholder as written in a template.
///
/// The lexer matches the whole placeholder in one token and splits it into
/// its parts, so the grammar never has to re-derive structure from text.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderToken {
    /// True for inner references (`{@key}`), resolved at load time
    pub inner: bool,
    /// Bracket path, e.g. `{task[name]}` -> `["task", "name"]`
    pub path: Vec<String>,
    /// Format spec after `:`, e.g. `{frame:0>4}` -> `Some("0>4")`
    pub spec: Option<String>,
    /// The placeholder exactly as written, including braces
    pub raw: String,
}

fn placeholder_token(lex: &mut logos::Lexer<Token>) -> PlaceholderToken {
    let raw = lex.slice();
    let body = &raw[1..raw.len() - 1];
    let (body, spec) = match body.split_once(':') {
        Some((head, spec)) => (head, Some(spec.to_string())),
        None => (body, None),
    };
    let (inner, body) = match body.strip_prefix('@') {
        Some(rest) => (true, rest),
        None => (false, body),
    };
    let path = body
        .split('[')
        .map(|part| part.trim_end_matches(']').to_string())
        .collect();

    PlaceholderToken {
        inner,
        path,
        spec,
        raw: raw.to_string(),
    }
}

/// Tokens of the template mini-language.
///
/// There is no whitespace skipping; whitespace is literal template text.
/// Single braces that do not open a well-formed placeholder are lexed as
/// stray-brace tokens and rejected by the grammar.
#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    // Whole placeholder, longest match wins over the stray-brace token.
    // The format spec may contain any character except braces, which keeps
    // `<` and `>` inside a spec (e.g. `{frame:0>4}`) out of the group
    // delimiter tokens below.
    #[regex(
        r"\{@?[A-Za-z_][A-Za-z0-9_]*(\[[A-Za-z0-9_]+\])*(:[^{}]*)?\}",
        placeholder_token
    )]
    Placeholder(PlaceholderToken),

    // Optional group delimiters
    #[token("<")]
    AngleOpen,
    #[token(">")]
    AngleClose,

    // Stray braces (malformed placeholder), rejected by the grammar
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,

    #[regex(r"[^{}<>]+", |lex| lex.slice().to_string())]
    Text(String),
}

/// Lex template text into tokens with spans
pub fn lex(input: &str) -> impl Iterator<Item = (Token, Span)> + '_ {
    Token::lexer(input)
        .spanned()
        .filter_map(|(tok, span)| tok.ok().map(|t| (t, span)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        lex(input).map(|(t, _)| t).collect()
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(
            tokens("work/shots"),
            vec![Token::Text("work/shots".to_string())]
        );
    }

    #[test]
    fn test_simple_placeholder() {
        let toks = tokens("{project}");
        assert_eq!(toks.len(), 1);
        match &toks[0] {
            Token::Placeholder(p) => {
                assert!(!p.inner);
                assert_eq!(p.path, vec!["project".to_string()]);
                assert_eq!(p.spec, None);
                assert_eq!(p.raw, "{project}");
            }
            other => panic!("Expected placeholder, got {:?}", other),
        }
    }

    #[test]
    fn test_bracket_path_placeholder() {
        let toks = tokens("{root[work]}/{task[name]}");
        assert_eq!(toks.len(), 3);
        match &toks[0] {
            Token::Placeholder(p) => {
                assert_eq!(p.path, vec!["root".to_string(), "work".to_string()]);
            }
            other => panic!("Expected placeholder, got {:?}", other),
        }
        assert_eq!(toks[1], Token::Text("/".to_string()));
        match &toks[2] {
            Token::Placeholder(p) => {
                assert_eq!(p.path, vec!["task".to_string(), "name".to_string()]);
            }
            other => panic!("Expected placeholder, got {:?}", other),
        }
    }

    #[test]
    fn test_format_spec_with_angle_bracket() {
        // The `>` belongs to the format spec, not an optional group
        let toks = tokens("{frame:0>4}");
        assert_eq!(toks.len(), 1);
        match &toks[0] {
            Token::Placeholder(p) => {
                assert_eq!(p.path, vec!["frame".to_string()]);
                assert_eq!(p.spec, Some("0>4".to_string()));
            }
            other => panic!("Expected placeholder, got {:?}", other),
        }
    }

    #[test]
    fn test_inner_reference() {
        let toks = tokens("{@version_padding}");
        match &toks[0] {
            Token::Placeholder(p) => {
                assert!(p.inner);
                assert_eq!(p.path, vec!["version_padding".to_string()]);
            }
            other => panic!("Expected placeholder, got {:?}", other),
        }
    }

    #[test]
    fn test_optional_group_delimiters() {
        let toks = tokens("{project}<_{comment}>");
        assert_eq!(toks.len(), 5);
        assert!(matches!(toks[0], Token::Placeholder(_)));
        assert_eq!(toks[1], Token::AngleOpen);
        assert_eq!(toks[2], Token::Text("_".to_string()));
        assert!(matches!(toks[3], Token::Placeholder(_)));
        assert_eq!(toks[4], Token::AngleClose);
    }

    #[test]
    fn test_stray_braces() {
        assert_eq!(
            tokens("{not closed"),
            vec![Token::BraceOpen, Token::Text("not closed".to_string())]
        );
        assert_eq!(
            tokens("closed}"),
            vec![Token::Text("closed".to_string()), Token::BraceClose]
        );
    }

    #[test]
    fn test_malformed_placeholder_is_stray() {
        // Space inside braces does not form a placeholder
        assert_eq!(
            tokens("{two words}"),
            vec![
                Token::BraceOpen,
                Token::Text("two words".to_string()),
                Token::BraceClose
            ]
        );
    }

    #[test]
    fn test_spans_cover_input() {
        let input = "{root[work]}/{project[name]}<_v{version:0>3}>";
        let spans: Vec<_> = lex(input).map(|(_, s)| s).collect();
        assert_eq!(spans.first().unwrap().start, 0);
        assert_eq!(spans.last().unwrap().end, input.len());
    }
}
