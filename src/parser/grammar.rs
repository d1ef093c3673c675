//! Parser for template strings using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::TemplateParseError;
use crate::parser::ast::{FormatSpec, KeyPath, Node, Placeholder};
use crate::parser::lexer::{self, Token};

/// Parse one template string into its AST.
///
/// Inner references must already be expanded; a leftover `{@key}` is a
/// syntax error here, as are stray braces and nested or unterminated
/// optional groups.
pub fn parse(input: &str) -> Result<Vec<Node>, Vec<TemplateParseError>> {
    let len = input.len();

    let token_iter = lexer::lex(input).map(|(tok, span)| (tok, span.into()));

    let token_stream = Stream::from_iter(token_iter).map((len..len).into(), |(t, s): (_, _)| (t, s));

    template_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

fn template_parser<'a, I>() -> impl Parser<'a, I, Vec<Node>, extra::Err<Rich<'a, Token>>>
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let literal = select! {
        Token::Text(s) => Node::Literal(s),
    };

    let placeholder = select! {
        Token::Placeholder(p) => p,
    }
    .try_map(|p, span| {
        if p.inner {
            return Err(Rich::custom(
                span,
                format!("unresolved inner reference '{}'", p.raw),
            ));
        }
        let spec = match &p.spec {
            Some(raw_spec) => match FormatSpec::parse(raw_spec) {
                Ok(spec) => Some(spec),
                Err(message) => return Err(Rich::custom(span, message)),
            },
            None => None,
        };
        Ok(Node::Placeholder(Placeholder {
            path: KeyPath::new(p.path),
            spec,
            raw: p.raw,
        }))
    });

    let item = choice((literal, placeholder));

    // Optional groups do not nest; only literals and placeholders inside
    let group = item
        .clone()
        .repeated()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::AngleOpen), just(Token::AngleClose))
        .map(Node::Optional);

    choice((item, group))
        .repeated()
        .collect::<Vec<_>>()
        .then_ignore(end())
}
