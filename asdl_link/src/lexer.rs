//! Tokenizes an authoring-surface pattern string into the structured
//! `asdl_ir::pattern::PatternExpr` shape (§3, §6).
//!
//! This runs as part of the `PatternedGraph` Builder (§4.2), after module
//! variable substitution and before any pattern is expanded. Expansion
//! itself (enum/range/named resolution, broadcast binding) is
//! `asdl_atomize`'s job; this module only turns text into tokens.

use asdl_ir::pattern::{Group, PatternExpr, PatternKind, Segment, Token};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    /// `;` appears in a net/instance/param expression, where splicing is
    /// not allowed (§6 ADR-0022; only endpoint expressions may splice).
    SpliceNotAllowed,
    /// Whitespace directly touches a `|` or `;` separator (ADR-0005/0017).
    WhitespaceAroundSeparator,
    /// A group mixes `|` and `:` syntax.
    MixedGroupSyntax(String),
    /// A group contains more than one `:`.
    MultipleColonsInGroup(String),
    /// A `<N:M>` group's bounds did not parse as integers.
    InvalidRange(String),
    /// A `<` was never closed by a matching `>`.
    UnterminatedGroup,
}

/// Lexes `raw` as a pattern expression of the given kind.
pub fn lex_pattern(raw: &str, kind: PatternKind) -> Result<PatternExpr, LexError> {
    if !matches!(kind, PatternKind::Endpoint) && raw.contains(';') {
        return Err(LexError::SpliceNotAllowed);
    }
    check_separator_whitespace(raw)?;

    let segments = raw
        .split(';')
        .map(lex_segment)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PatternExpr::new(segments))
}

fn check_separator_whitespace(raw: &str) -> Result<(), LexError> {
    let bytes = raw.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'|' || b == b';' {
            let before_ws = i > 0 && bytes[i - 1].is_ascii_whitespace();
            let after_ws = i + 1 < bytes.len() && bytes[i + 1].is_ascii_whitespace();
            if before_ws || after_ws {
                return Err(LexError::WhitespaceAroundSeparator);
            }
        }
    }
    Ok(())
}

fn lex_segment(raw: &str) -> Result<Segment, LexError> {
    let mut tokens = Vec::new();
    let mut rest = raw;

    while let Some(open) = rest.find('<') {
        let (literal, after_open) = rest.split_at(open);
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal.to_string()));
        }
        let close = after_open.find('>').ok_or(LexError::UnterminatedGroup)?;
        let content = &after_open[1..close];
        tokens.push(Token::Group {
            group: lex_group(content)?,
            axis_id: None,
        });
        rest = &after_open[close + 1..];
    }
    if !rest.is_empty() {
        tokens.push(Token::Literal(rest.to_string()));
    }
    Ok(Segment::new(tokens))
}

fn lex_group(content: &str) -> Result<Group, LexError> {
    if let Some(name) = content.strip_prefix('@') {
        return Ok(Group::Named {
            name: name.to_string(),
        });
    }

    let has_pipe = content.contains('|');
    let colon_count = content.matches(':').count();

    if has_pipe && colon_count > 0 {
        return Err(LexError::MixedGroupSyntax(content.to_string()));
    }
    if colon_count > 1 {
        return Err(LexError::MultipleColonsInGroup(content.to_string()));
    }

    if colon_count == 1 {
        let (start_raw, end_raw) = content.split_once(':').expect("colon_count == 1");
        let start: i64 = start_raw
            .trim()
            .parse()
            .map_err(|_| LexError::InvalidRange(content.to_string()))?;
        let end: i64 = end_raw
            .trim()
            .parse()
            .map_err(|_| LexError::InvalidRange(content.to_string()))?;
        return Ok(Group::Range { start, end });
    }

    let alts: Vec<String> = content.split('|').map(str::to_string).collect();
    Ok(Group::Enum(alts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_enum_group() {
        let expr = lex_pattern("M<P|N>", PatternKind::Inst).unwrap();
        assert_eq!(expr.segments.len(), 1);
        let tokens = expr.segments[0].tokens();
        assert_eq!(tokens[0], Token::Literal("M".into()));
        assert_eq!(
            tokens[1],
            Token::Group {
                group: Group::Enum(vec!["P".into(), "N".into()]),
                axis_id: None
            }
        );
    }

    #[test]
    fn lexes_range_group_with_reversed_bounds() {
        let expr = lex_pattern("R<3:0>", PatternKind::Inst).unwrap();
        let tokens = expr.segments[0].tokens();
        assert_eq!(
            tokens[1],
            Token::Group {
                group: Group::Range { start: 3, end: 0 },
                axis_id: None
            }
        );
    }

    #[test]
    fn lexes_named_reference() {
        let expr = lex_pattern("sw_row<@ROW>.BUS<@BUS0>", PatternKind::Endpoint).unwrap();
        let tokens = expr.segments[0].tokens();
        assert_eq!(
            tokens[1],
            Token::Group {
                group: Group::Named { name: "ROW".into() },
                axis_id: None
            }
        );
    }

    #[test]
    fn rejects_mixed_group_syntax() {
        let err = lex_pattern("M<P|N:1>", PatternKind::Inst).unwrap_err();
        assert!(matches!(err, LexError::MixedGroupSyntax(_)));
    }

    #[test]
    fn rejects_splice_outside_endpoint() {
        let err = lex_pattern("A;B", PatternKind::Net).unwrap_err();
        assert_eq!(err, LexError::SpliceNotAllowed);
    }

    #[test]
    fn endpoint_may_splice() {
        let expr = lex_pattern("a.G;b.G", PatternKind::Endpoint).unwrap();
        assert_eq!(expr.segments.len(), 2);
    }

    #[test]
    fn rejects_whitespace_around_separators() {
        assert_eq!(
            lex_pattern("M<P | N>", PatternKind::Inst).unwrap_err(),
            LexError::WhitespaceAroundSeparator
        );
    }
}
