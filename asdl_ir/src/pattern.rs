//! The `PatternExpr` model: a sequence of segments, each a sequence of
//! tokens, each token a literal or a group (§3 PatternExpr).
//!
//! Parsing the raw authoring-surface string into this shape is done by
//! `asdl_link::lexer`, as part of building the `PatternedGraph`; this
//! crate only defines the shape and the per-module table that indexes
//! it by `ExprId`.

use crate::ids::ExprId;
use crate::span::SourceSpan;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One alternative/range/reference inside `<...>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Group {
    /// `<a|b|c>` — ordered list of literal alternatives.
    Enum(Vec<String>),
    /// `<N:M>` — inclusive numeric range; direction is `start <= end`.
    Range { start: i64, end: i64 },
    /// `<@name>` — resolved against the module's `patterns` table.
    Named { name: String },
}

impl Group {
    /// An optional tagged axis identity distinct from the group's own name
    /// (ADR-0020) is carried alongside the group rather than inside it,
    /// since only named patterns can carry a tag and untagged groups are
    /// the overwhelming common case.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Enum(alts) => alts.len(),
            Self::Range { start, end } => (start - end).unsigned_abs() as usize + 1,
            Self::Named { .. } => 0, // resolved length comes from the referenced pattern
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single token inside a pattern segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Token {
    /// A plain literal substring (may be empty only if an adjacent token
    /// in the same segment is non-empty).
    Literal(String),
    /// A bracketed group, optionally carrying a tagged axis id (ADR-0020).
    Group { group: Group, axis_id: Option<String> },
}

/// One `;`-separated segment of an endpoint/net/instance expression. Nets
/// and instances never contain `;` (ADR-0022); only endpoint expressions
/// may splice across segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment(pub Vec<Token>);

impl Segment {
    #[must_use]
    pub fn new(tokens: Vec<Token>) -> Self {
        Self(tokens)
    }

    pub fn tokens(&self) -> &[Token] {
        &self.0
    }
}

/// A parsed pattern expression: one or more segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternExpr {
    pub segments: Vec<Segment>,
}

impl PatternExpr {
    #[must_use]
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// A pattern expression with no groups at all — every segment is a
    /// single literal token.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.segments.iter().all(|seg| {
            seg.0
                .iter()
                .all(|tok| matches!(tok, Token::Literal(_)))
        })
    }
}

/// What kind of entity a pattern expression was registered for; this
/// drives which validation rules apply downstream (e.g. nets reject `;`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternKind {
    Net,
    Inst,
    Endpoint,
    Param,
}

/// A module-local named pattern definition (`patterns: { BUS0: { expr: <24:0>, tag: BUS } }`),
/// referenced elsewhere via `<@name>`. Named patterns are always a single
/// group — they may not nest or splice (§4.3 ADR-0008).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedPatternDef {
    pub group: Group,
    pub axis_id: Option<String>,
    pub source_span: Option<SourceSpan>,
}

/// One entry in a module's pattern-expression table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternEntry {
    pub raw: String,
    pub kind: PatternKind,
    pub parsed: PatternExpr,
    pub source_span: Option<SourceSpan>,
}

/// Per-module table mapping `expr_id -> {raw, kind, pattern_parts, source_span}`
/// (§3). Every pattern-bearing string in a module is registered here under a
/// fresh `ExprId` before atomization runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternTable(IndexMap<ExprId, PatternEntry>);

impl PatternTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: ExprId, entry: PatternEntry) {
        self.0.insert(id, entry);
    }

    #[must_use]
    pub fn get(&self, id: ExprId) -> Option<&PatternEntry> {
        self.0.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ExprId, &PatternEntry)> {
        self.0.iter().map(|(id, entry)| (*id, entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_group_length_is_inclusive_both_directions() {
        assert_eq!(Group::Range { start: 3, end: 0 }.len(), 4);
        assert_eq!(Group::Range { start: 0, end: 3 }.len(), 4);
        assert_eq!(Group::Range { start: 5, end: 5 }.len(), 1);
    }

    #[test]
    fn enum_group_length_is_alternative_count() {
        let g = Group::Enum(vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(g.len(), 3);
    }

    #[test]
    fn is_literal_true_only_without_groups() {
        let lit = PatternExpr::new(vec![Segment::new(vec![Token::Literal("foo".into())])]);
        assert!(lit.is_literal());

        let pat = PatternExpr::new(vec![Segment::new(vec![Token::Group {
            group: Group::Enum(vec!["a".into()]),
            axis_id: None,
        }])]);
        assert!(!pat.is_literal());
    }
}
