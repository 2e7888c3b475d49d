//! Expands a parsed `PatternExpr` into its atom strings (§4.3).
//!
//! Tokens concatenate literally with no implicit joiner (ADR-0009). Range
//! groups expand in declaration direction (`<3:0>` → 3,2,1,0). Named
//! references substitute a single group from the module's `patterns`
//! table; named patterns may not nest or splice (ADR-0008).

use asdl_ir::atomized::PatternPart;
use asdl_ir::pattern::{Group, NamedPatternDef, PatternExpr, Segment, Token};
use indexmap::IndexMap;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpandError {
    UndefinedNamedPattern(String),
    DuplicateAxisId(String),
}

/// One expanded atom from a segment: its literal text, the `str | int`
/// parts contributed by each group (for `pattern_origin`), the literal
/// text contributed by literal tokens only (`base_name`), and the
/// per-axis index this atom occupies for each tagged group it passed
/// through (used by broadcast binding, ADR-0019/0020).
#[derive(Debug, Clone)]
pub struct ExpandedAtom {
    pub literal: String,
    pub base_name: String,
    pub pattern_parts: Vec<PatternPart>,
    pub axis_index: IndexMap<String, usize>,
}

enum ResolvedToken<'a> {
    Literal(&'a str),
    Group {
        alts: Vec<String>,
        axis_id: Option<String>,
    },
}

fn expand_range(start: i64, end: i64) -> Vec<String> {
    if start <= end {
        (start..=end).map(|v| v.to_string()).collect()
    } else {
        (end..=start).rev().map(|v| v.to_string()).collect()
    }
}

fn resolve_token<'a>(
    token: &'a Token,
    named_patterns: &IndexMap<String, NamedPatternDef>,
) -> Result<ResolvedToken<'a>, ExpandError> {
    match token {
        Token::Literal(s) => Ok(ResolvedToken::Literal(s)),
        Token::Group { group, axis_id } => match group {
            Group::Enum(alts) => Ok(ResolvedToken::Group {
                alts: alts.clone(),
                axis_id: axis_id.clone(),
            }),
            Group::Range { start, end } => Ok(ResolvedToken::Group {
                alts: expand_range(*start, *end),
                axis_id: axis_id.clone(),
            }),
            Group::Named { name } => {
                let def = named_patterns
                    .get(name)
                    .ok_or_else(|| ExpandError::UndefinedNamedPattern(name.clone()))?;
                let alts = match &def.group {
                    Group::Enum(alts) => alts.clone(),
                    Group::Range { start, end } => expand_range(*start, *end),
                    Group::Named { .. } => return Err(ExpandError::UndefinedNamedPattern(name.clone())),
                };
                let axis_id = def.axis_id.clone().or_else(|| Some(name.clone()));
                Ok(ResolvedToken::Group { alts, axis_id })
            }
        },
    }
}

/// Expands one segment into its cartesian product of atoms, in
/// declaration order.
pub fn expand_segment(
    segment: &Segment,
    named_patterns: &IndexMap<String, NamedPatternDef>,
) -> Result<Vec<ExpandedAtom>, ExpandError> {
    let mut resolved = Vec::with_capacity(segment.tokens().len());
    let mut seen_axes = HashSet::new();
    for token in segment.tokens() {
        let rt = resolve_token(token, named_patterns)?;
        if let ResolvedToken::Group { axis_id: Some(id), .. } = &rt {
            if !seen_axes.insert(id.clone()) {
                return Err(ExpandError::DuplicateAxisId(id.clone()));
            }
        }
        resolved.push(rt);
    }

    let mut atoms = vec![ExpandedAtom {
        literal: String::new(),
        base_name: String::new(),
        pattern_parts: Vec::new(),
        axis_index: IndexMap::new(),
    }];

    for rt in &resolved {
        let mut next = Vec::with_capacity(atoms.len());
        match rt {
            ResolvedToken::Literal(s) => {
                for atom in &atoms {
                    let mut a = atom.clone();
                    a.literal.push_str(s);
                    a.base_name.push_str(s);
                    next.push(a);
                }
            }
            ResolvedToken::Group { alts, axis_id } => {
                for atom in &atoms {
                    for (idx, alt) in alts.iter().enumerate() {
                        let mut a = atom.clone();
                        a.literal.push_str(alt);
                        a.pattern_parts.push(match alt.parse::<i64>() {
                            Ok(v) => PatternPart::Int(v),
                            Err(_) => PatternPart::Str(alt.clone()),
                        });
                        if let Some(id) = axis_id {
                            a.axis_index.insert(id.clone(), idx);
                        }
                        next.push(a);
                    }
                }
            }
        }
        atoms = next;
    }

    Ok(atoms)
}

/// Expands a full pattern expression, flattening every segment into one
/// ordered list of `(segment_index, atom_index, atom)` triples. Nets and
/// instances only ever have one segment; only endpoint expressions splice.
pub fn expand_pattern_expr(
    expr: &PatternExpr,
    named_patterns: &IndexMap<String, NamedPatternDef>,
) -> Result<Vec<(usize, usize, ExpandedAtom)>, ExpandError> {
    let mut out = Vec::new();
    for (segment_index, segment) in expr.segments.iter().enumerate() {
        let atoms = expand_segment(segment, named_patterns)?;
        for (atom_index, atom) in atoms.into_iter().enumerate() {
            out.push((segment_index, atom_index, atom));
        }
    }
    Ok(out)
}
