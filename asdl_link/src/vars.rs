//! Module-local variable substitution: `{v}` references inside
//! instance-parameter values are resolved by raw string replacement
//! *before* pattern expansion (§4.2 ADR-0016). No arithmetic, ever.
//!
//! A bounded two-pass resolver with a visiting set (§9): each variable is
//! resolved once, transitively, and a variable re-entering the visiting
//! set during its own expansion is a cycle.

use indexmap::IndexMap;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarError {
    Undefined(String),
    Cycle(Vec<String>),
}

/// Finds the first `{identifier}` placeholder, splitting the input into
/// `(before, identifier, after)`. Braces never nest in this grammar.
fn find_placeholder(s: &str) -> Option<(&str, &str, &str)> {
    let start = s.find('{')?;
    let end = s[start..].find('}')? + start;
    Some((&s[..start], &s[start + 1..end], &s[end + 1..]))
}

fn resolve_one(
    name: &str,
    raw: &BTreeMap<String, String>,
    resolved: &mut IndexMap<String, String>,
    visiting: &mut Vec<String>,
) -> Result<String, VarError> {
    if let Some(value) = resolved.get(name) {
        return Ok(value.clone());
    }
    if visiting.iter().any(|v| v == name) {
        let mut cycle = visiting.clone();
        cycle.push(name.to_string());
        return Err(VarError::Cycle(cycle));
    }
    let raw_value = raw
        .get(name)
        .ok_or_else(|| VarError::Undefined(name.to_string()))?
        .clone();

    visiting.push(name.to_string());
    let mut out = String::new();
    let mut rest = raw_value.as_str();
    while let Some((pre, ref_name, post)) = find_placeholder(rest) {
        out.push_str(pre);
        out.push_str(&resolve_one(ref_name, raw, resolved, visiting)?);
        rest = post;
    }
    out.push_str(rest);
    visiting.pop();

    resolved.insert(name.to_string(), out.clone());
    Ok(out)
}

/// Fully resolves a module's `variables` table: every value is expanded
/// until it contains no more `{v}` references.
pub fn resolve_module_variables(
    raw: &BTreeMap<String, String>,
) -> Result<IndexMap<String, String>, VarError> {
    let mut resolved = IndexMap::new();
    for name in raw.keys() {
        resolve_one(name, raw, &mut resolved, &mut Vec::new())?;
    }
    Ok(resolved)
}

/// Substitutes `{v}` references in an instance-parameter value against an
/// already-fully-resolved variable table. Undefined references are
/// `E-VAR-UNDEF` even though the table itself resolved cleanly, since the
/// instance may reference a name that was never declared as a variable.
pub fn substitute(raw: &str, resolved_vars: &IndexMap<String, String>) -> Result<String, VarError> {
    let mut out = String::new();
    let mut rest = raw;
    while let Some((pre, name, post)) = find_placeholder(rest) {
        out.push_str(pre);
        let value = resolved_vars
            .get(name)
            .ok_or_else(|| VarError::Undefined(name.to_string()))?;
        out.push_str(value);
        rest = post;
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_transitive_references() {
        let mut raw = BTreeMap::new();
        raw.insert("w".to_string(), "{base}_w".to_string());
        raw.insert("base".to_string(), "10u".to_string());
        let resolved = resolve_module_variables(&raw).unwrap();
        assert_eq!(resolved.get("w").unwrap(), "10u_w");
    }

    #[test]
    fn detects_cycle() {
        let mut raw = BTreeMap::new();
        raw.insert("a".to_string(), "{b}".to_string());
        raw.insert("b".to_string(), "{a}".to_string());
        let err = resolve_module_variables(&raw).unwrap_err();
        assert!(matches!(err, VarError::Cycle(_)));
    }

    #[test]
    fn detects_undefined_variable() {
        let mut raw = BTreeMap::new();
        raw.insert("a".to_string(), "{missing}".to_string());
        let err = resolve_module_variables(&raw).unwrap_err();
        assert_eq!(err, VarError::Undefined("missing".to_string()));
    }

    #[test]
    fn substitute_uses_resolved_table() {
        let mut resolved = IndexMap::new();
        resolved.insert("w".to_string(), "10u".to_string());
        assert_eq!(substitute("m={w}", &resolved).unwrap(), "m=10u");
        assert_eq!(
            substitute("m={missing}", &resolved).unwrap_err(),
            VarError::Undefined("missing".to_string())
        );
    }
}
