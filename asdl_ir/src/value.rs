//! `ParamValue`, the primitive value type shared by every pass, and the
//! order-preserving parameter map built on top of it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A parameter value. ASDL does no expression evaluation (§1 Non-goals) —
/// these are the only shapes a literal parameter value can take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// An insertion-ordered map of unique-within-scope parameter names to
/// values. Rendering (§4.7) re-sorts into lexical key order only at the
/// point of emission; the map itself preserves authoring order so earlier
/// passes can report "first declared, then redeclared" diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamMap(IndexMap<String, ParamValue>);

impl ParamMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Inserts a parameter, returning the previous value if the key was
    /// already present (callers decide whether that's an error).
    pub fn insert(&mut self, key: impl Into<String>, value: ParamValue) -> Option<ParamValue> {
        self.0.insert(key.into(), value)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates in insertion (authoring) order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates in lexical key order, as the Renderer requires (§4.6).
    pub fn iter_sorted(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        let mut entries: Vec<_> = self.0.iter().map(|(k, v)| (k.as_str(), v)).collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter()
    }
}

impl FromIterator<(String, ParamValue)> for ParamMap {
    fn from_iter<T: IntoIterator<Item = (String, ParamValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_iteration_is_lexical_regardless_of_insertion_order() {
        let mut map = ParamMap::new();
        map.insert("w", ParamValue::Int(1));
        map.insert("m", ParamValue::Int(2));
        let keys: Vec<_> = map.iter_sorted().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["m", "w"]);
    }

    #[test]
    fn insertion_order_preserved_for_iter() {
        let mut map = ParamMap::new();
        map.insert("w", ParamValue::Int(1));
        map.insert("m", ParamValue::Int(2));
        let keys: Vec<_> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["w", "m"]);
    }

    #[test]
    fn display_renders_bare_values() {
        assert_eq!(ParamValue::Int(3).to_string(), "3");
        assert_eq!(ParamValue::Bool(true).to_string(), "true");
        assert_eq!(ParamValue::String("x".into()).to_string(), "x");
    }
}
