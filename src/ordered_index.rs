// Ordered index: an ordered collection of (scalar, key) pairs supporting
// ascending equality lookups, backed by `BTreeMap`.
//
// `Scalar`'s derived `PartialOrd`/`Ord` clusters values by variant first
// (string < integer < float, matching declaration order) and by value
// within a variant, so entries of different scalar kinds never interleave
// in the map even though a single `BTreeMap` needs one total order. That
// is what lets "comparisons are defined only for uniform scalar types"
// hold: a query of one kind only ever walks into same-kind neighbors.

use crate::types::Scalar;
use std::collections::BTreeMap;

#[derive(Default)]
pub struct OrderedIndex {
    by_value: BTreeMap<(Scalar, String), ()>,
    by_key: std::collections::HashMap<String, Scalar>,
}

impl OrderedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `(value, key)`, replacing any existing entry for `key`.
    pub fn insert(&mut self, key: &str, value: Scalar) {
        if let Some(prev) = self.by_key.remove(key) {
            self.by_value.remove(&(prev, key.to_string()));
        }
        self.by_value.insert((value.clone(), key.to_string()), ());
        self.by_key.insert(key.to_string(), value);
    }

    pub fn remove(&mut self, key: &str) {
        if let Some(prev) = self.by_key.remove(key) {
            self.by_value.remove(&(prev, key.to_string()));
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    /// Keys whose stored value equals `value`, found by ascending from
    /// `value` and stopping at the first strictly-greater entry.
    pub fn equals(&self, value: &Scalar) -> Vec<String> {
        let lower = (value.clone(), String::new());
        let mut out = Vec::new();
        for ((v, key), _) in self.by_value.range(lower..) {
            if v != value {
                break;
            }
            out.push(key.clone());
        }
        out
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_lookup_finds_all_matches() {
        let mut idx = OrderedIndex::new();
        idx.insert("a", Scalar::Str("red".into()));
        idx.insert("b", Scalar::Str("blue".into()));
        idx.insert("c", Scalar::Str("red".into()));

        let mut reds = idx.equals(&Scalar::Str("red".into()));
        reds.sort();
        assert_eq!(reds, vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn insert_replaces_existing_key() {
        let mut idx = OrderedIndex::new();
        idx.insert("a", Scalar::Int(1));
        idx.insert("a", Scalar::Int(2));
        assert!(idx.equals(&Scalar::Int(1)).is_empty());
        assert_eq!(idx.equals(&Scalar::Int(2)), vec!["a".to_string()]);
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn mixed_types_do_not_cross_match() {
        let mut idx = OrderedIndex::new();
        idx.insert("a", Scalar::Int(1));
        idx.insert("b", Scalar::Float(1.0));
        assert_eq!(idx.equals(&Scalar::Int(1)), vec!["a".to_string()]);
        assert_eq!(idx.equals(&Scalar::Float(1.0)), vec!["b".to_string()]);
    }

    #[test]
    fn remove_drops_the_entry() {
        let mut idx = OrderedIndex::new();
        idx.insert("a", Scalar::Int(1));
        idx.remove("a");
        assert!(idx.is_empty());
        assert!(idx.equals(&Scalar::Int(1)).is_empty());
    }

    #[test]
    fn no_match_returns_empty() {
        let mut idx = OrderedIndex::new();
        idx.insert("a", Scalar::Int(1));
        assert!(idx.equals(&Scalar::Int(2)).is_empty());
    }
}
