// Index manager: owns the three per-field index families, routes
// document updates/removals into them, and answers filter searches
// against the ordered indexes. Each family is behind its own
// `parking_lot::RwLock` so the manager can release one lock without
// blocking the others, per the concurrency model's "own internal lock"
// requirement.

use crate::error::{Result, StoreError};
use crate::ordered_index::OrderedIndex;
use crate::trigram_index::TrigramIndex;
use crate::types::{IndexType, Value};
use crate::vector_index::VectorIndex;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

pub const DEFAULT_VECTOR_DIMENSION: usize = 384;

#[derive(Default)]
pub struct IndexManager {
    text: RwLock<HashMap<String, TrigramIndex>>,
    vector: RwLock<HashMap<String, VectorIndex>>,
    ordered: RwLock<HashMap<String, OrderedIndex>>,
}

impl IndexManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the named index if absent; no-op if it already exists.
    pub fn add_index(&self, field: &str, index_type: IndexType, vector_dimension: usize) {
        match index_type {
            IndexType::Text => {
                self.text
                    .write()
                    .entry(field.to_string())
                    .or_insert_with(TrigramIndex::new);
            }
            IndexType::Vector => {
                self.vector
                    .write()
                    .entry(field.to_string())
                    .or_insert_with(|| VectorIndex::new(vector_dimension));
            }
            IndexType::Ordered => {
                self.ordered
                    .write()
                    .entry(field.to_string())
                    .or_insert_with(OrderedIndex::new);
            }
        }
    }

    pub fn remove_index(&self, field: &str, index_type: IndexType) -> Result<()> {
        let removed = match index_type {
            IndexType::Text => self.text.write().remove(field).is_some(),
            IndexType::Vector => self.vector.write().remove(field).is_some(),
            IndexType::Ordered => self.ordered.write().remove(field).is_some(),
        };
        if removed {
            Ok(())
        } else {
            Err(StoreError::IndexNotFound {
                field: field.to_string(),
                index_type: index_type.to_string(),
            })
        }
    }

    pub fn has_index(&self, field: &str, index_type: IndexType) -> bool {
        match index_type {
            IndexType::Text => self.text.read().contains_key(field),
            IndexType::Vector => self.vector.read().contains_key(field),
            IndexType::Ordered => self.ordered.read().contains_key(field),
        }
    }

    /// Forward `value`'s fields to every index whose field name matches a
    /// key in the document, after type-checking. Type mismatches are
    /// silently skipped rather than failed. Non-mapping values are not
    /// indexed at all.
    pub fn update(&self, key: &str, value: &Value) {
        let Some(map) = value.as_map() else {
            return;
        };

        {
            let mut text = self.text.write();
            for (field, idx) in text.iter_mut() {
                if let Some(Value::Str(s)) = map.get(field) {
                    idx.update(key, s);
                }
            }
        }
        {
            let mut vector = self.vector.write();
            for (field, idx) in vector.iter_mut() {
                if let Some(field_value) = map.get(field) {
                    if let Some(v) = field_value.as_vector() {
                        // Dimension mismatches are a type mismatch from the
                        // index's perspective too: skip rather than fail.
                        let _ = idx.update(key, &v);
                    }
                }
            }
        }
        {
            let mut ordered = self.ordered.write();
            for (field, idx) in ordered.iter_mut() {
                if let Some(field_value) = map.get(field) {
                    if let Some(scalar) = field_value.as_scalar() {
                        idx.insert(key, scalar);
                    }
                }
            }
        }
    }

    /// Remove `key` from every index of every type. Idempotent.
    pub fn remove(&self, key: &str) {
        for idx in self.text.write().values_mut() {
            idx.remove(key);
        }
        for idx in self.vector.write().values_mut() {
            idx.remove(key);
        }
        for idx in self.ordered.write().values_mut() {
            idx.remove(key);
        }
    }

    pub fn text_search(&self, field: &str, query: &str, min_score: f64, max_results: usize) -> Vec<(String, f64)> {
        self.text
            .read()
            .get(field)
            .map(|idx| idx.fuzzy_search(query, min_score, max_results))
            .unwrap_or_default()
    }

    pub fn text_fields(&self) -> Vec<String> {
        self.text.read().keys().cloned().collect()
    }

    pub fn vector_fields(&self) -> Vec<String> {
        self.vector.read().keys().cloned().collect()
    }

    pub fn vector_search(&self, field: &str, query: &[f32], max_results: usize) -> Option<Result<Vec<(String, f32)>>> {
        self.vector
            .read()
            .get(field)
            .map(|idx| idx.search(query, max_results))
    }

    /// Equality filter search. Each `(field, value)` pair constrains the
    /// result to keys whose ordered index entry for `field` equals `value`;
    /// fields without a matching ordered index, or whose filter value isn't
    /// a comparable scalar, contribute no constraint. Returns `None` when
    /// *no* filter contributed a constraint (meaning "unconstrained" rather
    /// than "no matches") so the search planner can tell the two apart.
    pub fn search(&self, filters: &std::collections::BTreeMap<String, Value>) -> Option<HashSet<String>> {
        let ordered = self.ordered.read();
        let mut result: Option<HashSet<String>> = None;

        for (field, value) in filters {
            let Some(idx) = ordered.get(field) else {
                continue;
            };
            let Some(scalar) = value.as_scalar() else {
                continue;
            };
            let matches: HashSet<String> = idx.equals(&scalar).into_iter().collect();
            result = Some(match result {
                None => matches,
                Some(prev) => prev.intersection(&matches).cloned().collect(),
            });
        }

        result
    }
}
