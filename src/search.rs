// Hybrid search planner: merges text, vector, and filter criteria into a
// single ranked, deduplicated response.

use crate::error::Result;
use crate::index_manager::IndexManager;
use crate::types::{Entry, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub text: Option<String>,
    pub vector: Option<Vec<f32>>,
    pub filters: BTreeMap<String, Value>,
    pub max_results: usize,
    pub min_score: f64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchResult {
    pub key: String,
    pub value: Value,
    pub text_score: f64,
    pub vector_score: f64,
    pub combined_score: f64,
}

#[derive(Default)]
struct Accum {
    text_score: f64,
    vector_score: f64,
    text_hit: bool,
    vector_hit: bool,
}

/// Run `query` against `index_manager`, resolving surviving keys against
/// `documents` for their current value. Expired-but-not-yet-GC'd entries
/// are not filtered here -- that staleness window is accepted by design
/// (see the store's TTL semantics).
pub fn search(
    index_manager: &IndexManager,
    documents: &BTreeMap<String, Entry>,
    query: &SearchQuery,
) -> Result<Vec<SearchResult>> {
    let mut by_key: BTreeMap<String, Accum> = BTreeMap::new();

    if let Some(text) = query.text.as_deref().filter(|t| !t.is_empty()) {
        for field in index_manager.text_fields() {
            for (key, score) in
                index_manager.text_search(&field, text, query.min_score, query.max_results)
            {
                let entry = by_key.entry(key).or_default();
                entry.text_hit = true;
                if score > entry.text_score {
                    entry.text_score = score;
                }
            }
        }
    }

    if let Some(vector) = query.vector.as_deref().filter(|v| !v.is_empty()) {
        for field in index_manager.vector_fields() {
            if let Some(hits) = index_manager.vector_search(&field, vector, query.max_results) {
                for (key, score) in hits? {
                    let score = score as f64;
                    let entry = by_key.entry(key).or_default();
                    entry.vector_hit = true;
                    if score > entry.vector_score {
                        entry.vector_score = score;
                    }
                }
            }
        }
    }

    let allowed = if query.filters.is_empty() {
        None
    } else {
        index_manager.search(&query.filters)
    };
    if let Some(allowed) = &allowed {
        by_key.retain(|key, _| allowed.contains(key));
    }

    let mut results: Vec<SearchResult> = by_key
        .into_iter()
        .filter_map(|(key, accum)| {
            let entry = documents.get(&key)?;
            let combined_score = match (accum.text_hit, accum.vector_hit) {
                (true, true) => (accum.text_score + accum.vector_score) / 2.0,
                (false, true) => accum.vector_score,
                _ => 0.0,
            };
            Some(SearchResult {
                key,
                value: entry.value.clone(),
                text_score: accum.text_score,
                vector_score: accum.vector_score,
                combined_score,
            })
        })
        .collect();

    results.sort_by(|a, b| {
        b.combined_score
            .partial_cmp(&a.combined_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    if query.max_results > 0 {
        results.truncate(query.max_results);
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IndexType;
    use pretty_assertions::assert_eq;

    fn doc(pairs: &[(&str, Value)]) -> Value {
        let mut m = BTreeMap::new();
        for (k, v) in pairs {
            m.insert(k.to_string(), v.clone());
        }
        Value::Map(m)
    }

    #[test]
    fn text_only_hit_has_zero_combined_score() {
        let mgr = IndexManager::new();
        mgr.add_index("title", IndexType::Text, 3);
        mgr.update("a", &doc(&[("title", Value::Str("hello world".into()))]));

        let mut docs = BTreeMap::new();
        docs.insert("a".to_string(), Entry::new(doc(&[("title", Value::Str("hello world".into()))])));

        let q = SearchQuery {
            text: Some("hello".into()),
            ..Default::default()
        };
        let results = search(&mgr, &docs, &q).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text_score, 1.0);
        assert_eq!(results[0].combined_score, 0.0);
    }

    #[test]
    fn vector_only_hit_reports_raw_vector_score_not_halved() {
        let mgr = IndexManager::new();
        mgr.add_index("embedding", IndexType::Vector, 3);
        mgr.update("a", &doc(&[("embedding", Value::Seq(vec![Value::Float(1.0), Value::Float(0.0), Value::Float(0.0)]))]));
        mgr.update("b", &doc(&[("embedding", Value::Seq(vec![Value::Float(0.0), Value::Float(1.0), Value::Float(0.0)]))]));

        let mut docs = BTreeMap::new();
        docs.insert("a".to_string(), Entry::new(doc(&[])));
        docs.insert("b".to_string(), Entry::new(doc(&[])));

        let q = SearchQuery {
            vector: Some(vec![1.0, 0.0, 0.0]),
            max_results: 2,
            ..Default::default()
        };
        let results = search(&mgr, &docs, &q).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].key, "a");
        assert!((results[0].combined_score - 1.0).abs() < 1e-6);
        assert!(results[1].combined_score.abs() < 1e-6);
    }

    #[test]
    fn combined_text_and_vector_averages_scores() {
        let mgr = IndexManager::new();
        mgr.add_index("title", IndexType::Text, 3);
        mgr.add_index("embedding", IndexType::Vector, 3);
        let value = doc(&[
            ("title", Value::Str("hello".into())),
            (
                "embedding",
                Value::Seq(vec![Value::Float(1.0), Value::Float(0.0), Value::Float(0.0)]),
            ),
        ]);
        mgr.update("a", &value);

        let mut docs = BTreeMap::new();
        docs.insert("a".to_string(), Entry::new(value));

        let q = SearchQuery {
            text: Some("hello".into()),
            vector: Some(vec![1.0, 0.0, 0.0]),
            ..Default::default()
        };
        let results = search(&mgr, &docs, &q).unwrap();
        assert_eq!(results.len(), 1);
        let r = &results[0];
        assert!((r.combined_score - (r.text_score + r.vector_score) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn filters_restrict_to_allowed_set() {
        let mgr = IndexManager::new();
        mgr.add_index("title", IndexType::Text, 3);
        mgr.add_index("tag", IndexType::Ordered, 3);
        mgr.update("a", &doc(&[("title", Value::Str("hello".into())), ("tag", Value::Str("red".into()))]));
        mgr.update("b", &doc(&[("title", Value::Str("hello".into())), ("tag", Value::Str("blue".into()))]));

        let mut docs = BTreeMap::new();
        docs.insert("a".to_string(), Entry::new(doc(&[("tag", Value::Str("red".into()))])));
        docs.insert("b".to_string(), Entry::new(doc(&[("tag", Value::Str("blue".into()))])));

        let mut filters = BTreeMap::new();
        filters.insert("tag".to_string(), Value::Str("red".into()));
        let q = SearchQuery {
            text: Some("hello".into()),
            filters,
            ..Default::default()
        };
        let results = search(&mgr, &docs, &q).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].key, "a");
    }

    #[test]
    fn missing_document_is_dropped_from_results() {
        let mgr = IndexManager::new();
        mgr.add_index("title", IndexType::Text, 3);
        mgr.update("a", &doc(&[("title", Value::Str("hello".into()))]));

        let docs: BTreeMap<String, Entry> = BTreeMap::new(); // racing delete
        let q = SearchQuery {
            text: Some("hello".into()),
            ..Default::default()
        };
        assert!(search(&mgr, &docs, &q).unwrap().is_empty());
    }

    #[test]
    fn vector_error_fails_whole_query() {
        let mgr = IndexManager::new();
        mgr.add_index("embedding", IndexType::Vector, 3);
        let docs: BTreeMap<String, Entry> = BTreeMap::new();
        let q = SearchQuery {
            vector: Some(vec![1.0, 0.0]), // wrong dimension
            ..Default::default()
        };
        assert!(search(&mgr, &docs, &q).is_err());
    }
}
