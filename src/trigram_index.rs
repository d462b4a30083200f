// Trigram index: per-field fuzzy text search via character-trigram posting
// lists, following the teacher's inverted-index shape (trigram -> document
// keys) but scoped down to the exact update/remove/search/fuzzy_search
// contract this store needs.

use std::collections::{HashMap, HashSet};

/// Split a lowercased string into contiguous 3-byte windows.
///
/// This slices raw UTF-8 bytes rather than `char`s, so a multi-byte
/// character can straddle a window boundary and produce a gram that isn't
/// a clean substring of the original text. That is a known limitation
/// carried over deliberately rather than fixed: fixing it would change
/// scores for any text containing non-ASCII characters. Invalid byte
/// sequences produced by the split are lossily repaired (replacement
/// character) so the gram can still be stored as a `String`.
fn trigrams(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let bytes = lower.as_bytes();

    if bytes.len() < 3 {
        return vec![lower];
    }

    (0..=bytes.len() - 3)
        .map(|i| String::from_utf8_lossy(&bytes[i..i + 3]).into_owned())
        .collect()
}

#[derive(Default)]
pub struct TrigramIndex {
    postings: HashMap<String, HashSet<String>>,
    texts: HashMap<String, String>,
}

impl TrigramIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn retract(&mut self, key: &str, text: &str) {
        for gram in trigrams(text) {
            if let Some(set) = self.postings.get_mut(&gram) {
                set.remove(key);
                if set.is_empty() {
                    self.postings.remove(&gram);
                }
            }
        }
    }

    /// Update (or insert) the text indexed for `key`, retracting any
    /// previous contribution first.
    pub fn update(&mut self, key: &str, text: &str) {
        if let Some(prev) = self.texts.get(key).cloned() {
            self.retract(key, &prev);
        }
        for gram in trigrams(text) {
            self.postings.entry(gram).or_default().insert(key.to_string());
        }
        self.texts.insert(key.to_string(), text.to_string());
    }

    /// Remove all trigrams contributed by `key`. No-op if absent.
    pub fn remove(&mut self, key: &str) {
        if let Some(text) = self.texts.remove(key) {
            self.retract(key, &text);
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.texts.contains_key(key)
    }

    /// `(key, score)` pairs where score is the fraction of query trigrams
    /// whose posting list contains the key. Sorted descending; truncated
    /// to `max_results` when positive.
    pub fn search(&self, query: &str, max_results: usize) -> Vec<(String, f64)> {
        let query_grams = trigrams(query);
        if query_grams.is_empty() {
            return Vec::new();
        }
        let total = query_grams.len() as f64;

        let mut hits: HashMap<&str, usize> = HashMap::new();
        for gram in &query_grams {
            if let Some(set) = self.postings.get(gram) {
                for key in set {
                    *hits.entry(key.as_str()).or_insert(0) += 1;
                }
            }
        }

        let mut results: Vec<(String, f64)> = hits
            .into_iter()
            .map(|(key, count)| (key.to_string(), count as f64 / total))
            .collect();

        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        if max_results > 0 {
            results.truncate(max_results);
        }
        results
    }

    pub fn fuzzy_search(&self, query: &str, min_score: f64, max_results: usize) -> Vec<(String, f64)> {
        let mut results = self.search(query, 0);
        results.retain(|(_, score)| *score >= min_score);
        if max_results > 0 {
            results.truncate(max_results);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_char_and_short_strings_become_one_gram() {
        assert_eq!(trigrams("a"), vec!["a"]);
        assert_eq!(trigrams("ab"), vec!["ab"]);
        assert_eq!(trigrams("abc"), vec!["abc"]);
        assert_eq!(trigrams("abcd"), vec!["abc", "bcd"]);
    }

    #[test]
    fn lowercases_before_splitting() {
        assert_eq!(trigrams("ABC"), vec!["abc"]);
    }

    #[test]
    fn update_then_search_exact_substring_scores_one() {
        let mut idx = TrigramIndex::new();
        idx.update("a", "hello world");
        let hits = idx.search("hello", 0);
        assert_eq!(hits[0].0, "a");
        assert!((hits[0].1 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn update_overwrites_previous_text() {
        let mut idx = TrigramIndex::new();
        idx.update("a", "hello");
        idx.update("a", "goodbye");
        assert!(idx.search("hello", 0).is_empty());
        assert!(!idx.search("goodbye", 0).is_empty());
    }

    #[test]
    fn remove_retracts_all_grams_and_empties_postings() {
        let mut idx = TrigramIndex::new();
        idx.update("a", "hello");
        idx.remove("a");
        assert!(idx.search("hello", 0).is_empty());
        assert!(idx.postings.is_empty());
        assert!(!idx.contains("a"));
    }

    #[test]
    fn remove_missing_key_is_a_no_op() {
        let mut idx = TrigramIndex::new();
        idx.remove("nope");
    }

    #[test]
    fn fuzzy_search_drops_low_scores_and_truncates() {
        let mut idx = TrigramIndex::new();
        idx.update("a", "hello world");
        idx.update("b", "help");
        let hits = idx.fuzzy_search("hello", 0.5, 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "a");
    }

    #[test]
    fn search_max_results_zero_means_unbounded() {
        let mut idx = TrigramIndex::new();
        for i in 0..10 {
            idx.update(&format!("k{i}"), "common text");
        }
        assert_eq!(idx.search("common", 0).len(), 10);
        assert_eq!(idx.search("common", 3).len(), 3);
    }
}
