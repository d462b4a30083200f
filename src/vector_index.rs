// Vector index: brute-force cosine similarity over unit-normalized
// float32 vectors of a fixed dimension. The teacher's HNSW graph is
// overkill for the store's "approximate nearest-neighbor structures
// beyond brute-force cosine scan" non-goal; this is the brute-force scan
// that non-goal asks for instead.

use crate::error::{Result, StoreError};
use std::collections::HashMap;

fn normalize(vector: &[f32]) -> Vec<f32> {
    let magnitude = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude == 0.0 {
        return vec![0.0; vector.len()];
    }
    vector.iter().map(|x| x / magnitude).collect()
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub struct VectorIndex {
    dimension: usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl VectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: HashMap::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    /// Normalize a copy of `vector` to unit length and store it under `key`.
    /// A zero-magnitude vector is stored as zeros (cosine against zeros is
    /// defined as 0 by `cosine`, since the dot product is 0).
    pub fn update(&mut self, key: &str, vector: &[f32]) -> Result<()> {
        self.check_dimension(vector)?;
        self.vectors.insert(key.to_string(), normalize(vector));
        Ok(())
    }

    pub fn remove(&mut self, key: &str) {
        self.vectors.remove(key);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vectors.contains_key(key)
    }

    /// Top-`k` keys by cosine similarity to `query`, descending. Fewer than
    /// `k` results are returned if fewer vectors are stored.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(String, f32)>> {
        self.check_dimension(query)?;
        let query = normalize(query);

        let mut scored: Vec<(String, f32)> = self
            .vectors
            .iter()
            .map(|(key, v)| (key.clone(), cosine(&query, v)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    /// Per-query top-k, preserving input order. Queries run one thread each
    /// (the store's population is small enough that this is a genuine
    /// speedup without needing a thread pool crate). Any single query's
    /// dimension mismatch fails the whole batch.
    pub fn batch_search(
        &self,
        queries: &[Vec<f32>],
        k: usize,
    ) -> Result<Vec<Vec<(String, f32)>>> {
        std::thread::scope(|scope| {
            let handles: Vec<_> = queries
                .iter()
                .map(|q| scope.spawn(|| self.search(q, k)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("vector search thread panicked"))
                .collect()
        })
    }
}
