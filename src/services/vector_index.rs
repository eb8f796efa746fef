//! In-memory vector index with exact cosine-similarity search.
//!
//! Per-session corpora are small (single-digit thousands of chunks) and
//! short-lived, so a linear scan beats the bookkeeping of an approximate
//! index at this scale.

use crate::models::Passage;

#[derive(Debug, Clone)]
struct IndexEntry {
    embedding: Vec<f32>,
    passage: Passage,
}

/// A passage returned from a search, best match first.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub passage: Passage,
    pub score: f32,
}

/// Ordered collection of embedded passages. All embeddings in one index
/// share the dimensionality fixed by the session's provider.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `vectors[i]` paired with `passages[i]`. The slices must line
    /// up; mismatched lengths are a caller bug.
    pub fn insert(&mut self, vectors: Vec<Vec<f32>>, passages: Vec<Passage>) {
        assert_eq!(
            vectors.len(),
            passages.len(),
            "every embedding must pair with exactly one passage"
        );
        debug_assert!(
            self.entries
                .first()
                .map(|e| e.embedding.len())
                .zip(vectors.first().map(Vec::len))
                .is_none_or(|(existing, new)| existing == new),
            "embedding dimensionality must not change within an index"
        );

        self.entries.extend(
            vectors
                .into_iter()
                .zip(passages)
                .map(|(embedding, passage)| IndexEntry { embedding, passage }),
        );
    }

    /// Top `k` passages by descending cosine similarity to `query`. Ties
    /// keep insertion order (the sort is stable); fewer than `k` results
    /// come back when the index is smaller than `k`.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<SearchHit> {
        if self.entries.is_empty() || k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine_similarity(query, &entry.embedding)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(i, score)| SearchHit {
                passage: self.entries[i].passage.clone(),
                score,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cosine similarity of two vectors; zero when either norm is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 { 0.0 } else { dot / denom }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(text: &str, i: usize) -> Passage {
        Passage::new(text, "test.txt", i)
    }

    #[test]
    fn test_cosine_identical_vector_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector_is_zero() {
        let v = vec![1.0, 2.0, 3.0];
        let zero = vec![0.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&v, &zero), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero), 0.0);
    }

    #[test]
    fn test_cosine_orthogonal_is_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_search_empty_index() {
        let index = VectorIndex::new();
        assert!(index.search(&[1.0, 0.0], 5).is_empty());
        assert!(index.search(&[1.0, 0.0], 0).is_empty());
    }

    #[test]
    fn test_search_returns_min_k_n() {
        let mut index = VectorIndex::new();
        index.insert(
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]],
            vec![passage("a", 0), passage("b", 1), passage("c", 2)],
        );

        assert_eq!(index.search(&[1.0, 0.0], 2).len(), 2);
        assert_eq!(index.search(&[1.0, 0.0], 10).len(), 3);
    }

    #[test]
    fn test_search_orders_by_similarity() {
        let mut index = VectorIndex::new();
        index.insert(
            vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]],
            vec![
                passage("orthogonal", 0),
                passage("aligned", 1),
                passage("diagonal", 2),
            ],
        );

        let hits = index.search(&[1.0, 0.0], 3);
        assert_eq!(hits[0].passage.text, "aligned");
        assert_eq!(hits[1].passage.text, "diagonal");
        assert_eq!(hits[2].passage.text, "orthogonal");
        assert!(hits[0].score >= hits[1].score);
        assert!(hits[1].score >= hits[2].score);
    }

    #[test]
    fn test_search_full_index_is_permutation() {
        let mut index = VectorIndex::new();
        index.insert(
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]],
            vec![passage("a", 0), passage("b", 1), passage("c", 2)],
        );

        let hits = index.search(&[0.3, 0.7], 3);
        let mut texts: Vec<&str> = hits.iter().map(|h| h.passage.text.as_str()).collect();
        texts.sort_unstable();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut index = VectorIndex::new();
        index.insert(
            vec![vec![1.0, 0.0], vec![2.0, 0.0], vec![3.0, 0.0]],
            vec![passage("first", 0), passage("second", 1), passage("third", 2)],
        );

        // All three score 1.0 against the query; earlier insertion wins.
        let hits = index.search(&[1.0, 0.0], 3);
        assert_eq!(hits[0].passage.text, "first");
        assert_eq!(hits[1].passage.text, "second");
        assert_eq!(hits[2].passage.text, "third");
    }

    #[test]
    fn test_insert_appends() {
        let mut index = VectorIndex::new();
        index.insert(vec![vec![1.0, 0.0]], vec![passage("a", 0)]);
        index.insert(vec![vec![0.0, 1.0]], vec![passage("b", 0)]);
        assert_eq!(index.len(), 2);
        assert!(!index.is_empty());
    }

    #[test]
    #[should_panic(expected = "every embedding must pair")]
    fn test_insert_mismatched_lengths_panics() {
        let mut index = VectorIndex::new();
        index.insert(vec![vec![1.0, 0.0]], vec![passage("a", 0), passage("b", 1)]);
    }
}
