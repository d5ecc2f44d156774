//! Scoring passes over the whole index and the final ordering step

use super::similarity::cosine_similarity;
use super::{KeywordScorer, SearchHit};
use crate::error::Result;
use crate::index::IndexEntry;
use std::cmp::Ordering;
use std::sync::Arc;

/// Score every entry against `query_embedding`, keeping those strictly above `threshold`
pub fn semantic_hits(
    entries: &[Arc<IndexEntry>],
    query_embedding: &[f32],
    threshold: f32,
) -> Result<Vec<SearchHit>> {
    let mut hits = Vec::new();

    for entry in entries {
        let similarity = cosine_similarity(query_embedding, &entry.embedding)?;
        if similarity > threshold {
            hits.push(SearchHit {
                entry: Arc::clone(entry),
                score: similarity,
                semantic_similarity: Some(similarity),
            });
        }
    }

    Ok(hits)
}

/// Keyword-score every entry, dropping those that match nothing
pub fn keyword_hits(
    entries: &[Arc<IndexEntry>],
    query: &str,
    scorer: &KeywordScorer<'_>,
) -> Vec<SearchHit> {
    let keywords = scorer.keywords(query);
    if keywords.is_empty() {
        return Vec::new();
    }

    entries
        .iter()
        .filter_map(|entry| {
            let score = scorer.score(entry, &keywords);
            (score > 0.0).then(|| SearchHit::new(Arc::clone(entry), score))
        })
        .collect()
}

/// Order by descending score and keep the first `limit`.
///
/// The sort is stable, so equal scores keep index order.
pub fn sort_and_truncate(hits: &mut Vec<SearchHit>, limit: usize) {
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    hits.truncate(limit);
}
