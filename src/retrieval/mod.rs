//! Query-time retrieval over the loaded index
//!
//! Semantic ranking by cosine similarity, keyword scoring as fallback, the filter
//! layer with its facet helpers, and related-post lookup. [`SearchService`] owns
//! the index and model and ties these together.

mod filters;
mod keyword;
mod ranking;
mod related;
mod service;
mod similarity;

pub use filters::{
    filter_counts, preview_count, suggestions, viable_filter_combinations, FilterCounts,
    FilterField, SearchFilters, Suggestions,
};
pub use keyword::{extract_keywords, KeywordScorer};
pub use ranking::{keyword_hits, semantic_hits, sort_and_truncate};
pub use related::{PostRef, RelatedFinder, RelatedOptions, RelatedPost};
pub use service::{SearchService, SearchSettings, ServiceState};
pub use similarity::cosine_similarity;

use crate::config::SearchDefaults;
use crate::index::{IndexEntry, PostFormat};
use serde::{Deserialize, Serialize, Serializer};
use std::sync::Arc;

/// Per-call search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOptions {
    pub limit: usize,
    /// Semantic results must score strictly above this
    pub threshold: f32,
    pub use_semantic_search: bool,
    #[serde(default)]
    pub filters: SearchFilters,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::from_defaults(&SearchDefaults::default())
    }
}

impl SearchOptions {
    pub fn from_defaults(defaults: &SearchDefaults) -> Self {
        Self {
            limit: defaults.limit,
            threshold: defaults.threshold,
            use_semantic_search: defaults.use_semantic_search,
            filters: SearchFilters::default(),
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn keyword_only(mut self) -> Self {
        self.use_semantic_search = false;
        self
    }

    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }
}

/// Which ranking produced a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Semantic,
    Keyword,
}

/// A scored index entry
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub entry: Arc<IndexEntry>,
    pub score: f32,
    /// Raw cosine similarity, before any boosts; only set by semantic ranking
    pub semantic_similarity: Option<f32>,
}

impl SearchHit {
    pub fn new(entry: Arc<IndexEntry>, score: f32) -> Self {
        Self {
            entry,
            score,
            semantic_similarity: None,
        }
    }
}

/// Serialized form of a hit: entry fields without the embedding
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HitView<'a> {
    id: &'a str,
    title: &'a str,
    content: &'a str,
    url: &'a str,
    date: &'a str,
    categories: &'a [String],
    tags: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    post_format: Option<&'a PostFormat>,
    score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    semantic_similarity: Option<f32>,
}

impl Serialize for SearchHit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entry = &self.entry;
        HitView {
            id: &entry.id,
            title: &entry.title,
            content: &entry.content,
            url: &entry.url,
            date: &entry.date,
            categories: &entry.categories,
            tags: &entry.tags,
            post_format: entry.post_format.as_ref(),
            score: self.score,
            semantic_similarity: self.semantic_similarity,
        }
        .serialize(serializer)
    }
}

/// Result of a `search` call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchHit>,
    pub total_results: usize,
    pub search_type: SearchType,
    /// Semantic ranking was attempted and failed, keyword ranking stood in
    pub degraded: bool,
}

impl SearchResponse {
    pub fn new(
        query: impl Into<String>,
        results: Vec<SearchHit>,
        search_type: SearchType,
        degraded: bool,
    ) -> Self {
        Self {
            query: query.into(),
            total_results: results.len(),
            results,
            search_type,
            degraded,
        }
    }

    pub fn empty(query: impl Into<String>) -> Self {
        Self::new(query, Vec::new(), SearchType::Keyword, false)
    }
}
