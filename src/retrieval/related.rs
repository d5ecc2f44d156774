//! Related-post lookup
//!
//! Strategy order: semantic similarity with taxonomy boosts when a model is
//! available, taxonomy overlap otherwise. If scoring fails outright the finder
//! returns posts sharing any category or tag with a flat score.

use super::ranking::sort_and_truncate;
use super::similarity::cosine_similarity;
use super::SearchHit;
use crate::config::{RelatedDefaults, ScoringWeights};
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::index::{IndexEntry, PostSummary};
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

/// The post related content is requested for
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRef {
    /// When set (and `exclude_current_post`), the matching entry is skipped
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl PostRef {
    /// Synthetic query: title, categories and tags separated by spaces
    pub fn query_text(&self) -> String {
        format!(
            "{} {} {}",
            self.title,
            self.categories.join(" "),
            self.tags.join(" ")
        )
    }
}

impl From<&IndexEntry> for PostRef {
    fn from(entry: &IndexEntry) -> Self {
        Self {
            id: Some(entry.id.clone()),
            title: entry.title.clone(),
            categories: entry.categories.clone(),
            tags: entry.tags.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedOptions {
    pub limit: usize,
    /// Boosted semantic scores must be strictly above this
    pub threshold: f32,
    pub exclude_current_post: bool,
    pub prefer_same_category: bool,
    pub prefer_same_tags: bool,
}

impl Default for RelatedOptions {
    fn default() -> Self {
        Self::from_defaults(&RelatedDefaults::default())
    }
}

impl RelatedOptions {
    pub fn from_defaults(defaults: &RelatedDefaults) -> Self {
        Self {
            limit: defaults.limit,
            threshold: defaults.threshold,
            exclude_current_post: true,
            prefer_same_category: true,
            prefer_same_tags: true,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// A related post with its score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedPost {
    #[serde(flatten)]
    pub post: PostSummary,
    pub score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_similarity: Option<f32>,
}

impl From<SearchHit> for RelatedPost {
    fn from(hit: SearchHit) -> Self {
        Self {
            post: hit.entry.summary(),
            score: hit.score,
            semantic_similarity: hit.semantic_similarity,
        }
    }
}

/// Scores the index against a current post
pub struct RelatedFinder<'a> {
    weights: &'a ScoringWeights,
    min_query_len: usize,
}

/// Membership sets for the current post's taxonomy
struct Taxonomy<'p> {
    categories: AHashSet<&'p str>,
    tags: AHashSet<&'p str>,
}

impl<'p> Taxonomy<'p> {
    fn of(post: &'p PostRef) -> Self {
        Self {
            categories: post.categories.iter().map(String::as_str).collect(),
            tags: post.tags.iter().map(String::as_str).collect(),
        }
    }

    fn shared_categories(&self, entry: &IndexEntry) -> usize {
        entry
            .categories
            .iter()
            .filter(|c| self.categories.contains(c.as_str()))
            .count()
    }

    fn shared_tags(&self, entry: &IndexEntry) -> usize {
        entry
            .tags
            .iter()
            .filter(|t| self.tags.contains(t.as_str()))
            .count()
    }
}

impl<'a> RelatedFinder<'a> {
    pub fn new(weights: &'a ScoringWeights, min_query_len: usize) -> Self {
        Self {
            weights,
            min_query_len,
        }
    }

    /// Rank `entries` by relatedness to `current`; never fails
    pub fn find(
        &self,
        entries: &[Arc<IndexEntry>],
        embedder: Option<&dyn EmbeddingProvider>,
        current: &PostRef,
        options: &RelatedOptions,
    ) -> Vec<RelatedPost> {
        let candidates: Vec<Arc<IndexEntry>> = entries
            .iter()
            .filter(|entry| !is_current(entry, current, options))
            .cloned()
            .collect();

        let query = current.query_text();

        let scored = match embedder {
            Some(embedder) if query.chars().count() > self.min_query_len => {
                self.semantic(&candidates, embedder, &query, current, options)
            }
            _ => {
                debug!("No embedding model available, scoring related posts by taxonomy overlap");
                Ok(self.overlap(&candidates, current))
            }
        };

        match scored {
            Ok(mut hits) => {
                sort_and_truncate(&mut hits, options.limit);
                hits.into_iter().map(RelatedPost::from).collect()
            }
            Err(e) => {
                error!("Error finding related posts, using shared taxonomy: {}", e);
                self.shared_taxonomy(entries, current, options)
            }
        }
    }

    /// Cosine similarity to the synthetic query plus per-shared-term boosts
    fn semantic(
        &self,
        candidates: &[Arc<IndexEntry>],
        embedder: &dyn EmbeddingProvider,
        query: &str,
        current: &PostRef,
        options: &RelatedOptions,
    ) -> Result<Vec<SearchHit>> {
        let query_embedding = embedder.embed(query)?;
        let taxonomy = Taxonomy::of(current);
        let mut hits = Vec::new();

        for entry in candidates {
            let similarity = cosine_similarity(&query_embedding, &entry.embedding)?;
            let mut score = similarity;

            if options.prefer_same_category {
                score +=
                    taxonomy.shared_categories(entry) as f32 * self.weights.related_category_boost;
            }
            if options.prefer_same_tags {
                score += taxonomy.shared_tags(entry) as f32 * self.weights.related_tag_boost;
            }

            if score > options.threshold {
                hits.push(SearchHit {
                    entry: Arc::clone(entry),
                    score,
                    semantic_similarity: Some(similarity),
                });
            }
        }

        Ok(hits)
    }

    /// Score purely from shared categories and tags
    fn overlap(&self, candidates: &[Arc<IndexEntry>], current: &PostRef) -> Vec<SearchHit> {
        let taxonomy = Taxonomy::of(current);

        candidates
            .iter()
            .filter_map(|entry| {
                let score = taxonomy.shared_categories(entry) as f32 * self.weights.overlap_category
                    + taxonomy.shared_tags(entry) as f32 * self.weights.overlap_tag;
                (score > 0.0).then(|| SearchHit::new(Arc::clone(entry), score))
            })
            .collect()
    }

    /// Any shared category or tag, flat score, index order
    fn shared_taxonomy(
        &self,
        entries: &[Arc<IndexEntry>],
        current: &PostRef,
        options: &RelatedOptions,
    ) -> Vec<RelatedPost> {
        let taxonomy = Taxonomy::of(current);

        entries
            .iter()
            .filter(|entry| !is_current(entry, current, options))
            .filter(|entry| {
                taxonomy.shared_categories(entry) > 0 || taxonomy.shared_tags(entry) > 0
            })
            .take(options.limit)
            .map(|entry| RelatedPost {
                post: entry.summary(),
                score: self.weights.fallback_score,
                semantic_similarity: None,
            })
            .collect()
    }
}

fn is_current(entry: &IndexEntry, current: &PostRef, options: &RelatedOptions) -> bool {
    options.exclude_current_post && current.id.as_deref() == Some(entry.id.as_str())
}
