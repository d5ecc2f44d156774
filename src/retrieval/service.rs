//! Search service: owns the loaded index and embedding model

use super::filters::{self, FilterCounts, SearchFilters, Suggestions};
use super::ranking::{keyword_hits, semantic_hits, sort_and_truncate};
use super::related::{PostRef, RelatedFinder, RelatedOptions, RelatedPost};
use super::{KeywordScorer, SearchHit, SearchOptions, SearchResponse, SearchType};
use crate::config::{
    Config, RelatedDefaults, ScoringWeights, SearchDefaults, MIN_SEMANTIC_QUERY_LEN,
};
use crate::embedding::{EmbeddingProvider, FastEmbedLoader, ModelLoader};
use crate::error::{BlogSearchError, Result};
use crate::index::{IndexEntry, IndexSource, PostSummary, SearchIndex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

/// Defaults and weights the service applies to every call
#[derive(Debug, Clone, Default)]
pub struct SearchSettings {
    pub search: SearchDefaults,
    pub related: RelatedDefaults,
    pub weights: ScoringWeights,
}

impl SearchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            search: config.search.clone(),
            related: config.related.clone(),
            weights: config.weights.clone(),
        }
    }
}

/// Lifecycle of a [`SearchService`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Uninitialized,
    /// Index fetch and model load in flight
    Initializing,
    Ready,
}

struct Loaded {
    index: SearchIndex,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
}

/// Client-side search over a precomputed embedding index.
///
/// Constructed and owned by the application; share it behind an `Arc`. The
/// index and model are loaded once, on [`initialize`](Self::initialize) or the
/// first search, and never change afterwards.
pub struct SearchService {
    source: Option<IndexSource>,
    model_loader: Option<Arc<dyn ModelLoader>>,
    settings: SearchSettings,
    loaded: OnceCell<Arc<Loaded>>,
    initializing: AtomicBool,
}

/// Holds the `Initializing` state; cleared on drop, including when the
/// initialize future is cancelled mid-load
struct InitializingGuard<'a>(&'a AtomicBool);

impl<'a> InitializingGuard<'a> {
    fn set(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for InitializingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SearchService {
    /// Service backed by `source`; without a `model_loader` it only ranks by keywords
    pub fn new(
        source: IndexSource,
        model_loader: Option<Arc<dyn ModelLoader>>,
        settings: SearchSettings,
    ) -> Self {
        Self {
            source: Some(source),
            model_loader,
            settings,
            loaded: OnceCell::new(),
            initializing: AtomicBool::new(false),
        }
    }

    /// Service with no index source, for hosts that cannot fetch the index.
    ///
    /// Initialization is a logged no-op and every read returns empty results.
    pub fn detached(settings: SearchSettings) -> Self {
        Self {
            source: None,
            model_loader: None,
            settings,
            loaded: OnceCell::new(),
            initializing: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let model_loader: Option<Arc<dyn ModelLoader>> = if config.embedding.enabled {
            Some(Arc::new(FastEmbedLoader::new(&config.embedding.model)))
        } else {
            None
        };

        Self::new(
            IndexSource::parse(&config.index.source),
            model_loader,
            SearchSettings::from_config(config),
        )
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    pub fn state(&self) -> ServiceState {
        if self.loaded.initialized() {
            ServiceState::Ready
        } else if self.initializing.load(Ordering::SeqCst) {
            ServiceState::Initializing
        } else {
            ServiceState::Uninitialized
        }
    }

    /// Load the index and model. No-op once ready.
    ///
    /// Concurrent callers share one in-flight load. A failed load is not
    /// remembered: the error is returned and the next call tries again.
    pub async fn initialize(&self) -> Result<()> {
        if self.loaded.initialized() {
            return Ok(());
        }

        let Some(source) = &self.source else {
            warn!("Search service has no index source; running detached");
            return Ok(());
        };

        self.loaded
            .get_or_try_init(|| async {
                let _initializing = InitializingGuard::set(&self.initializing);
                let result = self.load(source).await;

                if let Err(e) = &result {
                    error!("Failed to initialize search service: {}", e);
                }
                result.map(Arc::new)
            })
            .await?;

        Ok(())
    }

    async fn load(&self, source: &IndexSource) -> Result<Loaded> {
        debug!("Loading search index from {}", source.describe());
        let index = SearchIndex::load(source).await?;

        let embedder = match &self.model_loader {
            Some(loader) => {
                let loader = Arc::clone(loader);
                let provider = tokio::task::spawn_blocking(move || loader.load())
                    .await
                    .map_err(|e| anyhow::anyhow!("Model loading task failed: {}", e))??;

                if let Some(dimension) = index.dimension() {
                    if dimension != provider.dimension() {
                        warn!(
                            "Model {} produces {}D vectors but the index holds {}D embeddings; semantic search will fall back to keywords",
                            provider.model_name(),
                            provider.dimension(),
                            dimension
                        );
                    }
                }
                Some(provider)
            }
            None => None,
        };

        info!(
            "Search service initialized with {} entries ({})",
            index.len(),
            embedder
                .as_ref()
                .map(|e| e.model_name().to_string())
                .unwrap_or_else(|| "keyword only".to_string())
        );

        Ok(Loaded { index, embedder })
    }

    fn ready(&self) -> Option<&Loaded> {
        self.loaded.get().map(Arc::as_ref)
    }

    fn entries(&self) -> &[Arc<IndexEntry>] {
        self.ready().map(|l| l.index.entries()).unwrap_or(&[])
    }

    /// Embed `text` with the loaded model
    pub fn generate_query_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let embedder = self
            .ready()
            .and_then(|l| l.embedder.as_ref())
            .ok_or_else(|| {
                BlogSearchError::Uninitialized("embedding model not loaded".to_string())
            })?;

        Ok(embedder.embed(text)?)
    }

    /// Rank the index against `query`.
    ///
    /// Initializes lazily. Semantic ranking failures degrade to keyword ranking;
    /// only initialization errors are returned.
    pub async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResponse> {
        self.initialize().await?;

        let Some(loaded) = self.ready() else {
            return Ok(SearchResponse::empty(query));
        };
        let entries = loaded.index.entries();

        let (mut hits, search_type, degraded) = match self.strategy(loaded, query, options) {
            SearchType::Semantic => match self.semantic_search(entries, query, options.threshold) {
                Ok(hits) => (hits, SearchType::Semantic, false),
                Err(e) => {
                    error!("Semantic search failed, falling back to keyword search: {}", e);
                    (self.keyword_search(entries, query), SearchType::Keyword, true)
                }
            },
            SearchType::Keyword => {
                (self.keyword_search(entries, query), SearchType::Keyword, false)
            }
        };

        hits.retain(|hit| options.filters.matches(&hit.entry));
        sort_and_truncate(&mut hits, options.limit);

        debug!(
            "Search {:?} returned {} results ({:?}{})",
            query,
            hits.len(),
            search_type,
            if degraded { ", degraded" } else { "" }
        );

        Ok(SearchResponse::new(query, hits, search_type, degraded))
    }

    /// Settings may be built without validation, so the floor is applied here too
    fn min_semantic_query_len(&self) -> usize {
        self.settings
            .search
            .min_semantic_query_len
            .max(MIN_SEMANTIC_QUERY_LEN)
    }

    /// Semantic only for long enough queries, when asked for, with a model loaded
    fn strategy(&self, loaded: &Loaded, query: &str, options: &SearchOptions) -> SearchType {
        let long_enough = query.chars().count() > self.min_semantic_query_len();

        if options.use_semantic_search && long_enough && loaded.embedder.is_some() {
            SearchType::Semantic
        } else {
            SearchType::Keyword
        }
    }

    fn semantic_search(
        &self,
        entries: &[Arc<IndexEntry>],
        query: &str,
        threshold: f32,
    ) -> Result<Vec<SearchHit>> {
        let query_embedding = self.generate_query_embedding(query)?;
        semantic_hits(entries, &query_embedding, threshold)
    }

    fn keyword_search(&self, entries: &[Arc<IndexEntry>], query: &str) -> Vec<SearchHit> {
        let scorer =
            KeywordScorer::new(&self.settings.weights, self.settings.search.min_keyword_len);
        keyword_hits(entries, query, &scorer)
    }

    /// Posts related to `current`.
    ///
    /// Initialization errors are returned; scoring problems fall back to cheaper
    /// strategies and never surface.
    pub async fn find_related_posts(
        &self,
        current: &PostRef,
        options: &RelatedOptions,
    ) -> Result<Vec<RelatedPost>> {
        self.initialize().await?;

        let Some(loaded) = self.ready() else {
            return Ok(Vec::new());
        };

        let finder = RelatedFinder::new(&self.settings.weights, self.min_semantic_query_len());
        Ok(finder.find(
            loaded.index.entries(),
            loaded.embedder.as_deref(),
            current,
            options,
        ))
    }

    /// Posts related to the indexed post `id`
    pub async fn find_related_to_id(
        &self,
        id: &str,
        options: &RelatedOptions,
    ) -> Result<Vec<RelatedPost>> {
        self.initialize().await?;

        let entry = self.get_entry(id).ok_or_else(|| BlogSearchError::PostNotFound {
            id: id.to_string(),
        })?;
        self.find_related_posts(&PostRef::from(entry.as_ref()), options).await
    }

    /// Entry by id, once ready
    pub fn get_entry(&self, id: &str) -> Option<Arc<IndexEntry>> {
        self.entries().iter().find(|e| e.id == id).cloned()
    }

    /// Sorted unique categories and tags; empty until ready
    pub fn suggestions(&self) -> Suggestions {
        filters::suggestions(self.entries())
    }

    /// Facet counts over the whole index; empty until ready
    pub fn filter_counts(&self) -> FilterCounts {
        filters::filter_counts(self.entries())
    }

    /// How many entries a search with these filters would consider; 0 until ready
    pub fn preview_search_count(&self, query: &str, filters: &SearchFilters) -> usize {
        filters::preview_count(self.entries(), query, filters)
    }

    /// Facet values that still yield results under the other active filters
    pub fn viable_filter_combinations(&self, filters: &SearchFilters) -> FilterCounts {
        filters::viable_filter_combinations(self.entries(), filters)
    }

    /// Newest posts first; undated posts sort last. Empty until ready.
    pub fn recent_posts(&self, limit: usize) -> Vec<PostSummary> {
        let mut entries: Vec<&Arc<IndexEntry>> = self.entries().iter().collect();
        entries.sort_by_key(|entry| std::cmp::Reverse(entry.published()));

        entries
            .into_iter()
            .take(limit)
            .map(|entry| entry.summary())
            .collect()
    }
}
