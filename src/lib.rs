//! blogsearch - semantic search over a blog's precomputed embedding index
//!
//! Loads a JSON index of posts with embeddings, ranks them against a query by
//! cosine similarity (falling back to weighted keyword matching), filters by
//! taxonomy and date, and finds related posts. The build-time indexer that
//! produces the index lives in [`indexer`].

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod indexer;
pub mod retrieval;

pub use error::{BlogSearchError, Result};
pub use index::{IndexEntry, IndexSource, PostFormat, PostSummary, SearchIndex};
pub use retrieval::{
    cosine_similarity, PostRef, RelatedOptions, RelatedPost, SearchFilters, SearchOptions,
    SearchResponse, SearchService, SearchType, ServiceState,
};
