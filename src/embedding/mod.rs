//! Query embedding
//!
//! - `EmbeddingProvider` turns text into a fixed-length vector
//! - `FastEmbedProvider` runs sentence-transformer models locally
//!   (all-MiniLM-L6-v2, 384-dim, mean pooled and L2-normalized)
//! - `ModelLoader` defers model construction until the search service initializes
mod loader;
mod provider;

pub use loader::{FastEmbedLoader, ModelLoader};
pub use provider::{is_supported_model, EmbeddingError, EmbeddingProvider, FastEmbedProvider};

/// Model used when the configuration does not name one
pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";
