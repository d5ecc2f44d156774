/// Deferred model construction
use super::{EmbeddingError, EmbeddingProvider, FastEmbedProvider};
use std::sync::Arc;

/// Builds the embedding provider when the search service initializes
///
/// Loading can block (model download, ONNX session setup); the service runs it on
/// the blocking thread pool.
pub trait ModelLoader: Send + Sync {
    fn load(&self) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError>;
}

impl<F> ModelLoader for F
where
    F: Fn() -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> + Send + Sync,
{
    fn load(&self) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
        self()
    }
}

/// Loads a [`FastEmbedProvider`] by model name
#[derive(Debug, Clone)]
pub struct FastEmbedLoader {
    model_name: String,
}

impl FastEmbedLoader {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
        }
    }
}

impl ModelLoader for FastEmbedLoader {
    fn load(&self) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
        let provider = FastEmbedProvider::new(&self.model_name)?;
        Ok(Arc::new(provider))
    }
}
