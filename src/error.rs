use crate::embedding::EmbeddingError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for blogsearch
#[derive(Error, Debug)]
pub enum BlogSearchError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// Lookup of a post id absent from the loaded index
    #[error("Post not found in index: {id}")]
    PostNotFound { id: String },

    /// Embedding requested before a model was loaded
    #[error("Search service not initialized: {0}")]
    Uninitialized(String),

    /// Two vectors of different length were compared
    #[error("Vectors must have the same length: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Index entries disagree on embedding length
    #[error("Inconsistent search index: entry {id} has {actual} dimensions, expected {expected}")]
    InconsistentIndex {
        id: String,
        expected: usize,
        actual: usize,
    },

    /// Embedding model errors
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// HTTP errors while fetching a remote index
    #[error("Index fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for blogsearch operations
pub type Result<T> = std::result::Result<T, BlogSearchError>;
