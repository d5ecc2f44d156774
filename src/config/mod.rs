//! Configuration management for blogsearch
//!
//! Loaded from TOML, overridable through `BLOGSEARCH_SECTION__KEY` environment
//! variables, and validated as a whole before use.

use crate::error::{BlogSearchError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

pub const SCHEMA_VERSION: &str = "1.0.0";

/// Queries of this many characters or fewer never use semantic search
pub const MIN_SEMANTIC_QUERY_LEN: usize = 3;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub index: IndexConfig,
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub search: SearchDefaults,
    #[serde(default)]
    pub related: RelatedDefaults,
    #[serde(default)]
    pub weights: ScoringWeights,
    #[serde(default)]
    pub indexer: IndexerConfig,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Where the search index lives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// File path or http(s) URL of `search_index.json`
    pub source: String,
}

/// Query embedding model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// When false the service runs keyword-only
    pub enabled: bool,
    pub model: String,
}

/// Defaults applied to `search` calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchDefaults {
    pub limit: usize,
    /// Semantic results must score strictly above this
    pub threshold: f32,
    pub use_semantic_search: bool,
    /// Queries of this many characters or fewer never use semantic search;
    /// may be raised but not lowered below [`MIN_SEMANTIC_QUERY_LEN`]
    pub min_semantic_query_len: usize,
    /// Keywords of this many characters or fewer are ignored
    pub min_keyword_len: usize,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            limit: 10,
            threshold: 0.1,
            use_semantic_search: true,
            min_semantic_query_len: MIN_SEMANTIC_QUERY_LEN,
            min_keyword_len: 2,
        }
    }
}

/// Defaults applied to related-post lookups
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelatedDefaults {
    pub limit: usize,
    pub threshold: f32,
}

impl Default for RelatedDefaults {
    fn default() -> Self {
        Self {
            limit: 5,
            threshold: 0.15,
        }
    }
}

/// Score contributions used by keyword search and related posts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub keyword_title: f32,
    pub keyword_content: f32,
    pub keyword_category: f32,
    pub keyword_tag: f32,
    /// Added to semantic similarity per shared category
    pub related_category_boost: f32,
    /// Added to semantic similarity per shared tag
    pub related_tag_boost: f32,
    /// Overlap score per shared category when no model is available
    pub overlap_category: f32,
    /// Overlap score per shared tag when no model is available
    pub overlap_tag: f32,
    /// Flat score of the last-resort shared-taxonomy fallback
    pub fallback_score: f32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            keyword_title: 3.0,
            keyword_content: 1.0,
            keyword_category: 2.0,
            keyword_tag: 2.0,
            related_category_boost: 0.1,
            related_tag_boost: 0.05,
            overlap_category: 0.3,
            overlap_tag: 0.2,
            fallback_score: 0.1,
        }
    }
}

/// Build-time index generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Root holding `<year>/<month>/<day>/<slug>/readme.md` and `metadata/blog_metadata.json`
    pub blog_data_dir: PathBuf,
    pub output: PathBuf,
    /// Characters of plain text kept as the entry preview
    pub preview_chars: usize,
    /// Characters of plain text fed to the embedding model
    pub embed_chars: usize,
    pub batch_size: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            blog_data_dir: PathBuf::from("public/blogdata"),
            output: PathBuf::from("public/search_index.json"),
            preview_chars: 500,
            embed_chars: 512,
            batch_size: 16,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(BlogSearchError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| BlogSearchError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Load from `path` (or the default location), falling back to defaults when absent
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        if !path.exists() {
            tracing::warn!(
                "Config file not found at {:?}, using defaults. Run 'blogsearch config init' to create one.",
                path
            );
            let mut config = Config::default();
            config.apply_env_overrides();
            ConfigValidator::validate(&config)?;
            return Ok(config);
        }

        Self::load(&path)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| BlogSearchError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: BLOGSEARCH_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("BLOGSEARCH_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "INDEX__SOURCE" => {
                self.index.source = value.to_string();
            }
            "EMBEDDING__ENABLED" => {
                self.embedding.enabled = parse_env(path, value)?;
            }
            "EMBEDDING__MODEL" => {
                self.embedding.model = value.to_string();
            }
            "SEARCH__LIMIT" => {
                self.search.limit = parse_env(path, value)?;
            }
            "SEARCH__THRESHOLD" => {
                self.search.threshold = parse_env(path, value)?;
            }
            "SEARCH__USE_SEMANTIC_SEARCH" => {
                self.search.use_semantic_search = parse_env(path, value)?;
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            BlogSearchError::Config("Cannot determine config directory".to_string())
        })?;

        Ok(config_dir.join("blogsearch").join("config.toml"))
    }
}

fn parse_env<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| BlogSearchError::InvalidConfigValue {
            path: path.to_string(),
            message: format!(
                "Cannot parse '{}' as {}",
                value,
                std::any::type_name::<T>()
            ),
        })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: SCHEMA_VERSION.to_string(),
                created_at: current_timestamp(),
            },
            index: IndexConfig {
                source: "public/search_index.json".to_string(),
            },
            embedding: EmbeddingConfig {
                enabled: true,
                model: crate::embedding::DEFAULT_MODEL.to_string(),
            },
            search: SearchDefaults::default(),
            related: RelatedDefaults::default(),
            weights: ScoringWeights::default(),
            indexer: IndexerConfig::default(),
        }
    }
}
