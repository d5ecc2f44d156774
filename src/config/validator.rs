use crate::config::{Config, MIN_SEMANTIC_QUERY_LEN, SCHEMA_VERSION};
use crate::embedding::is_supported_model;
use crate::error::{BlogSearchError, Result, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, reporting every problem at once
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_index(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_search(config, &mut errors);
        Self::validate_related(config, &mut errors);
        Self::validate_weights(config, &mut errors);
        Self::validate_indexer(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(BlogSearchError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_index(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.index.source.trim().is_empty() {
            errors.push(ValidationError::new(
                "index.source",
                "Index source cannot be empty",
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        // The model name only matters when it will actually be loaded
        if config.embedding.enabled && !is_supported_model(&config.embedding.model) {
            errors.push(ValidationError::new(
                "embedding.model",
                format!("Unsupported embedding model: {}", config.embedding.model),
            ));
        }
    }

    fn validate_search(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.search.limit == 0 {
            errors.push(ValidationError::new(
                "search.limit",
                "Limit must be greater than 0",
            ));
        }

        if config.search.min_semantic_query_len < MIN_SEMANTIC_QUERY_LEN {
            errors.push(ValidationError::new(
                "search.min_semantic_query_len",
                format!(
                    "Must be at least {}, got {}",
                    MIN_SEMANTIC_QUERY_LEN, config.search.min_semantic_query_len
                ),
            ));
        }

        if !Self::is_similarity(config.search.threshold) {
            errors.push(ValidationError::new(
                "search.threshold",
                format!(
                    "Threshold must be between -1.0 and 1.0, got {}",
                    config.search.threshold
                ),
            ));
        }
    }

    fn validate_related(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.related.limit == 0 {
            errors.push(ValidationError::new(
                "related.limit",
                "Limit must be greater than 0",
            ));
        }

        if !config.related.threshold.is_finite() {
            errors.push(ValidationError::new(
                "related.threshold",
                "Threshold must be a finite number",
            ));
        }
    }

    fn validate_weights(config: &Config, errors: &mut Vec<ValidationError>) {
        let w = &config.weights;
        let named = [
            ("weights.keyword_title", w.keyword_title),
            ("weights.keyword_content", w.keyword_content),
            ("weights.keyword_category", w.keyword_category),
            ("weights.keyword_tag", w.keyword_tag),
            ("weights.related_category_boost", w.related_category_boost),
            ("weights.related_tag_boost", w.related_tag_boost),
            ("weights.overlap_category", w.overlap_category),
            ("weights.overlap_tag", w.overlap_tag),
            ("weights.fallback_score", w.fallback_score),
        ];

        for (path, value) in named {
            if !value.is_finite() || value < 0.0 {
                errors.push(ValidationError::new(
                    path,
                    format!("Weight must be a non-negative number, got {}", value),
                ));
            }
        }
    }

    fn validate_indexer(config: &Config, errors: &mut Vec<ValidationError>) {
        let indexer = &config.indexer;

        if indexer.embed_chars == 0 {
            errors.push(ValidationError::new(
                "indexer.embed_chars",
                "Embedding window must be greater than 0",
            ));
        }

        if indexer.batch_size == 0 {
            errors.push(ValidationError::new(
                "indexer.batch_size",
                "Batch size must be greater than 0",
            ));
        }

        if indexer.output.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "indexer.output",
                "Output path cannot be empty",
            ));
        }
    }

    fn is_similarity(value: f32) -> bool {
        value.is_finite() && (-1.0..=1.0).contains(&value)
    }
}
