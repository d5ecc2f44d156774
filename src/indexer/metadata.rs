//! Post metadata produced by the blog's metadata script

use crate::error::{BlogSearchError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Taxonomy term, either a bare string or an object with a `name`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Term {
    Plain(String),
    Named { name: String },
}

impl Term {
    pub fn name(&self) -> &str {
        match self {
            Term::Plain(name) => name,
            Term::Named { name } => name,
        }
    }
}

/// One record of `blog_metadata.json`; unknown fields are ignored
#[derive(Debug, Clone, Deserialize)]
pub struct PostMetadata {
    /// Source path relative to the blog root, e.g. `2023/05/01/k8s/readme.md`
    pub path: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub categories: Vec<Term>,
    #[serde(default)]
    pub tags: Vec<Term>,
    #[serde(rename = "first-published-on")]
    pub first_published_on: Option<String>,
    #[serde(rename = "post-format")]
    pub post_format: Option<Term>,
}

impl PostMetadata {
    /// Site URL this record describes
    pub fn url(&self) -> Option<String> {
        let path = self.path.as_deref()?;
        let slug = path.replace("/readme.md", "").replace(".md", "");
        Some(format!("/blog/{}", slug.trim_start_matches('/')))
    }

    pub fn category_names(&self) -> Vec<String> {
        self.categories.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn tag_names(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.name().to_string()).collect()
    }
}

/// Metadata keyed by post URL. A missing file yields an empty map.
pub fn load_metadata(path: &Path) -> Result<HashMap<String, PostMetadata>> {
    if !path.exists() {
        tracing::warn!("Blog metadata not found at {:?}; using slugs and path dates", path);
        return Ok(HashMap::new());
    }

    let content = std::fs::read_to_string(path).map_err(|e| BlogSearchError::Io {
        source: e,
        context: format!("Failed to read blog metadata: {:?}", path),
    })?;

    let records: Vec<PostMetadata> =
        serde_json::from_str(&content).map_err(|e| BlogSearchError::Json {
            source: e,
            context: format!("Failed to parse blog metadata: {:?}", path),
        })?;

    Ok(records
        .into_iter()
        .filter_map(|record| record.url().map(|url| (url, record)))
        .collect())
}
