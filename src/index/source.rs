/// Index sources and the loaded, immutable index
use super::IndexEntry;
use crate::error::{BlogSearchError, Result};
use std::path::PathBuf;
use std::sync::Arc;

/// Where the search index JSON comes from
#[derive(Debug, Clone)]
pub enum IndexSource {
    /// Local file (e.g. `public/search_index.json`)
    File(PathBuf),
    /// Static asset served over HTTP(S)
    Remote(String),
    /// Entries already in memory
    InMemory(Vec<IndexEntry>),
}

impl IndexSource {
    /// Interpret a configured location: `http://` and `https://` are remote, anything else a path
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            Self::Remote(location.to_string())
        } else {
            Self::File(PathBuf::from(location))
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Remote(url) => url.clone(),
            Self::InMemory(entries) => format!("<memory: {} entries>", entries.len()),
        }
    }

    /// Read and parse the entries
    pub async fn fetch(&self) -> Result<Vec<IndexEntry>> {
        match self {
            Self::File(path) => {
                let bytes = tokio::fs::read(path).await.map_err(|e| BlogSearchError::Io {
                    source: e,
                    context: format!("Failed to read search index: {:?}", path),
                })?;
                serde_json::from_slice(&bytes).map_err(|e| BlogSearchError::Json {
                    source: e,
                    context: format!("Failed to parse search index: {:?}", path),
                })
            }
            Self::Remote(url) => {
                let response = reqwest::get(url).await?.error_for_status()?;
                let body = response.bytes().await?;
                serde_json::from_slice(&body).map_err(|e| BlogSearchError::Json {
                    source: e,
                    context: format!("Failed to parse search index from {}", url),
                })
            }
            Self::InMemory(entries) => Ok(entries.clone()),
        }
    }
}

/// Loaded search index; never mutated after construction
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    entries: Vec<Arc<IndexEntry>>,
    dimension: Option<usize>,
}

impl SearchIndex {
    /// Build an index, checking that every embedding has the same length
    pub fn from_entries(entries: Vec<IndexEntry>) -> Result<Self> {
        let mut dimension = None;

        for entry in &entries {
            match dimension {
                None => dimension = Some(entry.embedding.len()),
                Some(expected) if expected != entry.embedding.len() => {
                    return Err(BlogSearchError::InconsistentIndex {
                        id: entry.id.clone(),
                        expected,
                        actual: entry.embedding.len(),
                    });
                }
                Some(_) => {}
            }
        }

        Ok(Self {
            entries: entries.into_iter().map(Arc::new).collect(),
            dimension,
        })
    }

    pub async fn load(source: &IndexSource) -> Result<Self> {
        let entries = source.fetch().await?;
        Self::from_entries(entries)
    }

    pub fn entries(&self) -> &[Arc<IndexEntry>] {
        &self.entries
    }

    /// Embedding length shared by all entries, `None` for an empty index
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
