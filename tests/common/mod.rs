//! Shared fixtures for integration tests
#![allow(dead_code)]

use blogsearch::embedding::{EmbeddingError, EmbeddingProvider, ModelLoader};
use blogsearch::index::{IndexEntry, PostFormat};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Deterministic embedder: known texts map to fixed vectors, everything else to `fallback`
pub struct MapEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    fallback: Vec<f32>,
}

impl MapEmbedder {
    pub fn new(fallback: Vec<f32>) -> Self {
        Self {
            vectors: HashMap::new(),
            fallback,
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }
}

impl EmbeddingProvider for MapEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.contains("FAIL") {
            return Err(EmbeddingError::GenerationError(format!("cannot embed {:?}", text)));
        }
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone()))
    }

    fn dimension(&self) -> usize {
        self.fallback.len()
    }

    fn model_name(&self) -> &str {
        "map-embedder"
    }
}

/// Loader handing out `embedder`, counting how often it is asked to load
pub fn counting_loader(
    embedder: Arc<dyn EmbeddingProvider>,
    loads: Arc<AtomicUsize>,
) -> Arc<dyn ModelLoader> {
    Arc::new(
        move || -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
            loads.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::clone(&embedder))
        },
    )
}

pub fn entry(
    id: &str,
    title: &str,
    content: &str,
    categories: &[&str],
    tags: &[&str],
    date: &str,
    embedding: Vec<f32>,
) -> IndexEntry {
    IndexEntry {
        id: id.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        url: id.to_string(),
        date: date.to_string(),
        categories: categories.iter().map(|s| s.to_string()).collect(),
        tags: tags.iter().map(|s| s.to_string()).collect(),
        post_format: None,
        embedding,
    }
}

/// The single-entry index used by the end-to-end scenarios
pub fn kubernetes_entry() -> IndexEntry {
    entry(
        "/blog/2023/05/01/k8s",
        "Kubernetes Basics",
        "...",
        &["devops"],
        &["k8s"],
        "2023-05-01",
        vec![1.0, 0.0, 0.0],
    )
}

/// Small mixed index: three dated posts, one undated
pub fn sample_entries() -> Vec<IndexEntry> {
    let mut rust = entry(
        "/blog/2024/06/01/async-rust",
        "Async Rust in Practice",
        "Futures, executors and pinning explained with tokio examples",
        &["programming"],
        &["rust", "async"],
        "2024-06-01",
        vec![0.0, 1.0, 0.0],
    );
    rust.post_format = Some(PostFormat {
        name: "tutorial".to_string(),
    });

    vec![
        kubernetes_entry(),
        rust,
        entry(
            "/blog/2022/11/20/homelab",
            "Building a Homelab",
            "Running a kubernetes cluster on Raspberry Pi boards",
            &["devops", "hardware"],
            &["raspberry-pi", "k8s"],
            "2022-11-20",
            vec![0.6, 0.0, 0.8],
        ),
        entry(
            "/blog/drafts/notes",
            "Loose Notes",
            "Unsorted thoughts",
            &["misc"],
            &[],
            "someday",
            vec![0.0, 0.0, 1.0],
        ),
    ]
}

/// Write `entries` as a search index JSON file in `dir`
pub fn write_index(dir: &Path, entries: &[IndexEntry]) -> PathBuf {
    let path = dir.join("search_index.json");
    std::fs::write(&path, serde_json::to_string(entries).unwrap()).unwrap();
    path
}
