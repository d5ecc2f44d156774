//! Build-time search index generation
//!
//! Walks `<blog_data_dir>/<year>/<month>/<day>/<slug>/readme.md`, strips the
//! Markdown, merges `metadata/blog_metadata.json`, embeds each post and writes
//! the JSON array the search service loads.

mod markdown;
mod metadata;

pub use markdown::{truncate_chars, MarkdownStripper};
pub use metadata::{load_metadata, PostMetadata, Term};

use crate::config::IndexerConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{BlogSearchError, Result};
use crate::index::{IndexEntry, PostFormat};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Components in `<year>/<month>/<day>/<slug>/readme.md`
const POST_DEPTH: usize = 5;

/// A post file located on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostLocation {
    pub path: PathBuf,
    pub year: String,
    pub month: String,
    pub day: String,
    pub slug: String,
}

impl PostLocation {
    /// Derive date parts and slug from `<year>/<month>/<day>/<slug>/readme.md` below `root`
    fn from_path(root: &Path, path: &Path) -> Option<Self> {
        let relative = path.strip_prefix(root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();

        if parts.len() != POST_DEPTH {
            return None;
        }

        Some(Self {
            path: path.to_path_buf(),
            year: parts[0].clone(),
            month: parts[1].clone(),
            day: parts[2].clone(),
            slug: parts[3].clone(),
        })
    }

    pub fn url(&self) -> String {
        format!("/blog/{}/{}/{}/{}", self.year, self.month, self.day, self.slug)
    }

    pub fn path_date(&self) -> String {
        format!("{}-{}-{}", self.year, self.month, self.day)
    }
}

/// Outcome of an index build
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub indexed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
}

/// A post prepared for embedding
struct Prepared {
    entry: IndexEntry,
    embed_text: String,
}

/// Generates [`IndexEntry`] records from the blog's Markdown sources
pub struct IndexBuilder {
    provider: Arc<dyn EmbeddingProvider>,
    config: IndexerConfig,
    stripper: MarkdownStripper,
}

impl IndexBuilder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: IndexerConfig) -> Result<Self> {
        let stripper = MarkdownStripper::new().map_err(|e| {
            BlogSearchError::Other(anyhow::anyhow!("Invalid markdown pattern: {}", e))
        })?;

        Ok(Self {
            provider,
            config,
            stripper,
        })
    }

    /// All `readme.md` files at post depth, sorted by path.
    ///
    /// Symlinks are not followed. Unreadable directories are logged and skipped;
    /// only a missing or unreadable root is an error.
    pub fn discover_posts(&self) -> Result<Vec<PostLocation>> {
        let root = &self.config.blog_data_dir;
        let metadata = std::fs::metadata(root).map_err(|e| BlogSearchError::Io {
            source: e,
            context: format!("Failed to read blog data directory: {:?}", root),
        })?;
        if !metadata.is_dir() {
            return Err(BlogSearchError::Config(format!(
                "Blog data path is not a directory: {:?}",
                root
            )));
        }

        let mut posts = Vec::new();
        for item in WalkDir::new(root)
            .min_depth(POST_DEPTH)
            .max_depth(POST_DEPTH)
            .sort_by_file_name()
        {
            let item = match item {
                Ok(item) => item,
                Err(e) => {
                    warn!("Skipping unreadable path under {:?}: {}", root, e);
                    continue;
                }
            };

            if !item.file_type().is_file() || item.file_name() != "readme.md" {
                continue;
            }

            match PostLocation::from_path(root, item.path()) {
                Some(location) => posts.push(location),
                None => warn!("Could not extract post info from {:?}", item.path()),
            }
        }

        Ok(posts)
    }

    /// Build entries for every discovered post. Posts that fail are logged and skipped.
    pub fn build(&self) -> Result<(Vec<IndexEntry>, BuildReport)> {
        let start = Instant::now();
        let posts = self.discover_posts()?;
        let metadata_path = self
            .config
            .blog_data_dir
            .join("metadata")
            .join("blog_metadata.json");
        let metadata = load_metadata(&metadata_path)?;

        info!("Found {} blog posts", posts.len());

        let mut skipped = 0;
        let mut prepared = Vec::with_capacity(posts.len());
        for post in &posts {
            match self.prepare(post, &metadata) {
                Ok(p) => prepared.push(p),
                Err(e) => {
                    warn!("Error processing {:?}: {}", post.path, e);
                    skipped += 1;
                }
            }
        }

        let mut entries = Vec::with_capacity(prepared.len());
        for chunk in prepared.chunks(self.config.batch_size.max(1)) {
            let (embedded, failed) = self.embed_chunk(chunk);
            entries.extend(embedded);
            skipped += failed;
        }

        let report = BuildReport {
            indexed: entries.len(),
            skipped,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            "Index build complete: {} indexed, {} skipped, {}ms",
            report.indexed, report.skipped, report.duration_ms
        );

        Ok((entries, report))
    }

    fn prepare(
        &self,
        post: &PostLocation,
        metadata: &HashMap<String, PostMetadata>,
    ) -> Result<Prepared> {
        let markdown = std::fs::read_to_string(&post.path).map_err(|e| BlogSearchError::Io {
            source: e,
            context: format!("Failed to read post: {:?}", post.path),
        })?;
        let text = self.stripper.strip(&markdown);

        let url = post.url();
        let meta = metadata.get(&url);

        let title = meta
            .and_then(|m| m.title.clone())
            .unwrap_or_else(|| post.slug.clone());

        // Posts without a body still get a usable vector from their title
        let embed_text = if text.is_empty() {
            title.clone()
        } else {
            truncate_chars(&text, self.config.embed_chars)
        };

        let entry = IndexEntry {
            id: url.clone(),
            title,
            content: truncate_chars(&text, self.config.preview_chars),
            url,
            date: meta
                .and_then(|m| m.first_published_on.clone())
                .unwrap_or_else(|| post.path_date()),
            categories: meta.map(PostMetadata::category_names).unwrap_or_default(),
            tags: meta.map(PostMetadata::tag_names).unwrap_or_default(),
            post_format: meta
                .and_then(|m| m.post_format.as_ref())
                .map(|t| PostFormat {
                    name: t.name().to_string(),
                }),
            embedding: Vec::new(),
        };

        Ok(Prepared { entry, embed_text })
    }

    /// Embed a chunk in one call; on failure retry item by item so one bad post
    /// does not drop its neighbours
    fn embed_chunk(&self, chunk: &[Prepared]) -> (Vec<IndexEntry>, usize) {
        let texts: Vec<String> = chunk.iter().map(|p| p.embed_text.clone()).collect();

        match self.provider.embed_batch(&texts) {
            Ok(embeddings) if embeddings.len() == chunk.len() => {
                debug!("Embedded batch of {} posts", chunk.len());
                let entries = chunk
                    .iter()
                    .zip(embeddings)
                    .map(|(p, embedding)| IndexEntry {
                        embedding,
                        ..p.entry.clone()
                    })
                    .collect();
                (entries, 0)
            }
            result => {
                if let Err(e) = result {
                    warn!("Batch embedding failed, retrying posts individually: {}", e);
                }

                let mut entries = Vec::new();
                let mut failed = 0;
                for p in chunk {
                    match self.provider.embed(&p.embed_text) {
                        Ok(embedding) => entries.push(IndexEntry {
                            embedding,
                            ..p.entry.clone()
                        }),
                        Err(e) => {
                            warn!("Failed to embed {}: {}", p.entry.id, e);
                            failed += 1;
                        }
                    }
                }
                (entries, failed)
            }
        }
    }

    /// Write entries as pretty JSON, creating parent directories
    pub fn write(entries: &[IndexEntry], output: &Path) -> Result<()> {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| BlogSearchError::Io {
                source: e,
                context: format!("Failed to create output directory: {:?}", parent),
            })?;
        }

        let json = serde_json::to_string_pretty(entries).map_err(|e| BlogSearchError::Json {
            source: e,
            context: "Failed to serialize search index".to_string(),
        })?;

        std::fs::write(output, json).map_err(|e| BlogSearchError::Io {
            source: e,
            context: format!("Failed to write search index: {:?}", output),
        })?;

        info!("Saved search index with {} entries to {:?}", entries.len(), output);
        Ok(())
    }
}
