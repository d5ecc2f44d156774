//! CLI command definitions and parsing
use crate::index::parse_post_date;
use crate::retrieval::SearchFilters;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "blogsearch",
    version,
    about = "Semantic and keyword search over a blog's embedding index",
    long_about = "blogsearch loads a precomputed search index of blog posts with embeddings, ranks posts \
                  against natural-language queries, finds related posts and builds the index from \
                  Markdown sources."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/blogsearch/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Search index location (file path or URL), overrides the config
    #[arg(short, long, global = true, value_name = "SOURCE")]
    pub index: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Filter flags shared by search, preview and facets
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Keep posts in any of these categories (repeatable)
    #[arg(long = "category", value_name = "NAME")]
    pub categories: Vec<String>,

    /// Keep posts with any of these tags (repeatable)
    #[arg(long = "tag", value_name = "NAME")]
    pub tags: Vec<String>,

    /// Keep posts of this format
    #[arg(long = "format", value_name = "NAME")]
    pub post_format: Option<String>,

    /// Earliest publication date (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_parser = parse_date_arg)]
    pub from: Option<DateTime<Utc>>,

    /// Latest publication date (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_parser = parse_date_arg)]
    pub to: Option<DateTime<Utc>>,
}

impl FilterArgs {
    pub fn to_filters(&self) -> SearchFilters {
        SearchFilters {
            categories: self.categories.clone(),
            tags: self.tags.clone(),
            post_format: self.post_format.clone(),
            date_start: self.from,
            date_end: self.to,
        }
    }
}

fn parse_date_arg(value: &str) -> Result<DateTime<Utc>, String> {
    parse_post_date(value).ok_or_else(|| format!("invalid date: {}", value))
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search posts by meaning, or by keywords for short queries
    Search {
        /// Search query text
        query: String,

        /// Maximum number of results to return
        #[arg(short, long)]
        limit: Option<usize>,

        /// Minimum semantic similarity (exclusive)
        #[arg(short, long)]
        threshold: Option<f32>,

        /// Use keyword matching only
        #[arg(long)]
        keyword: bool,

        #[command(flatten)]
        filters: FilterArgs,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Find posts related to an indexed post
    Related {
        /// Id (URL) of the current post
        id: String,

        /// Maximum number of results to return
        #[arg(short, long)]
        limit: Option<usize>,

        /// Include the post itself in the results
        #[arg(long)]
        include_self: bool,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List all categories and tags
    Suggest {
        #[arg(long)]
        json: bool,
    },

    /// Show the most recent posts
    Recent {
        #[arg(short, long, default_value = "5")]
        limit: usize,

        #[arg(long)]
        json: bool,
    },

    /// Count matching posts without ranking
    Preview {
        /// Substring to look for (may be empty)
        #[arg(default_value = "")]
        query: String,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Show facet counts, narrowed by any filters given
    Facets {
        #[command(flatten)]
        filters: FilterArgs,

        #[arg(long)]
        json: bool,
    },

    /// Manage the search index
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum IndexAction {
    /// Generate the search index from Markdown posts
    Build {
        /// Blog data directory (defaults to indexer.blog_data_dir)
        #[arg(short, long, value_name = "DIR")]
        data_dir: Option<PathBuf>,

        /// Output file (defaults to indexer.output)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Load the index and report its size and dimension
    Stats,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Config file to validate
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
