use blogsearch::cli::{Cli, Commands, ConfigAction, FilterArgs, IndexAction};
use blogsearch::config::Config;
use blogsearch::embedding::FastEmbedProvider;
use blogsearch::error::{BlogSearchError, Result};
use blogsearch::index::{IndexSource, PostSummary, SearchIndex};
use blogsearch::indexer::IndexBuilder;
use blogsearch::retrieval::{RelatedOptions, SearchOptions, SearchService};
use std::path::PathBuf;
use std::sync::Arc;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    match cli.command {
        Commands::Search {
            query,
            limit,
            threshold,
            keyword,
            filters,
            json,
        } => {
            let config = load_config(cli.config, cli.index)?;
            let mut options =
                SearchOptions::from_defaults(&config.search).with_filters(filters.to_filters());
            if let Some(limit) = limit {
                options = options.with_limit(limit);
            }
            if let Some(threshold) = threshold {
                options = options.with_threshold(threshold);
            }
            if keyword {
                options = options.keyword_only();
            }
            cmd_search(&config, &query, &options, json)?;
        }
        Commands::Related {
            id,
            limit,
            include_self,
            json,
        } => {
            let config = load_config(cli.config, cli.index)?;
            cmd_related(&config, &id, limit, include_self, json)?;
        }
        Commands::Suggest { json } => {
            let config = load_config(cli.config, cli.index)?;
            cmd_suggest(&config, json)?;
        }
        Commands::Recent { limit, json } => {
            let config = load_config(cli.config, cli.index)?;
            cmd_recent(&config, limit, json)?;
        }
        Commands::Preview { query, filters } => {
            let config = load_config(cli.config, cli.index)?;
            cmd_preview(&config, &query, &filters)?;
        }
        Commands::Facets { filters, json } => {
            let config = load_config(cli.config, cli.index)?;
            cmd_facets(&config, &filters, json)?;
        }
        Commands::Index { action } => {
            let config = load_config(cli.config, cli.index)?;
            cmd_index(config, action)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "blogsearch=debug" } else { "blogsearch=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Results go to stdout, logs to stderr
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| BlogSearchError::Io {
        source: e,
        context: "Failed to create tokio runtime".to_string(),
    })
}

/// Initialized service; listing commands skip the model load
fn ready_service(
    rt: &tokio::runtime::Runtime,
    config: &Config,
    with_model: bool,
) -> Result<SearchService> {
    let service = if with_model {
        SearchService::from_config(config)
    } else {
        let mut config = config.clone();
        config.embedding.enabled = false;
        SearchService::from_config(&config)
    };
    rt.block_on(service.initialize())?;
    Ok(service)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| BlogSearchError::Json {
        source: e,
        context: "Failed to serialize output".to_string(),
    })?;
    println!("{}", json);
    Ok(())
}

fn print_summary(rank: usize, post: &PostSummary, score: Option<f32>) {
    match score {
        Some(score) => println!("{:>2}. [{:.3}] {}", rank, score, post.title),
        None => println!("{:>2}. {}", rank, post.title),
    }
    println!("    {}  {}", post.date, post.url);
    if !post.categories.is_empty() || !post.tags.is_empty() {
        println!(
            "    categories: {}  tags: {}",
            post.categories.join(", "),
            post.tags.join(", ")
        );
    }
}

fn cmd_search(config: &Config, query: &str, options: &SearchOptions, json: bool) -> Result<()> {
    let rt = runtime()?;
    let service = SearchService::from_config(config);
    let response = rt.block_on(service.search(query, options))?;

    if json {
        return print_json(&response);
    }

    println!(
        "{} results for {:?} ({:?} search{})",
        response.total_results,
        response.query,
        response.search_type,
        if response.degraded { ", semantic ranking unavailable" } else { "" }
    );
    for (i, hit) in response.results.iter().enumerate() {
        print_summary(i + 1, &hit.entry.summary(), Some(hit.score));
    }

    Ok(())
}

fn cmd_related(
    config: &Config,
    id: &str,
    limit: Option<usize>,
    include_self: bool,
    json: bool,
) -> Result<()> {
    let rt = runtime()?;
    let service = ready_service(&rt, config, true)?;

    let mut options = RelatedOptions::from_defaults(&config.related);
    if let Some(limit) = limit {
        options = options.with_limit(limit);
    }
    options.exclude_current_post = !include_self;

    let related = rt.block_on(service.find_related_to_id(id, &options))?;

    if json {
        return print_json(&related);
    }

    let title = service.get_entry(id).map(|e| e.title.clone()).unwrap_or_default();
    println!("Posts related to {:?}:", title);
    for (i, post) in related.iter().enumerate() {
        print_summary(i + 1, &post.post, Some(post.score));
    }

    Ok(())
}

fn cmd_suggest(config: &Config, json: bool) -> Result<()> {
    let rt = runtime()?;
    let suggestions = ready_service(&rt, config, false)?.suggestions();

    if json {
        return print_json(&suggestions);
    }

    println!("Categories: {}", suggestions.categories.join(", "));
    println!("Tags: {}", suggestions.tags.join(", "));
    Ok(())
}

fn cmd_recent(config: &Config, limit: usize, json: bool) -> Result<()> {
    let rt = runtime()?;
    let posts = ready_service(&rt, config, false)?.recent_posts(limit);

    if json {
        return print_json(&posts);
    }

    for (i, post) in posts.iter().enumerate() {
        print_summary(i + 1, post, None);
    }
    Ok(())
}

fn cmd_preview(config: &Config, query: &str, filters: &FilterArgs) -> Result<()> {
    let rt = runtime()?;
    let service = ready_service(&rt, config, false)?;
    let count = service.preview_search_count(query, &filters.to_filters());
    println!("{}", count);
    Ok(())
}

fn cmd_facets(config: &Config, filters: &FilterArgs, json: bool) -> Result<()> {
    let rt = runtime()?;
    let service = ready_service(&rt, config, false)?;
    let filters = filters.to_filters();

    let counts = if filters.is_empty() {
        service.filter_counts()
    } else {
        service.viable_filter_combinations(&filters)
    };

    if json {
        return print_json(&counts);
    }

    for (label, values) in [
        ("Categories", &counts.categories),
        ("Tags", &counts.tags),
        ("Formats", &counts.post_formats),
    ] {
        println!("{}:", label);
        for (value, count) in values {
            println!("  {:<30} {}", value, count);
        }
    }
    Ok(())
}

fn cmd_index(config: Config, action: IndexAction) -> Result<()> {
    match action {
        IndexAction::Build { data_dir, output } => {
            let mut indexer = config.indexer.clone();
            if let Some(dir) = data_dir {
                indexer.blog_data_dir = dir;
            }
            if let Some(output) = output {
                indexer.output = output;
            }
            let output = indexer.output.clone();

            tracing::info!("Loading embedding model {}", config.embedding.model);
            let provider = Arc::new(FastEmbedProvider::new(&config.embedding.model)?);

            let builder = IndexBuilder::new(provider, indexer)?;
            let (entries, report) = builder.build()?;
            IndexBuilder::write(&entries, &output)?;

            println!("✓ Search index written to {}", output.display());
            println!("  Indexed: {}", report.indexed);
            println!("  Skipped: {}", report.skipped);
            println!("  Took: {}ms", report.duration_ms);
        }
        IndexAction::Stats => {
            let rt = runtime()?;
            let source = IndexSource::parse(&config.index.source);
            let index = rt.block_on(SearchIndex::load(&source))?;

            println!("Index: {}", source.describe());
            println!("  Entries: {}", index.len());
            match index.dimension() {
                Some(dimension) => println!("  Dimension: {}", dimension),
                None => println!("  Dimension: n/a (empty index)"),
            }
        }
    }

    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = Config::load_or_default(config_path.as_deref())?;
            let toml = toml::to_string_pretty(&config)?;
            println!("{}", toml);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            // Loading runs the validator
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| BlogSearchError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

/// Load configuration; `--index` wins over the file and the environment
fn load_config(config_path: Option<PathBuf>, index: Option<String>) -> Result<Config> {
    let mut config = Config::load_or_default(config_path.as_deref())?;

    if let Some(index) = index {
        config.index.source = index;
    }

    Ok(config)
}
