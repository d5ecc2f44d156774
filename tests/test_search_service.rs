//! End-to-end tests for SearchService: strategy selection, ranking, filters and lifecycle

mod common;

use blogsearch::error::BlogSearchError;
use blogsearch::index::{parse_post_date, IndexSource};
use blogsearch::retrieval::{
    SearchFilters, SearchOptions, SearchService, SearchSettings, SearchType, ServiceState,
};
use blogsearch::embedding::{EmbeddingError, EmbeddingProvider, ModelLoader};
use common::{counting_loader, kubernetes_entry, sample_entries, write_index, MapEmbedder};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use std::sync::Arc;
use tempfile::TempDir;

fn service_with(entries: Vec<blogsearch::IndexEntry>, embedder: MapEmbedder) -> SearchService {
    let loader = counting_loader(Arc::new(embedder), Arc::new(AtomicUsize::new(0)));
    SearchService::new(
        IndexSource::InMemory(entries),
        Some(loader),
        SearchSettings::default(),
    )
}

fn keyword_service(entries: Vec<blogsearch::IndexEntry>) -> SearchService {
    SearchService::new(IndexSource::InMemory(entries), None, SearchSettings::default())
}

fn result_ids(response: &blogsearch::SearchResponse) -> Vec<&str> {
    response.results.iter().map(|hit| hit.entry.id.as_str()).collect()
}

#[tokio::test]
async fn test_semantic_exact_match_scores_one() {
    let embedder =
        MapEmbedder::new(vec![0.0, 1.0, 0.0]).with("kubernetes basics", vec![1.0, 0.0, 0.0]);
    let service = service_with(vec![kubernetes_entry()], embedder);

    let options = SearchOptions::default().with_threshold(0.1);
    let response = service.search("kubernetes basics", &options).await.unwrap();

    assert_eq!(response.search_type, SearchType::Semantic);
    assert!(!response.degraded);
    assert_eq!(response.total_results, 1);
    assert!((response.results[0].score - 1.0).abs() < 1e-6);
    assert_eq!(response.results[0].semantic_similarity, Some(response.results[0].score));
}

#[tokio::test]
async fn test_keyword_title_match() {
    let service = keyword_service(vec![kubernetes_entry()]);

    let response = service
        .search("kubernetes", &SearchOptions::default().keyword_only())
        .await
        .unwrap();

    assert_eq!(response.search_type, SearchType::Keyword);
    assert_eq!(response.total_results, 1);
    assert!(response.results[0].score >= 3.0);
    assert_eq!(response.results[0].semantic_similarity, None);
}

#[tokio::test]
async fn test_semantic_ranking_and_threshold() {
    let service = service_with(sample_entries(), MapEmbedder::new(vec![1.0, 0.0, 0.0]));

    let response = service
        .search("container orchestration", &SearchOptions::default())
        .await
        .unwrap();
    assert_eq!(
        result_ids(&response),
        vec!["/blog/2023/05/01/k8s", "/blog/2022/11/20/homelab"]
    );
    assert!(response.results[0].score > response.results[1].score);

    let strict = SearchOptions::default().with_threshold(0.7);
    let response = service.search("container orchestration", &strict).await.unwrap();
    assert_eq!(result_ids(&response), vec!["/blog/2023/05/01/k8s"]);
}

#[tokio::test]
async fn test_limit_truncates() {
    let service = service_with(sample_entries(), MapEmbedder::new(vec![1.0, 0.0, 0.0]));

    let options = SearchOptions::default().with_limit(1);
    let response = service.search("container orchestration", &options).await.unwrap();

    assert_eq!(response.total_results, 1);
    assert_eq!(result_ids(&response), vec!["/blog/2023/05/01/k8s"]);
}

#[tokio::test]
async fn test_short_query_uses_keywords() {
    let loads = Arc::new(AtomicUsize::new(0));
    let loader = counting_loader(Arc::new(MapEmbedder::new(vec![1.0, 0.0, 0.0])), loads.clone());
    let service = SearchService::new(
        IndexSource::InMemory(sample_entries()),
        Some(loader),
        SearchSettings::default(),
    );

    let response = service.search("k8s", &SearchOptions::default()).await.unwrap();

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(response.search_type, SearchType::Keyword);
    assert!(!response.degraded);
    // Equal tag scores keep index order
    assert_eq!(
        result_ids(&response),
        vec!["/blog/2023/05/01/k8s", "/blog/2022/11/20/homelab"]
    );
    assert!((response.results[0].score - 2.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_semantic_gate_ignores_lowered_minimum() {
    let mut settings = SearchSettings::default();
    settings.search.min_semantic_query_len = 0;

    let loader = counting_loader(
        Arc::new(MapEmbedder::new(vec![1.0, 0.0, 0.0])),
        Arc::new(AtomicUsize::new(0)),
    );
    let service =
        SearchService::new(IndexSource::InMemory(sample_entries()), Some(loader), settings);

    let response = service.search("k8s", &SearchOptions::default()).await.unwrap();

    assert_eq!(response.search_type, SearchType::Keyword);
    assert!(!response.degraded);
    assert_eq!(
        result_ids(&response),
        vec!["/blog/2023/05/01/k8s", "/blog/2022/11/20/homelab"]
    );
}

#[tokio::test]
async fn test_keyword_search_weights_fields() {
    let service = keyword_service(sample_entries());

    let response = service
        .search("kubernetes cluster", &SearchOptions::default())
        .await
        .unwrap();

    // No model loaded: keyword ranking without degradation
    assert_eq!(response.search_type, SearchType::Keyword);
    assert!(!response.degraded);
    assert_eq!(
        result_ids(&response),
        vec!["/blog/2023/05/01/k8s", "/blog/2022/11/20/homelab"]
    );
    assert!((response.results[0].score - 3.0).abs() < 1e-6);
    assert!((response.results[1].score - 2.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_query_without_keywords_is_empty() {
    let service = keyword_service(sample_entries());

    let response = service.search("a to of", &SearchOptions::default()).await.unwrap();

    assert_eq!(response.total_results, 0);
    assert_eq!(response.query, "a to of");
}

#[tokio::test]
async fn test_dimension_mismatch_degrades_to_keywords() {
    let service = service_with(sample_entries(), MapEmbedder::new(vec![1.0, 0.0, 0.0, 0.0]));

    let response = service
        .search("kubernetes cluster", &SearchOptions::default())
        .await
        .unwrap();

    assert_eq!(response.search_type, SearchType::Keyword);
    assert!(response.degraded);
    assert_eq!(
        result_ids(&response),
        vec!["/blog/2023/05/01/k8s", "/blog/2022/11/20/homelab"]
    );
}

#[tokio::test]
async fn test_query_embedding_failure_degrades_to_keywords() {
    let service = service_with(sample_entries(), MapEmbedder::new(vec![1.0, 0.0, 0.0]));

    let response = service
        .search("kubernetes FAIL", &SearchOptions::default())
        .await
        .unwrap();

    assert_eq!(response.search_type, SearchType::Keyword);
    assert!(response.degraded);
    assert_eq!(response.query, "kubernetes FAIL");
    // title match on k8s, content match on homelab; "fail" matches nothing
    assert_eq!(
        result_ids(&response),
        vec!["/blog/2023/05/01/k8s", "/blog/2022/11/20/homelab"]
    );
    assert!((response.results[0].score - 3.0).abs() < 1e-6);
    assert!((response.results[1].score - 1.0).abs() < 1e-6);
    assert!(response.results.iter().all(|hit| hit.semantic_similarity.is_none()));
}

#[tokio::test]
async fn test_filters_apply_to_results() {
    let service = service_with(sample_entries(), MapEmbedder::new(vec![1.0, 0.0, 0.0]));

    let by_tag = SearchOptions::default().with_filters(SearchFilters {
        tags: vec!["raspberry-pi".to_string()],
        ..Default::default()
    });
    let response = service.search("container orchestration", &by_tag).await.unwrap();
    assert_eq!(result_ids(&response), vec!["/blog/2022/11/20/homelab"]);

    let by_date = SearchOptions::default().keyword_only().with_filters(SearchFilters {
        date_start: parse_post_date("2023-01-01"),
        ..Default::default()
    });
    let response = service.search("kubernetes", &by_date).await.unwrap();
    assert_eq!(result_ids(&response), vec!["/blog/2023/05/01/k8s"]);

    let by_format = SearchOptions::default().keyword_only().with_filters(SearchFilters {
        post_format: Some("tutorial".to_string()),
        ..Default::default()
    });
    let response = service.search("rust", &by_format).await.unwrap();
    assert_eq!(result_ids(&response), vec!["/blog/2024/06/01/async-rust"]);
}

#[tokio::test]
async fn test_initialize_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = write_index(dir.path(), &[kubernetes_entry()]);

    let loads = Arc::new(AtomicUsize::new(0));
    let loader = counting_loader(Arc::new(MapEmbedder::new(vec![1.0, 0.0, 0.0])), loads.clone());
    let service = SearchService::new(IndexSource::File(path), Some(loader), SearchSettings::default());

    assert_eq!(service.state(), ServiceState::Uninitialized);

    let (first, second) = tokio::join!(service.initialize(), service.initialize());
    first.unwrap();
    second.unwrap();
    assert_eq!(service.state(), ServiceState::Ready);
    assert_eq!(loads.load(Ordering::SeqCst), 1);

    // The loaded index is immutable: later file changes are not observed
    write_index(dir.path(), &sample_entries());
    service.initialize().await.unwrap();

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(service.recent_posts(10).len(), 1);
}

#[tokio::test]
async fn test_cancelled_initialize_resets_state() {
    let release = Arc::new(AtomicBool::new(false));
    let gate = release.clone();
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(MapEmbedder::new(vec![1.0, 0.0, 0.0]));
    // Blocks the model load until released, bounded so a stray thread cannot hang the run
    let loader: Arc<dyn ModelLoader> = Arc::new(
        move || -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
            for _ in 0..500 {
                if gate.load(Ordering::SeqCst) {
                    break;
                }
                std::thread::sleep(Duration::from_millis(10));
            }
            Ok(Arc::clone(&embedder))
        },
    );
    let service = SearchService::new(
        IndexSource::InMemory(sample_entries()),
        Some(loader),
        SearchSettings::default(),
    );

    let mut saw_initializing = false;
    tokio::select! {
        biased;
        result = service.initialize() => panic!("load should still be blocked: {:?}", result),
        _ = async {
            while service.state() != ServiceState::Initializing {
                tokio::task::yield_now().await;
            }
        } => saw_initializing = true,
    }

    assert!(saw_initializing);
    assert_eq!(service.state(), ServiceState::Uninitialized);

    release.store(true, Ordering::SeqCst);
    service.initialize().await.unwrap();
    assert_eq!(service.state(), ServiceState::Ready);
}

#[tokio::test]
async fn test_search_initializes_lazily() {
    let service = keyword_service(vec![kubernetes_entry()]);
    assert_eq!(service.state(), ServiceState::Uninitialized);
    assert!(service.get_entry("/blog/2023/05/01/k8s").is_none());

    service.search("kubernetes", &SearchOptions::default()).await.unwrap();

    assert_eq!(service.state(), ServiceState::Ready);
    assert!(service.get_entry("/blog/2023/05/01/k8s").is_some());
}

#[tokio::test]
async fn test_query_embedding_requires_model() {
    let service = service_with(vec![kubernetes_entry()], MapEmbedder::new(vec![1.0, 0.0, 0.0]));
    assert!(matches!(
        service.generate_query_embedding("kubernetes"),
        Err(BlogSearchError::Uninitialized(_))
    ));

    service.initialize().await.unwrap();
    assert_eq!(service.generate_query_embedding("kubernetes").unwrap(), vec![1.0, 0.0, 0.0]);

    let keyword_only = keyword_service(vec![kubernetes_entry()]);
    keyword_only.initialize().await.unwrap();
    assert!(matches!(
        keyword_only.generate_query_embedding("kubernetes"),
        Err(BlogSearchError::Uninitialized(_))
    ));
}

#[tokio::test]
async fn test_detached_service_returns_empty() {
    let service = SearchService::detached(SearchSettings::default());

    service.initialize().await.unwrap();
    assert_eq!(service.state(), ServiceState::Uninitialized);

    let response = service.search("kubernetes", &SearchOptions::default()).await.unwrap();
    assert_eq!(response.total_results, 0);
    assert!(service.recent_posts(5).is_empty());
    assert!(service.suggestions().categories.is_empty());
    assert_eq!(service.preview_search_count("", &SearchFilters::default()), 0);
}

#[tokio::test]
async fn test_recent_posts_newest_first() {
    let service = keyword_service(sample_entries());
    service.initialize().await.unwrap();

    let recent: Vec<String> = service.recent_posts(3).into_iter().map(|p| p.id).collect();
    assert_eq!(
        recent,
        vec![
            "/blog/2024/06/01/async-rust",
            "/blog/2023/05/01/k8s",
            "/blog/2022/11/20/homelab"
        ]
    );

    let all = service.recent_posts(10);
    assert_eq!(all.len(), 4);
    assert_eq!(all[3].id, "/blog/drafts/notes");
}

#[tokio::test]
async fn test_preview_counts() {
    let service = keyword_service(sample_entries());
    service.initialize().await.unwrap();

    assert_eq!(service.preview_search_count("", &SearchFilters::default()), 4);
    assert_eq!(service.preview_search_count("  Kubernetes ", &SearchFilters::default()), 2);

    let hardware = SearchFilters {
        categories: vec!["hardware".to_string()],
        ..Default::default()
    };
    assert_eq!(service.preview_search_count("kubernetes", &hardware), 1);
}

#[tokio::test]
async fn test_suggestions_and_facets() {
    let service = keyword_service(sample_entries());
    service.initialize().await.unwrap();

    let suggestions = service.suggestions();
    assert_eq!(
        suggestions.categories,
        vec!["devops", "hardware", "misc", "programming"]
    );
    assert_eq!(
        suggestions.tags,
        vec!["async", "k8s", "raspberry-pi", "rust"]
    );

    let counts = service.filter_counts();
    assert_eq!(counts.categories["devops"], 2);
    assert_eq!(counts.tags["k8s"], 2);
    assert_eq!(counts.post_formats["tutorial"], 1);

    // Selecting devops narrows tags but keeps sibling categories visible
    let viable = service.viable_filter_combinations(&SearchFilters {
        categories: vec!["devops".to_string()],
        ..Default::default()
    });
    assert_eq!(viable.categories.len(), 4);
    assert!(!viable.tags.contains_key("rust"));
    assert_eq!(viable.tags["k8s"], 2);
}
