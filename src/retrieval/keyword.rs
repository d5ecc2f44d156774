//! Keyword scoring fallback

use crate::config::ScoringWeights;
use crate::index::IndexEntry;

/// Lowercased query words longer than `min_len` characters
pub fn extract_keywords(query: &str, min_len: usize) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|word| word.chars().count() > min_len)
        .map(str::to_string)
        .collect()
}

/// Weighted substring scoring over title, content and taxonomy
#[derive(Debug, Clone)]
pub struct KeywordScorer<'w> {
    weights: &'w ScoringWeights,
    min_keyword_len: usize,
}

impl<'w> KeywordScorer<'w> {
    pub fn new(weights: &'w ScoringWeights, min_keyword_len: usize) -> Self {
        Self {
            weights,
            min_keyword_len,
        }
    }

    pub fn keywords(&self, query: &str) -> Vec<String> {
        extract_keywords(query, self.min_keyword_len)
    }

    /// Sum of field weights for every keyword contained in each field
    pub fn score(&self, entry: &IndexEntry, keywords: &[String]) -> f32 {
        if keywords.is_empty() {
            return 0.0;
        }

        let title = entry.title.to_lowercase();
        let content = entry.content.to_lowercase();
        let categories = entry.categories.join(" ").to_lowercase();
        let tags = entry.tags.join(" ").to_lowercase();

        keywords.iter().fold(0.0, |mut score, keyword| {
            if title.contains(keyword.as_str()) {
                score += self.weights.keyword_title;
            }
            if content.contains(keyword.as_str()) {
                score += self.weights.keyword_content;
            }
            if categories.contains(keyword.as_str()) {
                score += self.weights.keyword_category;
            }
            if tags.contains(keyword.as_str()) {
                score += self.weights.keyword_tag;
            }
            score
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> IndexEntry {
        IndexEntry {
            id: "k8s".to_string(),
            title: "Kubernetes Basics".to_string(),
            content: "Pods, deployments and services on kubernetes clusters".to_string(),
            url: "/blog/k8s".to_string(),
            date: "2023-05-01".to_string(),
            categories: vec!["DevOps".to_string()],
            tags: vec!["k8s".to_string(), "containers".to_string()],
            post_format: None,
            embedding: vec![],
        }
    }

    #[test]
    fn test_keywords_drop_short_words() {
        assert_eq!(
            extract_keywords("  How to run K8s on a Pi ", 2),
            vec!["how".to_string(), "run".to_string(), "k8s".to_string()]
        );
        assert_eq!(
            extract_keywords("Rust ownership", 2),
            vec!["rust".to_string(), "ownership".to_string()]
        );
        assert!(extract_keywords("a an to", 2).is_empty());
    }

    #[test]
    fn test_field_weights() {
        let weights = ScoringWeights::default();
        let scorer = KeywordScorer::new(&weights, 2);
        let entry = entry();

        // title + content
        assert_eq!(scorer.score(&entry, &scorer.keywords("kubernetes")), 4.0);
        // category only, case-insensitive
        assert_eq!(scorer.score(&entry, &scorer.keywords("devops")), 2.0);
        // tag only
        assert_eq!(scorer.score(&entry, &scorer.keywords("containers")), 2.0);
        // nothing
        assert_eq!(scorer.score(&entry, &scorer.keywords("sourdough")), 0.0);
    }

    #[test]
    fn test_scores_accumulate_across_keywords() {
        let weights = ScoringWeights::default();
        let scorer = KeywordScorer::new(&weights, 2);
        let keywords = scorer.keywords("kubernetes devops");
        assert_eq!(scorer.score(&entry(), &keywords), 6.0);
    }

    #[test]
    fn test_custom_weights() {
        let weights = ScoringWeights {
            keyword_title: 10.0,
            keyword_content: 0.0,
            ..ScoringWeights::default()
        };
        let scorer = KeywordScorer::new(&weights, 2);
        assert_eq!(scorer.score(&entry(), &scorer.keywords("basics")), 10.0);
    }
}
