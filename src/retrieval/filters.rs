//! Filter layer and facet helpers
//!
//! Within a field a filter matches when any value overlaps (OR); across fields
//! every active filter must match (AND).

use crate::index::IndexEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Candidate filters for search, preview and facet counting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilters {
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_format: Option<String>,
    /// Inclusive lower bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_start: Option<DateTime<Utc>>,
    /// Inclusive upper bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_end: Option<DateTime<Utc>>,
}

/// A single filter dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Categories,
    Tags,
    PostFormat,
    Date,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
            && self.tags.is_empty()
            && self.post_format.is_none()
            && self.date_start.is_none()
            && self.date_end.is_none()
    }

    pub fn matches(&self, entry: &IndexEntry) -> bool {
        self.matches_except(entry, None)
    }

    /// Like [`matches`](Self::matches) but ignoring the `skip` dimension
    pub fn matches_except(&self, entry: &IndexEntry, skip: Option<FilterField>) -> bool {
        (skip == Some(FilterField::Categories) || self.matches_categories(entry))
            && (skip == Some(FilterField::Tags) || self.matches_tags(entry))
            && (skip == Some(FilterField::PostFormat) || self.matches_post_format(entry))
            && (skip == Some(FilterField::Date) || self.matches_date(entry))
    }

    fn matches_categories(&self, entry: &IndexEntry) -> bool {
        self.categories.is_empty() || entry.categories.iter().any(|c| self.categories.contains(c))
    }

    fn matches_tags(&self, entry: &IndexEntry) -> bool {
        self.tags.is_empty() || entry.tags.iter().any(|t| self.tags.contains(t))
    }

    fn matches_post_format(&self, entry: &IndexEntry) -> bool {
        match &self.post_format {
            None => true,
            Some(format) => entry.post_format_name() == Some(format.as_str()),
        }
    }

    fn matches_date(&self, entry: &IndexEntry) -> bool {
        if self.date_start.is_none() && self.date_end.is_none() {
            return true;
        }

        // Undated entries are never excluded by a date range
        let Some(published) = entry.published() else {
            return true;
        };

        if matches!(self.date_start, Some(start) if published < start) {
            return false;
        }
        if matches!(self.date_end, Some(end) if published > end) {
            return false;
        }
        true
    }
}

/// Cheap case-insensitive containment test, `needle` must already be lowercase
fn text_matches(entry: &IndexEntry, needle: &str) -> bool {
    entry.title.to_lowercase().contains(needle)
        || entry.content.to_lowercase().contains(needle)
        || entry.categories.join(" ").to_lowercase().contains(needle)
        || entry.tags.join(" ").to_lowercase().contains(needle)
}

/// Number of entries a search would consider, without embeddings or ranking
pub fn preview_count(entries: &[Arc<IndexEntry>], query: &str, filters: &SearchFilters) -> usize {
    let needle = query.trim().to_lowercase();

    entries
        .iter()
        .filter(|entry| filters.matches(entry))
        .filter(|entry| needle.is_empty() || text_matches(entry, &needle))
        .count()
}

/// Document counts per facet value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCounts {
    pub categories: BTreeMap<String, usize>,
    pub tags: BTreeMap<String, usize>,
    pub post_formats: BTreeMap<String, usize>,
}

fn tally<'a>(values: impl Iterator<Item = &'a str>, counts: &mut BTreeMap<String, usize>) {
    for value in values {
        *counts.entry(value.to_string()).or_insert(0) += 1;
    }
}

/// Facet counts over the whole index
pub fn filter_counts(entries: &[Arc<IndexEntry>]) -> FilterCounts {
    let mut counts = FilterCounts::default();

    for entry in entries {
        tally(entry.categories.iter().map(String::as_str), &mut counts.categories);
        tally(entry.tags.iter().map(String::as_str), &mut counts.tags);
        tally(entry.post_format_name().into_iter(), &mut counts.post_formats);
    }

    counts
}

/// Facet counts that would still yield results given the other active filters.
///
/// Each facet is counted over entries passing every filter except its own, so
/// selecting a category never hides the alternative categories.
pub fn viable_filter_combinations(
    entries: &[Arc<IndexEntry>],
    filters: &SearchFilters,
) -> FilterCounts {
    let mut counts = FilterCounts::default();

    for entry in entries {
        if filters.matches_except(entry, Some(FilterField::Categories)) {
            tally(entry.categories.iter().map(String::as_str), &mut counts.categories);
        }
        if filters.matches_except(entry, Some(FilterField::Tags)) {
            tally(entry.tags.iter().map(String::as_str), &mut counts.tags);
        }
        if filters.matches_except(entry, Some(FilterField::PostFormat)) {
            tally(entry.post_format_name().into_iter(), &mut counts.post_formats);
        }
    }

    counts
}

/// Sorted unique category and tag names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestions {
    pub categories: Vec<String>,
    pub tags: Vec<String>,
}

pub fn suggestions(entries: &[Arc<IndexEntry>]) -> Suggestions {
    let mut categories = BTreeSet::new();
    let mut tags = BTreeSet::new();

    for entry in entries {
        categories.extend(entry.categories.iter().cloned());
        tags.extend(entry.tags.iter().cloned());
    }

    Suggestions {
        categories: categories.into_iter().collect(),
        tags: tags.into_iter().collect(),
    }
}
