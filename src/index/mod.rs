//! Search index model and loading
//!
//! The index is a JSON array produced at build time by [`crate::indexer`]. Each
//! entry carries a short plain-text preview and a precomputed embedding.

mod source;

pub use source::{IndexSource, SearchIndex};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Post format descriptor (e.g. "tutorial", "opinion")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostFormat {
    pub name: String,
}

/// One indexed document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    /// Stable identifier (the post URL)
    pub id: String,
    pub title: String,
    /// Truncated plain-text preview, not the full body
    pub content: String,
    /// Site-relative path
    pub url: String,
    /// Publication date as an ISO string
    pub date: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, alias = "post-format", skip_serializing_if = "Option::is_none")]
    pub post_format: Option<PostFormat>,
    /// Unit-normalized embedding; every entry in an index has the same length
    #[serde(default)]
    pub embedding: Vec<f32>,
}

impl IndexEntry {
    /// Parsed publication date, `None` when the stored string is not a recognised date
    pub fn published(&self) -> Option<DateTime<Utc>> {
        parse_post_date(&self.date)
    }

    pub fn post_format_name(&self) -> Option<&str> {
        self.post_format.as_ref().map(|f| f.name.as_str())
    }

    pub fn summary(&self) -> PostSummary {
        PostSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            url: self.url.clone(),
            date: self.date.clone(),
            categories: self.categories.clone(),
            tags: self.tags.clone(),
        }
    }
}

/// Lightweight projection of an entry for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: String,
    pub title: String,
    pub url: String,
    pub date: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
}

/// Parse the date formats found in post metadata.
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS` (taken as UTC) and bare `YYYY-MM-DD`
/// (midnight UTC).
pub fn parse_post_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
