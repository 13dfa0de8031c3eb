//! Data models for collected news candidates and the digest produced per run.
//!
//! This module defines the core data structures used throughout the application:
//! - [`CandidateRecord`]: one normalized article discovered by a fetcher
//! - [`ArticleKey`]: the logical-article identity used for deduplication
//! - [`Digest`]: the ranked result of one collection run, as written to JSON
//!
//! Records live only for the duration of a single pipeline run. Persisting
//! them is left to whoever consumes the [`Digest`].

use crate::normalize::{normalize_url, title_hash, truncate_chars};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of characters kept in a record summary.
pub const SUMMARY_MAX_CHARS: usize = 200;

/// A normalized, not-yet-ranked article discovered by one of the fetchers.
///
/// The title is never empty for records built by the fetchers, and the
/// summary is capped at [`SUMMARY_MAX_CHARS`] at construction time.
/// `relevance_score` stays at 0 until the pipeline scores the record, and is
/// only ever set once through [`CandidateRecord::scored`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CandidateRecord {
    /// Cleaned headline text.
    pub title: String,
    /// Absolute article URL. May be empty for malformed scrapes.
    pub url: String,
    /// Short cleaned summary, at most [`SUMMARY_MAX_CHARS`] characters.
    pub summary: String,
    /// Name of the source descriptor the record came from.
    pub source_name: String,
    /// Publication time, or the collection time when the source did not say.
    pub published_at: DateTime<Utc>,
    relevance_score: u32,
}

/// Identity of a logical article.
///
/// Two records describe the same article when their normalized URLs match,
/// or, for records without a URL, when their title-prefix hashes match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArticleKey {
    Url(String),
    TitleHash(String),
}

impl CandidateRecord {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        summary: &str,
        source_name: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into().trim().to_string(),
            summary: truncate_chars(summary, SUMMARY_MAX_CHARS),
            source_name: source_name.into(),
            published_at,
            relevance_score: 0,
        }
    }

    pub fn relevance_score(&self) -> u32 {
        self.relevance_score
    }

    /// Consume an unscored record and return it with its score attached.
    pub fn scored(self, relevance_score: u32) -> Self {
        Self {
            relevance_score,
            ..self
        }
    }

    pub fn has_url(&self) -> bool {
        !self.url.is_empty()
    }

    /// Normalized URL when present, `None` for URL-less records.
    pub fn url_key(&self) -> Option<String> {
        self.has_url().then(|| normalize_url(&self.url))
    }

    pub fn article_key(&self) -> ArticleKey {
        match self.url_key() {
            Some(url) => ArticleKey::Url(url),
            None => ArticleKey::TitleHash(title_hash(&self.title)),
        }
    }
}

/// The ranked result of one collection run.
///
/// Serialized as the JSON hand-off for the generation and publishing steps.
#[derive(Debug, Deserialize, Serialize)]
pub struct Digest {
    /// The local date of the run in `YYYY-MM-DD` format.
    pub local_date: String,
    /// `"morning"` or `"evening"`, see [`crate::utils::edition`].
    pub edition: String,
    /// The local time of the run.
    pub local_time: String,
    /// Recency window the run was collected with, in hours.
    pub hours_back: i64,
    /// Ranked records, best first.
    pub articles: Vec<CandidateRecord>,
}
