//! Types for music metadata sources.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One entry of a candidate's tracklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubItem {
    pub name: String,
    pub duration_secs: Option<u32>,
}

/// A release as described by a metadata source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMetadata {
    /// Artist name.
    pub primary_name: String,
    /// Release title.
    pub secondary_name: String,
    pub genres: BTreeSet<String>,
    /// Release date or year as given by the source.
    pub release_date: Option<String>,
    /// Format tags, e.g. "CD", "Album".
    pub formats: BTreeSet<String>,
    /// Source-assigned identifier.
    pub source_id: String,
    /// Name of the source this candidate came from.
    pub source_name: String,
    pub sub_items: Vec<SubItem>,
}

/// A candidate with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub candidate: CandidateMetadata,
    /// Score in `[0.0, 1.0]`.
    pub score: f64,
}

/// Which releases a metadata query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseScope {
    /// Only canonical "master" releases.
    Master,
    /// Every release, including reissues and regional editions.
    All,
}

/// Errors that can occur when querying a metadata source.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Rate limit exceeded, please wait before retrying")]
    RateLimitExceeded,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Client not configured (missing API key, etc.).
    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

/// Trait for music metadata sources.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Source name for logging and [`CandidateMetadata::source_name`].
    fn name(&self) -> &str;

    /// Search releases matching an already-normalized query.
    ///
    /// Returns at most `max_results` candidates in the source's relevance
    /// order. An empty vector means nothing matched.
    async fn search(
        &self,
        query: &str,
        scope: ReleaseScope,
        max_results: usize,
    ) -> Result<Vec<CandidateMetadata>, MetadataError>;
}
