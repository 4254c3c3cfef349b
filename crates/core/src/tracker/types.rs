//! Types for tracker search and download.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::extractor::ExtractError;
use crate::text::SearchKey;

/// One row of a tracker's search listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentRecord {
    /// Release title as listed.
    pub title: String,
    pub seeders: u32,
    pub leechers: u32,
    /// Size in bytes (see [`parse_size`](super::parse_size) for the unit rules).
    pub size_bytes: u64,
    /// Forum/category label, e.g. "Rock (lossless)".
    pub category: String,
    /// Tracker-assigned identifier used to fetch the .torrent file.
    pub torrent_id: String,
    /// Name of the tracker this record came from.
    pub tracker: String,
}

impl TorrentRecord {
    /// Compression types held by this record's category.
    pub fn compression(&self) -> CategoryCompression {
        CategoryCompression::from_category(&self.category)
    }
}

/// Compression types signalled by a category's suffix.
///
/// Categories end with "(lossy)", "(lossless)", both (e.g.
/// "(lossy + lossless)"), or neither. No marker means the category is not a
/// standard audio category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryCompression {
    Lossy,
    Lossless,
    Both,
    Unclassified,
}

impl CategoryCompression {
    pub fn from_category(category: &str) -> Self {
        let category = category.to_lowercase();
        let Some(open) = category.rfind('(') else {
            return Self::Unclassified;
        };
        let suffix = &category[open..];
        if !suffix.trim_end().ends_with(')') {
            return Self::Unclassified;
        }

        // "lossless" contains "loss" but not "lossy"
        let lossy = suffix.contains("lossy");
        let lossless = suffix.contains("lossless");
        match (lossy, lossless) {
            (true, true) => Self::Both,
            (true, false) => Self::Lossy,
            (false, true) => Self::Lossless,
            (false, false) => Self::Unclassified,
        }
    }

    /// Whether a category with this marker holds releases of `wanted` kind.
    pub fn holds(self, wanted: Compression) -> bool {
        matches!(
            (self, wanted),
            (Self::Both, _)
                | (Self::Lossy, Compression::Lossy)
                | (Self::Lossless, Compression::Lossless)
        )
    }
}

/// A wanted compression type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    Lossy,
    Lossless,
}

/// Errors that can occur while talking to a tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Tracker connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Tracker request timed out")]
    Timeout,

    #[error("Tracker returned HTTP {status}")]
    HttpStatus { status: u16 },

    /// The login budget is exhausted. The session is unusable.
    #[error("Could not log in to {tracker}: {reason}")]
    LoginFailed { tracker: String, reason: String },

    #[error("Failed to parse tracker listing: {0}")]
    Parse(#[from] ExtractError),

    #[error("Invalid tracker URL: {0}")]
    InvalidUrl(String),

    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

impl TrackerError {
    /// Whether the tracker session can no longer be used.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::LoginFailed { .. })
    }
}

impl From<reqwest::Error> for TrackerError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TrackerError::Timeout
        } else {
            TrackerError::ConnectionFailed(e.to_string())
        }
    }
}

/// Trait for torrent trackers.
#[async_trait]
pub trait Tracker: Send + Sync {
    /// Tracker name for logging and for [`TorrentRecord::tracker`].
    fn name(&self) -> &str;

    /// Search torrents matching all keywords.
    ///
    /// An empty vector means the tracker had no results.
    async fn search(&self, keywords: &SearchKey) -> Result<Vec<TorrentRecord>, TrackerError>;

    /// Fetch the .torrent file for a record's identifier, unmodified.
    async fn fetch_torrent_file(&self, torrent_id: &str) -> Result<Vec<u8>, TrackerError>;
}
