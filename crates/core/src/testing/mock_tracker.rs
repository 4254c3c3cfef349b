//! Mock tracker for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::text::SearchKey;
use crate::tracker::{TorrentRecord, Tracker, TrackerError};

/// A recorded tracker call for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedTrackerCall {
    Search { keywords: Vec<String> },
    FetchTorrentFile { torrent_id: String },
}

/// Mock implementation of the Tracker trait.
///
/// Every search returns the configured records. Torrent files are returned
/// for identifiers registered with [`MockTracker::add_torrent_file`];
/// other identifiers fail like a missing attachment would.
#[derive(Debug, Default)]
pub struct MockTracker {
    results: Arc<RwLock<Vec<TorrentRecord>>>,
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    calls: Arc<RwLock<Vec<RecordedTrackerCall>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<TrackerError>>>,
}

impl MockTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the records returned by searches.
    pub async fn set_results(&self, records: Vec<TorrentRecord>) {
        *self.results.write().await = records;
    }

    /// Register the .torrent bytes served for an identifier.
    pub async fn add_torrent_file(&self, torrent_id: &str, bytes: Vec<u8>) {
        self.files.write().await.insert(torrent_id.to_string(), bytes);
    }

    /// Get all recorded calls.
    pub async fn recorded_calls(&self) -> Vec<RecordedTrackerCall> {
        self.calls.read().await.clone()
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: TrackerError) {
        *self.next_error.write().await = Some(error);
    }

    async fn take_error(&self) -> Option<TrackerError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl Tracker for MockTracker {
    fn name(&self) -> &str {
        "mock-tracker"
    }

    async fn search(&self, keywords: &SearchKey) -> Result<Vec<TorrentRecord>, TrackerError> {
        self.calls.write().await.push(RecordedTrackerCall::Search {
            keywords: keywords.tokens().to_vec(),
        });

        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        Ok(self.results.read().await.clone())
    }

    async fn fetch_torrent_file(&self, torrent_id: &str) -> Result<Vec<u8>, TrackerError> {
        self.calls
            .write()
            .await
            .push(RecordedTrackerCall::FetchTorrentFile {
                torrent_id: torrent_id.to_string(),
            });

        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        self.files
            .read()
            .await
            .get(torrent_id)
            .cloned()
            .ok_or_else(|| {
                TrackerError::ConnectionFailed(format!("no torrent file for {}", torrent_id))
            })
    }
}
