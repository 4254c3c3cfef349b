//! Mock metadata source for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::metadata::{CandidateMetadata, MetadataError, MetadataSource, ReleaseScope};

/// A recorded metadata query for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedMetadataQuery {
    pub query: String,
    pub scope: ReleaseScope,
    pub max_results: usize,
}

/// Mock implementation of the MetadataSource trait.
///
/// Provides controllable behavior for testing:
/// - Return configurable candidates per release scope
/// - Track queries for assertions
/// - Simulate failures
#[derive(Debug, Default)]
pub struct MockMetadataSource {
    masters: Arc<RwLock<Vec<CandidateMetadata>>>,
    all_releases: Arc<RwLock<Vec<CandidateMetadata>>>,
    /// Recorded queries.
    queries: Arc<RwLock<Vec<RecordedMetadataQuery>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<MetadataError>>>,
}

impl MockMetadataSource {
    /// Create a new mock source that finds nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the candidates returned for a scope, in source order.
    pub async fn set_results(&self, scope: ReleaseScope, candidates: Vec<CandidateMetadata>) {
        match scope {
            ReleaseScope::Master => *self.masters.write().await = candidates,
            ReleaseScope::All => *self.all_releases.write().await = candidates,
        }
    }

    /// Get all recorded queries.
    pub async fn recorded_queries(&self) -> Vec<RecordedMetadataQuery> {
        self.queries.read().await.clone()
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: MetadataError) {
        *self.next_error.write().await = Some(error);
    }
}

#[async_trait]
impl MetadataSource for MockMetadataSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(
        &self,
        query: &str,
        scope: ReleaseScope,
        max_results: usize,
    ) -> Result<Vec<CandidateMetadata>, MetadataError> {
        self.queries.write().await.push(RecordedMetadataQuery {
            query: query.to_string(),
            scope,
            max_results,
        });

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        let candidates = match scope {
            ReleaseScope::Master => self.masters.read().await,
            ReleaseScope::All => self.all_releases.read().await,
        };
        Ok(candidates.iter().take(max_results).cloned().collect())
    }
}
