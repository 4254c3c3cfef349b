//! Resolution of a release description to a downloadable torrent.
//!
//! description -> best metadata match -> tracker keywords -> best torrent.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{Config, MatcherConfig, SelectionConfig};
use crate::metadata::{CandidateMatcher, DiscogsClient, MatchResult, MetadataError, MetadataSource};
use crate::selection::{select_best, SelectionCriteria};
use crate::text::SearchKey;
use crate::tracker::{create_tracker, format_size, TorrentRecord, Tracker, TrackerError};

/// Errors that can occur while resolving a description.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Metadata query failed: {0}")]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

impl ResolveError {
    /// Whether the remaining descriptions of a batch cannot be resolved
    /// either.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Tracker(e) if e.is_fatal())
    }
}

/// Outcome of resolving one description.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Resolution {
    /// No catalog release matched confidently.
    NoAlbumMatch,
    /// The release was identified but no torrent survived selection.
    NoTorrent {
        album: MatchResult,
        /// Records the tracker returned before filtering.
        candidates: usize,
    },
    Found {
        album: MatchResult,
        torrent: TorrentRecord,
    },
}

/// Ties a metadata source and a tracker together.
pub struct Resolver {
    matcher: CandidateMatcher,
    max_results: usize,
    tracker: Arc<dyn Tracker>,
    selection: SelectionConfig,
}

impl Resolver {
    pub fn new(
        source: Arc<dyn MetadataSource>,
        tracker: Arc<dyn Tracker>,
        matcher: MatcherConfig,
        selection: SelectionConfig,
    ) -> Self {
        Self {
            max_results: matcher.max_results,
            matcher: CandidateMatcher::new(source, matcher),
            tracker,
            selection,
        }
    }

    /// Build the Discogs and tracker clients described by the configuration.
    pub fn from_config(config: &Config) -> Result<Self, ResolveError> {
        let source = DiscogsClient::new(config.discogs.clone(), &config.user_agent)?;
        let tracker = create_tracker(&config.tracker, &config.user_agent)?;
        Ok(Self::new(
            Arc::new(source),
            tracker,
            config.matcher.clone(),
            config.selection.clone(),
        ))
    }

    pub fn selection(&self) -> &SelectionConfig {
        &self.selection
    }

    /// Override the selection options, e.g. from command-line flags.
    pub fn set_selection(&mut self, selection: SelectionConfig) {
        self.selection = selection;
    }

    /// Resolve a description to its best torrent.
    ///
    /// Matches are tried in order until one yields a torrent.
    pub async fn resolve(&self, description: &str) -> Result<Resolution, ResolveError> {
        let matches = self.matcher.find_best(description, self.max_results).await?;
        let Some(first) = matches.first().cloned() else {
            info!(description, "No album match");
            return Ok(Resolution::NoAlbumMatch);
        };

        let mut first_candidates = 0;
        for (i, album) in matches.into_iter().enumerate() {
            let keywords = self.keywords(&album);
            let records = self.tracker.search(&keywords).await?;
            let candidates = records.len();
            if i == 0 {
                first_candidates = candidates;
            }

            let criteria = SelectionCriteria::from_config(keywords, &self.selection);
            match select_best(records, &criteria) {
                Some(torrent) => {
                    info!(
                        description,
                        title = %torrent.title,
                        size = %format_size(torrent.size_bytes, true),
                        seeders = torrent.seeders,
                        "Selected torrent"
                    );
                    return Ok(Resolution::Found { album, torrent });
                }
                None if candidates == 0 => {
                    debug!(tracker = self.tracker.name(), "Tracker had no results")
                }
                None => debug!(candidates, "Every torrent was filtered out"),
            }
        }

        warn!(description, "No suitable torrent");
        Ok(Resolution::NoTorrent {
            album: first,
            candidates: first_candidates,
        })
    }

    /// Fetch the .torrent file of a selected record.
    pub async fn download(&self, torrent: &TorrentRecord) -> Result<Vec<u8>, ResolveError> {
        Ok(self.tracker.fetch_torrent_file(&torrent.torrent_id).await?)
    }

    /// Tracker keywords for a matched release. Discographies are searched
    /// by artist alone.
    fn keywords(&self, album: &MatchResult) -> SearchKey {
        let candidate = &album.candidate;
        if self.selection.discography {
            SearchKey::from_keywords([&candidate.primary_name])
        } else {
            SearchKey::from_keywords([&candidate.primary_name, &candidate.secondary_name])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ReleaseScope;
    use crate::testing::fixtures::{album_record, candidate, record};
    use crate::testing::{MockMetadataSource, MockTracker, RecordedTrackerCall};

    async fn setup() -> (Arc<MockMetadataSource>, Arc<MockTracker>) {
        let source = Arc::new(MockMetadataSource::new());
        source
            .set_results(ReleaseScope::Master, vec![candidate("Radiohead", "OK Computer")])
            .await;
        (source, Arc::new(MockTracker::new()))
    }

    fn resolver(source: &Arc<MockMetadataSource>, tracker: &Arc<MockTracker>) -> Resolver {
        Resolver::new(
            source.clone(),
            tracker.clone(),
            MatcherConfig::default(),
            SelectionConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_found() {
        let (source, tracker) = setup().await;
        tracker
            .set_results(vec![
                album_record("Radiohead", "OK Computer", 30),
                album_record("Radiohead", "OK Computer [24bit]", 90),
            ])
            .await;

        let resolution = resolver(&source, &tracker)
            .resolve("Radiohead - OK Computer (Full Album)")
            .await
            .unwrap();

        match resolution {
            Resolution::Found { album, torrent } => {
                assert_eq!(album.candidate.secondary_name, "OK Computer");
                assert_eq!(torrent.seeders, 30);
            }
            other => panic!("expected a torrent, got {:?}", other),
        }

        let calls = tracker.recorded_calls().await;
        assert_eq!(
            calls,
            vec![RecordedTrackerCall::Search {
                keywords: vec!["radiohead".to_string(), "ok computer".to_string()]
            }]
        );
    }

    #[tokio::test]
    async fn test_no_album_match_skips_tracker() {
        let (source, tracker) = setup().await;
        let resolution = resolver(&source, &tracker)
            .resolve("Completely Different Thing")
            .await
            .unwrap();

        assert_eq!(resolution, Resolution::NoAlbumMatch);
        assert!(tracker.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_no_torrent_distinguishes_empty_tracker() {
        let (source, tracker) = setup().await;
        let resolver = resolver(&source, &tracker);

        let resolution = resolver.resolve("radiohead ok computer").await.unwrap();
        assert!(matches!(resolution, Resolution::NoTorrent { candidates: 0, .. }));

        tracker
            .set_results(vec![record("Radiohead - Kid A", 10, 100, "Rock (lossless)")])
            .await;
        let resolution = resolver.resolve("radiohead ok computer").await.unwrap();
        assert!(matches!(resolution, Resolution::NoTorrent { candidates: 1, .. }));
    }

    #[tokio::test]
    async fn test_discography_searches_by_artist() {
        let (source, tracker) = setup().await;
        tracker
            .set_results(vec![record("Radiohead - Discography 1993-2016", 10, 9000, "Rock (lossless)")])
            .await;

        let mut resolver = resolver(&source, &tracker);
        let mut selection = resolver.selection().clone();
        selection.discography = true;
        resolver.set_selection(selection);

        let resolution = resolver.resolve("radiohead ok computer").await.unwrap();
        assert!(matches!(resolution, Resolution::Found { .. }));
        assert_eq!(
            tracker.recorded_calls().await[0],
            RecordedTrackerCall::Search {
                keywords: vec!["radiohead".to_string()]
            }
        );
    }

    #[tokio::test]
    async fn test_login_failure_is_fatal() {
        let (source, tracker) = setup().await;
        tracker
            .set_next_error(TrackerError::LoginFailed {
                tracker: "mock-tracker".to_string(),
                reason: "credentials rejected".to_string(),
            })
            .await;

        let err = resolver(&source, &tracker)
            .resolve("radiohead ok computer")
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_metadata_failure_is_not_fatal() {
        let (source, tracker) = setup().await;
        source
            .set_next_error(MetadataError::ApiError {
                status: 502,
                message: "bad gateway".to_string(),
            })
            .await;

        let err = resolver(&source, &tracker)
            .resolve("radiohead ok computer")
            .await
            .unwrap_err();
        assert!(!err.is_fatal());
        assert!(matches!(err, ResolveError::Metadata(_)));
    }

    #[tokio::test]
    async fn test_download() {
        let (source, tracker) = setup().await;
        let torrent = album_record("Radiohead", "OK Computer", 30);
        tracker
            .add_torrent_file(&torrent.torrent_id, b"d8:announce".to_vec())
            .await;

        let bytes = resolver(&source, &tracker).download(&torrent).await.unwrap();
        assert_eq!(bytes, b"d8:announce");
    }
}
