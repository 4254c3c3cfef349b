//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the metadata source and
//! tracker traits, allowing resolution to be tested without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use automudo_core::testing::{fixtures, MockMetadataSource, MockTracker};
//!
//! let source = MockMetadataSource::new();
//! source.set_results(ReleaseScope::Master, vec![fixtures::candidate("Radiohead", "OK Computer")]).await;
//!
//! let tracker = MockTracker::new();
//! tracker.set_results(vec![fixtures::record("Radiohead - OK Computer", 10, 400, "Rock (lossless)")]).await;
//! ```

mod mock_metadata_source;
mod mock_tracker;

pub use mock_metadata_source::{MockMetadataSource, RecordedMetadataQuery};
pub use mock_tracker::{MockTracker, RecordedTrackerCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::collections::BTreeSet;

    use crate::metadata::{CandidateMetadata, SubItem};
    use crate::tracker::TorrentRecord;

    /// Create a metadata candidate with reasonable defaults and no tracks.
    pub fn candidate(artist: &str, title: &str) -> CandidateMetadata {
        CandidateMetadata {
            primary_name: artist.to_string(),
            secondary_name: title.to_string(),
            genres: BTreeSet::from(["Rock".to_string()]),
            release_date: Some("1997".to_string()),
            formats: BTreeSet::from(["CD".to_string(), "Album".to_string()]),
            source_id: format!("mock-{}", title.to_lowercase().replace(' ', "-")),
            source_name: "mock".to_string(),
            sub_items: Vec::new(),
        }
    }

    /// Create a metadata candidate with the given track names.
    pub fn candidate_with_tracks(artist: &str, title: &str, tracks: &[&str]) -> CandidateMetadata {
        let mut candidate = candidate(artist, title);
        candidate.sub_items = tracks
            .iter()
            .enumerate()
            .map(|(i, name)| SubItem {
                name: name.to_string(),
                duration_secs: Some(180 + i as u32 * 10),
            })
            .collect();
        candidate
    }

    /// Create a torrent record. The identifier is derived from the other
    /// fields so that distinct fixtures get distinct identifiers.
    pub fn record(title: &str, seeders: u32, size_bytes: u64, category: &str) -> TorrentRecord {
        TorrentRecord {
            title: title.to_string(),
            seeders,
            leechers: seeders / 4,
            size_bytes,
            category: category.to_string(),
            torrent_id: format!("{}{}{}", title.len(), seeders, size_bytes),
            tracker: "mock-tracker".to_string(),
        }
    }

    /// Create a record for an album in a lossless category.
    pub fn album_record(artist: &str, album: &str, seeders: u32) -> TorrentRecord {
        record(
            &format!("{} - {} - 1997, FLAC (tracks+.cue), lossless", artist, album),
            seeders,
            400 * 1024 * 1024,
            "Rock (lossless)",
        )
    }
}
