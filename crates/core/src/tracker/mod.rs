//! Torrent trackers: authenticated retrieval, listing extraction and the
//! rutracker backend.

pub mod client;
mod extractor;
mod rutracker;
mod size;
mod types;

pub use client::{RetrievalClient, TrackerRequest};
pub use extractor::{ExtractError, Listing, ListingMarkers, Records, ResultExtractor};
pub use rutracker::RutrackerTracker;
pub use size::{format_size, parse_size, SizeParseError};
pub use types::*;

use std::sync::Arc;

use crate::config::{TrackerBackend, TrackerConfig};

/// Create the tracker backend selected in the configuration.
pub fn create_tracker(
    config: &TrackerConfig,
    user_agent: &str,
) -> Result<Arc<dyn Tracker>, TrackerError> {
    match config.backend {
        TrackerBackend::Rutracker => Ok(Arc::new(RutrackerTracker::new(config, user_agent)?)),
    }
}
