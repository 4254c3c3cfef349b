//! Reduction of one query's torrent records to a single best pick.
//!
//! Records first go through rejecting filters (fancy releases, remasters,
//! inaccurate titles, unwanted compression), then through tie-breakers that
//! narrow the survivors down without ever eliminating all of them.

mod filters;

pub use filters::{
    holds_compression, is_fancy, is_remaster, matches_keywords, seeders_majority,
    size_majority, size_proximity,
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SelectionConfig;
use crate::text::SearchKey;
use crate::tracker::{Compression, TorrentRecord};

/// What the caller is looking for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionCriteria {
    /// Keywords the title must contain, in order.
    pub keywords: SearchKey,
    /// Looking for a collection torrent: prefer size over seeders.
    pub discography: bool,
    pub allow_fancy: bool,
    pub allow_remaster: bool,
    pub keyword_ratio_threshold: f64,
    pub compression: Option<Compression>,
}

impl SelectionCriteria {
    pub fn new(keywords: SearchKey) -> Self {
        Self::from_config(keywords, &SelectionConfig::default())
    }

    pub fn from_config(keywords: SearchKey, config: &SelectionConfig) -> Self {
        Self {
            keywords,
            discography: config.discography,
            allow_fancy: config.allow_fancy,
            allow_remaster: config.allow_remaster,
            keyword_ratio_threshold: config.keyword_ratio_threshold,
            compression: config.compression,
        }
    }
}

type Reduction = fn(Vec<TorrentRecord>) -> Vec<TorrentRecord>;

/// Pick the best record, or `None` if every record was filtered out.
pub fn select_best(
    records: Vec<TorrentRecord>,
    criteria: &SelectionCriteria,
) -> Option<TorrentRecord> {
    let total = records.len();

    let mut records: Vec<TorrentRecord> = records
        .into_iter()
        .filter(|r| criteria.allow_fancy || !is_fancy(&r.title))
        .filter(|r| criteria.allow_remaster || !is_remaster(&r.title))
        .filter(|r| {
            matches_keywords(&r.title, &criteria.keywords, criteria.keyword_ratio_threshold)
        })
        .filter(|r| criteria.compression.map_or(true, |c| holds_compression(r, c)))
        .collect();

    debug!(
        keywords = %criteria.keywords.joined(),
        total,
        accepted = records.len(),
        "Filtered torrent records"
    );

    let reductions: [Reduction; 2] = if criteria.discography {
        [seeders_majority, size_majority]
    } else {
        [size_proximity, seeders_majority]
    };
    for reduce in reductions {
        if records.len() <= 1 {
            break;
        }
        let reduced = reduce(records.clone());
        if !reduced.is_empty() {
            records = reduced;
        }
    }

    records.into_iter().next()
}
