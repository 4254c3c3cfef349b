//! Individual filters and tie-breakers over torrent records.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::text::{normalize, similarity_ratio, SearchKey};
use crate::tracker::{Compression, TorrentRecord};

/// High-resolution and physical-format markers.
static FANCY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"24([\W\s]+192|[\W\s]*bit)", r"180[\W\s]*gram"]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

const FANCY_WORDS: &[&str] = &["sacd", "dsd", "5.1", "dvd", "vinyl"];

/// Sizes within this factor of the smallest are considered the same release.
const SIZE_PROXIMITY_FACTOR: f64 = 1.5;

/// Whether a title describes a high-resolution, surround or vinyl-rip
/// release.
pub fn is_fancy(title: &str) -> bool {
    let title = title.to_lowercase();
    FANCY_PATTERNS.iter().any(|re| re.is_match(&title))
        || FANCY_WORDS.iter().any(|w| title.contains(w))
}

pub fn is_remaster(title: &str) -> bool {
    title.to_lowercase().contains("remaster")
}

/// Whether a title holds every keyword, in order, and is not much more than
/// them.
///
/// Keywords are searched greedily: each is found leftmost in what remains
/// of the normalized title after the previous match. The part of the title
/// up to the end of the last match must then be similar to the joined
/// keywords by more than `threshold`.
pub fn matches_keywords(title: &str, keywords: &SearchKey, threshold: f64) -> bool {
    if keywords.is_empty() {
        return true;
    }

    let title = normalize(title);
    let mut consumed = 0;
    for keyword in keywords.tokens() {
        let Some(found) = title[consumed..].find(keyword.as_str()) else {
            return false;
        };
        consumed += found + keyword.len();
    }

    let prefix = normalize(&title[..consumed]);
    similarity_ratio(&prefix, &keywords.joined()) > threshold
}

pub fn holds_compression(record: &TorrentRecord, wanted: Compression) -> bool {
    record.compression().holds(wanted)
}

/// Keep records no larger than 1.5 times the smallest one.
pub fn size_proximity(records: Vec<TorrentRecord>) -> Vec<TorrentRecord> {
    let Some(smallest) = records.iter().map(|r| r.size_bytes).min() else {
        return records;
    };
    let limit = smallest as f64 * SIZE_PROXIMITY_FACTOR;
    records
        .into_iter()
        .filter(|r| r.size_bytes as f64 <= limit)
        .collect()
}

/// Keep the better-seeded half (at least one), most seeded first.
pub fn seeders_majority(mut records: Vec<TorrentRecord>) -> Vec<TorrentRecord> {
    records.sort_by(|a, b| b.seeders.cmp(&a.seeders));
    let keep = (records.len() / 2).max(1);
    records.truncate(keep);
    records
}

/// Keep the larger half (rounded up), largest first.
pub fn size_majority(mut records: Vec<TorrentRecord>) -> Vec<TorrentRecord> {
    records.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes));
    let keep = records.len().div_ceil(2);
    records.truncate(keep);
    records
}
