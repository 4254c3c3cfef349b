//! Fuzzy matching of a free-text description against metadata candidates.

use std::sync::Arc;

use tracing::{debug, info};

use super::{CandidateMetadata, MatchResult, MetadataError, MetadataSource, ReleaseScope};
use crate::config::MatcherConfig;
use crate::text::{normalize, similarity_ratio};

/// Finds the catalog releases a description most likely refers to.
pub struct CandidateMatcher {
    source: Arc<dyn MetadataSource>,
    config: MatcherConfig,
}

impl CandidateMatcher {
    pub fn new(source: Arc<dyn MetadataSource>, config: MatcherConfig) -> Self {
        Self { source, config }
    }

    /// Find up to `max_results` candidates scoring above the threshold.
    ///
    /// Master releases are preferred: the unrestricted scope is only queried
    /// when no master release qualifies. Results keep the source's order.
    /// An empty vector means nothing qualified.
    pub async fn find_best(
        &self,
        description: &str,
        max_results: usize,
    ) -> Result<Vec<MatchResult>, MetadataError> {
        let key = normalize(description);
        if key.is_empty() || max_results == 0 {
            debug!(description, "Nothing to match");
            return Ok(Vec::new());
        }

        let fetch = max_results.saturating_mul(self.config.over_fetch_factor);

        for scope in [ReleaseScope::Master, ReleaseScope::All] {
            let candidates = self.source.search(&key, scope, fetch).await?;
            let matches = self.qualifying(&key, candidates, max_results);
            if !matches.is_empty() {
                info!(
                    query = %key,
                    ?scope,
                    best = %matches[0].candidate.secondary_name,
                    score = matches[0].score,
                    "Matched description"
                );
                return Ok(matches);
            }
            debug!(query = %key, ?scope, "No candidate above threshold");
        }

        Ok(Vec::new())
    }

    fn qualifying(
        &self,
        key: &str,
        candidates: Vec<CandidateMetadata>,
        max_results: usize,
    ) -> Vec<MatchResult> {
        candidates
            .into_iter()
            .map(|candidate| MatchResult {
                score: score_candidate(key, &candidate),
                candidate,
            })
            .filter(|m| m.score > self.config.threshold)
            .take(max_results)
            .collect()
    }
}

/// Best similarity between a normalized query and any reading of a
/// candidate: "artist title", or a track combined with the artist or title
/// in either order.
pub fn score_candidate(key: &str, candidate: &CandidateMetadata) -> f64 {
    let primary = normalize(&candidate.primary_name);
    let secondary = normalize(&candidate.secondary_name);

    let mut best = similarity_ratio(key, &join(&primary, &secondary));
    for sub_item in &candidate.sub_items {
        let sub = normalize(&sub_item.name);
        for (first, second) in [
            (&primary, &sub),
            (&sub, &primary),
            (&secondary, &sub),
            (&sub, &secondary),
        ] {
            best = best.max(similarity_ratio(key, &join(first, second)));
        }
    }
    best
}

fn join(first: &str, second: &str) -> String {
    match (first.is_empty(), second.is_empty()) {
        (true, _) => second.to_string(),
        (_, true) => first.to_string(),
        _ => format!("{} {}", first, second),
    }
}
