//! Discogs database client.
//!
//! Discogs requires:
//! - a personal access token (`token` query parameter)
//! - a User-Agent identifying the application
//! - at most 60 authenticated requests per minute

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use super::{CandidateMetadata, MetadataError, MetadataSource, ReleaseScope, SubItem};
use crate::config::DiscogsConfig;

const NAME: &str = "discogs";

/// Discogs caps `per_page` at 100.
const MAX_PER_PAGE: usize = 100;

/// Numeric suffix Discogs adds to tell apart artists sharing a name.
static ARTIST_DISAMBIGUATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\([0-9]+\)$").unwrap());

static PARENTHESIZED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^)]*\)").unwrap());

static TRAILING_ARTICLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i), the").unwrap());

/// Discogs API client.
pub struct DiscogsClient {
    client: Client,
    config: DiscogsConfig,
    last_request: Arc<Mutex<Option<Instant>>>,
    rate_limit: Duration,
}

impl DiscogsClient {
    pub fn new(config: DiscogsConfig, user_agent: &str) -> Result<Self, MetadataError> {
        if config.api_key.is_empty() {
            return Err(MetadataError::NotConfigured(
                "Discogs API key is empty".to_string(),
            ));
        }

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()?;

        Ok(Self {
            client,
            rate_limit: Duration::from_millis(config.rate_limit_ms),
            config,
            last_request: Arc::new(Mutex::new(None)),
        })
    }

    /// Wait for rate limit if needed.
    async fn wait_for_rate_limit(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.rate_limit {
                let wait_time = self.rate_limit - elapsed;
                debug!("Discogs rate limit: waiting {:?}", wait_time);
                sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, MetadataError> {
        self.wait_for_rate_limit().await;

        let response = self
            .client
            .get(url)
            .query(&[("token", self.config.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Discogs rate limit exceeded");
            return Err(MetadataError::RateLimitExceeded);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MetadataError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| MetadataError::ParseError(format!("Failed to parse Discogs response: {}", e)))
    }

    /// One format-filtered search, paging until `max_results` or the last
    /// page.
    async fn search_format(
        &self,
        query: &str,
        scope: ReleaseScope,
        format: &str,
        max_results: usize,
    ) -> Result<Vec<DcSearchResult>, MetadataError> {
        let url = format!("{}/database/search", self.config.base_url);
        let per_page = max_results.min(self.config.per_page as usize).clamp(1, MAX_PER_PAGE);
        let kind = match scope {
            ReleaseScope::Master => "master",
            ReleaseScope::All => "release",
        };

        let mut results = Vec::new();
        let mut page = 1u32;
        loop {
            debug!(query, kind, format, page, "Discogs search");
            let mut params = vec![
                ("q", query.to_string()),
                ("type", kind.to_string()),
                ("per_page", per_page.to_string()),
                ("page", page.to_string()),
            ];
            if !format.is_empty() {
                params.push(("format", format.to_string()));
            }

            let response: DcSearchResponse = self.get_json(&url, &params).await?;
            let last_page = response.pagination.map(|p| p.pages).unwrap_or(page);
            let empty = response.results.is_empty();
            results.extend(response.results);

            if empty || results.len() >= max_results || page >= last_page {
                break;
            }
            page += 1;
        }

        results.truncate(max_results);
        Ok(results)
    }

    async fn fetch_tracklist(
        &self,
        scope: ReleaseScope,
        id: u64,
    ) -> Result<Vec<SubItem>, MetadataError> {
        let kind = match scope {
            ReleaseScope::Master => "masters",
            ReleaseScope::All => "releases",
        };
        let url = format!("{}/{}/{}", self.config.base_url, kind, id);

        let detail: DcReleaseDetail = self.get_json(&url, &[]).await?;
        Ok(detail
            .tracklist
            .into_iter()
            .filter(|t| t.type_.as_deref().unwrap_or("track") == "track")
            .map(|t| SubItem {
                duration_secs: parse_duration(&t.duration),
                name: t.title,
            })
            .collect())
    }
}

#[async_trait]
impl MetadataSource for DiscogsClient {
    fn name(&self) -> &str {
        NAME
    }

    async fn search(
        &self,
        query: &str,
        scope: ReleaseScope,
        max_results: usize,
    ) -> Result<Vec<CandidateMetadata>, MetadataError> {
        if max_results == 0 {
            return Ok(Vec::new());
        }

        // Formats are in order of preference; "" means any format.
        let mut results = Vec::new();
        for format in &self.config.format_preference {
            results = self.search_format(query, scope, format, max_results).await?;
            if !results.is_empty() {
                break;
            }
        }

        let mut candidates = Vec::with_capacity(results.len());
        for result in results {
            let id = result.id;
            let Some(mut candidate) = result.into_candidate() else {
                debug!(id, "Skipping Discogs result without \"Artist - Title\"");
                continue;
            };

            if self.config.fetch_tracklists {
                match self.fetch_tracklist(scope, id).await {
                    Ok(tracks) => candidate.sub_items = tracks,
                    Err(e) => warn!(id, error = %e, "Failed to fetch Discogs tracklist"),
                }
            }
            candidates.push(candidate);
        }

        debug!(query, ?scope, count = candidates.len(), "Discogs search complete");
        Ok(candidates)
    }
}

/// Split a Discogs "Artist - Title" into cleaned artist and title.
fn split_title(full: &str) -> Option<(String, String)> {
    let (artist, title) = full.split_once(" - ")?;

    // "Beatles, The" -> "Beatles"
    let artist = match TRAILING_ARTICLE.find(artist) {
        Some(m) if m.start() > 0 => &artist[..m.start()],
        _ => artist,
    };
    let artist = ARTIST_DISAMBIGUATOR.replace(artist, "");

    // Parenthesized parts are usually omitted when an album is mentioned.
    let title = PARENTHESIZED.replace_all(title, "");
    let title = title.split_whitespace().collect::<Vec<_>>().join(" ");

    Some((artist.trim().to_string(), title))
}

/// Parse `m:ss` or `h:mm:ss`.
fn parse_duration(text: &str) -> Option<u32> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.split(':')
        .try_fold(0u32, |total, part| {
            total.checked_mul(60)?.checked_add(part.parse::<u32>().ok()?)
        })
}

// ============================================================================
// Discogs API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct DcSearchResponse {
    #[serde(default)]
    pagination: Option<DcPagination>,
    #[serde(default)]
    results: Vec<DcSearchResult>,
}

#[derive(Debug, Deserialize)]
struct DcPagination {
    pages: u32,
}

#[derive(Debug, Deserialize)]
struct DcSearchResult {
    id: u64,
    title: String,
    /// A string in search results, a number elsewhere.
    #[serde(default)]
    year: Option<serde_json::Value>,
    #[serde(default)]
    genre: Vec<String>,
    #[serde(default)]
    style: Vec<String>,
    #[serde(default)]
    format: Vec<String>,
}

impl DcSearchResult {
    fn into_candidate(self) -> Option<CandidateMetadata> {
        let (primary_name, secondary_name) = split_title(&self.title)?;
        let release_date = match self.year {
            Some(serde_json::Value::String(s)) if !s.is_empty() && s != "0" => Some(s),
            Some(serde_json::Value::Number(n)) if n.as_u64() != Some(0) => Some(n.to_string()),
            _ => None,
        };

        Some(CandidateMetadata {
            primary_name,
            secondary_name,
            genres: self.genre.into_iter().chain(self.style).collect(),
            release_date,
            formats: self.format.into_iter().collect(),
            source_id: self.id.to_string(),
            source_name: NAME.to_string(),
            sub_items: Vec::new(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct DcReleaseDetail {
    #[serde(default)]
    tracklist: Vec<DcTrack>,
}

#[derive(Debug, Deserialize)]
struct DcTrack {
    title: String,
    #[serde(default)]
    duration: String,
    #[serde(default)]
    type_: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> DiscogsConfig {
        DiscogsConfig {
            api_key: "token".to_string(),
            base_url: server.uri(),
            per_page: 50,
            timeout_secs: 5,
            rate_limit_ms: 0,
            format_preference: vec!["album".to_string(), "".to_string()],
            fetch_tracklists: false,
        }
    }

    fn result(id: u64, title: &str) -> serde_json::Value {
        json!({
            "id": id,
            "type": "master",
            "title": title,
            "year": "1997",
            "genre": ["Electronic", "Rock"],
            "style": ["Alternative Rock"],
            "format": ["CD", "Album"],
            "resource_url": format!("https://api.discogs.com/masters/{}", id)
        })
    }

    fn page(results: Vec<serde_json::Value>, page: u32, pages: u32) -> serde_json::Value {
        json!({
            "pagination": {"page": page, "pages": pages, "per_page": 2, "items": 99},
            "results": results
        })
    }

    #[test]
    fn test_split_title() {
        assert_eq!(
            split_title("Radiohead - OK Computer"),
            Some(("Radiohead".to_string(), "OK Computer".to_string()))
        );
        assert_eq!(
            split_title("Beatles, The - Abbey Road"),
            Some(("Beatles".to_string(), "Abbey Road".to_string()))
        );
        assert_eq!(
            split_title("Nirvana (2) - Local Anaesthetic"),
            Some(("Nirvana".to_string(), "Local Anaesthetic".to_string()))
        );
        assert_eq!(
            split_title("Pink Floyd - The Wall (Deluxe Edition) - Live"),
            Some(("Pink Floyd".to_string(), "The Wall - Live".to_string()))
        );
        assert_eq!(split_title("Untitled"), None);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("4:44"), Some(284));
        assert_eq!(parse_duration("1:02:03"), Some(3723));
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("n/a"), None);
        assert_eq!(parse_duration("99999999:00"), None);
        assert_eq!(parse_duration("1:4294967295"), None);
    }

    #[tokio::test]
    async fn test_search_master_with_preferred_format() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/database/search"))
            .and(query_param("type", "master"))
            .and(query_param("format", "album"))
            .and(query_param("token", "token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(page(vec![result(3, "Radiohead - OK Computer")], 1, 1)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = DiscogsClient::new(config(&server), "automudo-tests").unwrap();
        let candidates = client
            .search("radiohead ok computer", ReleaseScope::Master, 2)
            .await
            .unwrap();

        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.primary_name, "Radiohead");
        assert_eq!(c.secondary_name, "OK Computer");
        assert_eq!(c.source_id, "3");
        assert_eq!(c.source_name, "discogs");
        assert_eq!(c.release_date.as_deref(), Some("1997"));
        assert!(c.genres.contains("Alternative Rock"));
        assert!(c.formats.contains("CD"));
    }

    #[tokio::test]
    async fn test_falls_back_to_any_format() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/database/search"))
            .and(query_param("format", "album"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![], 1, 1)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/database/search"))
            .and(query_param_is_missing("format"))
            .and(query_param("type", "release"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(page(vec![result(9, "Artist - Single")], 1, 1)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = DiscogsClient::new(config(&server), "automudo-tests").unwrap();
        let candidates = client.search("artist single", ReleaseScope::All, 4).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].secondary_name, "Single");
    }

    #[tokio::test]
    async fn test_pages_until_cap() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/database/search"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(
                vec![result(1, "A - One"), result(2, "A - Two")],
                1,
                5,
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/database/search"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(
                vec![result(3, "A - Three"), result(4, "A - Four")],
                2,
                5,
            )))
            .mount(&server)
            .await;

        let mut config = config(&server);
        config.per_page = 2;
        let client = DiscogsClient::new(config, "automudo-tests").unwrap();
        let candidates = client.search("a", ReleaseScope::Master, 3).await.unwrap();

        let ids: Vec<&str> = candidates.iter().map(|c| c.source_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_fetches_tracklists() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/database/search"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(page(vec![result(3, "Radiohead - OK Computer")], 1, 1)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/masters/3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tracklist": [
                    {"position": "", "title": "Side A", "duration": "", "type_": "heading"},
                    {"position": "1", "title": "Airbag", "duration": "4:44", "type_": "track"},
                    {"position": "2", "title": "Paranoid Android", "duration": "", "type_": "track"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = config(&server);
        config.fetch_tracklists = true;
        let client = DiscogsClient::new(config, "automudo-tests").unwrap();
        let candidates = client.search("ok computer", ReleaseScope::Master, 1).await.unwrap();

        assert_eq!(
            candidates[0].sub_items,
            vec![
                SubItem {
                    name: "Airbag".to_string(),
                    duration_secs: Some(284)
                },
                SubItem {
                    name: "Paranoid Android".to_string(),
                    duration_secs: None
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_payload_is_a_query_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/database/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let client = DiscogsClient::new(config(&server), "automudo-tests").unwrap();
        let err = client.search("x", ReleaseScope::Master, 1).await.unwrap_err();
        assert!(matches!(err, MetadataError::ParseError(_)));
    }

    #[tokio::test]
    async fn test_rate_limited_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/database/search"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = DiscogsClient::new(config(&server), "automudo-tests").unwrap();
        let err = client.search("x", ReleaseScope::Master, 1).await.unwrap_err();
        assert!(matches!(err, MetadataError::RateLimitExceeded));
    }

    #[test]
    fn test_missing_api_key() {
        let config = DiscogsConfig {
            api_key: String::new(),
            base_url: "http://localhost".to_string(),
            per_page: 50,
            timeout_secs: 5,
            rate_limit_ms: 0,
            format_preference: vec![String::new()],
            fetch_tracklists: false,
        };
        assert!(matches!(
            DiscogsClient::new(config, "ua"),
            Err(MetadataError::NotConfigured(_))
        ));
    }
}
