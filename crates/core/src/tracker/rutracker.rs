//! rutracker.org tracker backend.

use async_trait::async_trait;
use encoding_rs::WINDOWS_1251;
use tracing::{debug, info};

use super::client::{ClientOptions, LoginForm, RetrievalClient, TrackerRequest};
use super::extractor::{ListingMarkers, ResultExtractor};
use super::{TorrentRecord, Tracker, TrackerError};
use crate::config::TrackerConfig;
use crate::text::SearchKey;

const NAME: &str = "rutracker";

/// Appears only on pages served to a logged-in user.
const AUTHENTICATED_MARKER: &str = "logout";

/// Value of the login form's submit button ("Вход").
const LOGIN_BUTTON: &str = "Вход";

/// rutracker.org search and download.
pub struct RutrackerTracker {
    client: RetrievalClient,
    extractor: ResultExtractor,
    base_url: String,
    download_url: String,
}

impl RutrackerTracker {
    pub fn new(config: &TrackerConfig, user_agent: &str) -> Result<Self, TrackerError> {
        if config.username.is_empty() {
            return Err(TrackerError::NotConfigured(
                "rutracker username is empty".to_string(),
            ));
        }

        let client = RetrievalClient::new(
            ClientOptions {
                tracker: NAME.to_string(),
                user_agent: user_agent.to_string(),
                timeout_secs: config.timeout_secs,
                max_login_attempts: config.max_login_attempts,
                authenticated_marker: AUTHENTICATED_MARKER.to_string(),
            },
            LoginForm {
                url: config.login_url.clone(),
                fields: vec![
                    ("login_username".to_string(), config.username.clone()),
                    ("login_password".to_string(), config.password.clone()),
                    ("login".to_string(), LOGIN_BUTTON.to_string()),
                ],
            },
        )?;

        Ok(Self {
            client,
            extractor: ResultExtractor::new(NAME, ListingMarkers::default()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            download_url: config.download_url.clone(),
        })
    }

    fn topic_url(&self, torrent_id: &str) -> String {
        format!("{}/viewtopic.php?t={}", self.base_url, torrent_id)
    }
}

/// Build the `nm` search parameter: every keyword quoted, space separated.
fn search_terms(keywords: &SearchKey) -> String {
    keywords
        .tokens()
        .iter()
        .map(|k| format!("\"{}\"", k))
        .collect::<Vec<_>>()
        .join(" ")
}

/// rutracker serves its pages in windows-1251.
fn decode_page(body: &[u8]) -> String {
    let (text, _, had_errors) = WINDOWS_1251.decode(body);
    if had_errors {
        debug!("Listing contained bytes invalid in windows-1251");
    }
    text.into_owned()
}

#[async_trait]
impl Tracker for RutrackerTracker {
    fn name(&self) -> &str {
        NAME
    }

    async fn search(&self, keywords: &SearchKey) -> Result<Vec<TorrentRecord>, TrackerError> {
        let terms = search_terms(keywords);
        info!(tracker = NAME, query = %terms, "Searching tracker");

        let request =
            TrackerRequest::get(format!("{}/tracker.php", self.base_url)).query("nm", terms.clone());
        let response = self.client.request(&request, true).await?;

        let markup = decode_page(&response.body);
        let records = self.extractor.extract_all(&markup)?;

        debug!(tracker = NAME, query = %terms, count = records.len(), "Search complete");
        Ok(records)
    }

    async fn fetch_torrent_file(&self, torrent_id: &str) -> Result<Vec<u8>, TrackerError> {
        debug!(tracker = NAME, torrent_id, "Fetching torrent file");

        let request = TrackerRequest::get(&self.download_url)
            .query("t", torrent_id)
            .header("Referer", self.topic_url(torrent_id))
            .cookie("bb_dl", torrent_id);
        let response = self.client.request(&request, true).await?;

        if !response.is_torrent() {
            return Err(TrackerError::ConnectionFailed(format!(
                "expected a torrent file for {}, got {}",
                torrent_id,
                response.content_type.as_deref().unwrap_or("no content type")
            )));
        }

        Ok(response.body)
    }
}
