use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::tracker::Compression;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// User-Agent sent by every HTTP adapter
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    pub discogs: DiscogsConfig,
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub matcher: MatcherConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_user_agent() -> String {
    format!("automudo/{}", env!("CARGO_PKG_VERSION"))
}

/// Discogs metadata source configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscogsConfig {
    /// Personal access token
    pub api_key: String,
    #[serde(default = "default_discogs_url")]
    pub base_url: String,
    /// Results requested per page (Discogs caps this at 100)
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Minimum delay between two requests
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,
    /// Format filters tried in order; the first one with results wins.
    /// An empty string means no format filter.
    #[serde(default = "default_format_preference")]
    pub format_preference: Vec<String>,
    /// Fetch each candidate's tracklist (one extra request per candidate)
    #[serde(default = "default_fetch_tracklists")]
    pub fetch_tracklists: bool,
}

fn default_discogs_url() -> String {
    "https://api.discogs.com".to_string()
}

fn default_per_page() -> u32 {
    50
}

fn default_timeout() -> u32 {
    30
}

fn default_rate_limit_ms() -> u64 {
    1000
}

fn default_format_preference() -> Vec<String> {
    ["album", "vinyl", "cd", "lp", ""]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_fetch_tracklists() -> bool {
    true
}

/// Tracker configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackerConfig {
    #[serde(default)]
    pub backend: TrackerBackend,
    pub username: String,
    pub password: String,
    #[serde(default = "default_tracker_url")]
    pub base_url: String,
    #[serde(default = "default_login_url")]
    pub login_url: String,
    #[serde(default = "default_download_url")]
    pub download_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Login attempts allowed per request before giving up
    #[serde(default = "default_max_login_attempts")]
    pub max_login_attempts: u32,
}

/// Available tracker backends
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrackerBackend {
    #[default]
    Rutracker,
}

fn default_tracker_url() -> String {
    "https://rutracker.org/forum".to_string()
}

fn default_login_url() -> String {
    "https://rutracker.org/forum/login.php".to_string()
}

fn default_download_url() -> String {
    "https://rutracker.org/forum/dl.php".to_string()
}

fn default_max_login_attempts() -> u32 {
    2
}

/// Candidate matcher configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MatcherConfig {
    /// Matches kept per description
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Score a candidate must exceed
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Raw candidates fetched per wanted result
    #[serde(default = "default_over_fetch_factor")]
    pub over_fetch_factor: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            threshold: default_threshold(),
            over_fetch_factor: default_over_fetch_factor(),
        }
    }
}

fn default_max_results() -> usize {
    1
}

fn default_threshold() -> f64 {
    0.9
}

fn default_over_fetch_factor() -> usize {
    2
}

/// Torrent selection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SelectionConfig {
    #[serde(default)]
    pub discography: bool,
    #[serde(default)]
    pub allow_fancy: bool,
    #[serde(default)]
    pub allow_remaster: bool,
    #[serde(default = "default_keyword_ratio_threshold")]
    pub keyword_ratio_threshold: f64,
    /// Keep only categories holding this compression type
    #[serde(default)]
    pub compression: Option<Compression>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            discography: false,
            allow_fancy: false,
            allow_remaster: false,
            keyword_ratio_threshold: default_keyword_ratio_threshold(),
            compression: None,
        }
    }
}

fn default_keyword_ratio_threshold() -> f64 {
    0.6
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Directory .torrent files are written to
    #[serde(default = "default_torrents_dir")]
    pub torrents_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            torrents_dir: default_torrents_dir(),
        }
    }
}

fn default_torrents_dir() -> PathBuf {
    PathBuf::from("torrents")
}

/// Sanitized config for printing (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub user_agent: String,
    pub discogs: SanitizedDiscogsConfig,
    pub tracker: SanitizedTrackerConfig,
    pub matcher: MatcherConfig,
    pub selection: SelectionConfig,
    pub output: OutputConfig,
}

/// Sanitized Discogs config (token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDiscogsConfig {
    pub api_key_configured: bool,
    pub base_url: String,
    pub per_page: u32,
    pub timeout_secs: u32,
    pub rate_limit_ms: u64,
    pub format_preference: Vec<String>,
    pub fetch_tracklists: bool,
}

/// Sanitized tracker config (password hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTrackerConfig {
    pub backend: String,
    pub username: String,
    pub password_configured: bool,
    pub base_url: String,
    pub login_url: String,
    pub download_url: String,
    pub timeout_secs: u32,
    pub max_login_attempts: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let d = &config.discogs;
        let t = &config.tracker;
        Self {
            user_agent: config.user_agent.clone(),
            discogs: SanitizedDiscogsConfig {
                api_key_configured: !d.api_key.is_empty(),
                base_url: d.base_url.clone(),
                per_page: d.per_page,
                timeout_secs: d.timeout_secs,
                rate_limit_ms: d.rate_limit_ms,
                format_preference: d.format_preference.clone(),
                fetch_tracklists: d.fetch_tracklists,
            },
            tracker: SanitizedTrackerConfig {
                backend: match t.backend {
                    TrackerBackend::Rutracker => "rutracker".to_string(),
                },
                username: t.username.clone(),
                password_configured: !t.password.is_empty(),
                base_url: t.base_url.clone(),
                login_url: t.login_url.clone(),
                download_url: t.download_url.clone(),
                timeout_secs: t.timeout_secs,
                max_login_attempts: t.max_login_attempts,
            },
            matcher: config.matcher.clone(),
            selection: config.selection.clone(),
            output: config.output.clone(),
        }
    }
}
