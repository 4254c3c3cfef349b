//! Authenticated retrieval client.
//!
//! Trackers expire their sessions silently: an expired session gets a login
//! page with HTTP 200 instead of the requested page. [`RetrievalClient`]
//! inspects every response, logs in again when the response does not look
//! authenticated, and retries the original request, bounded by a login
//! budget.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode, Url};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::TrackerError;

/// Content type of a successfully fetched .torrent file.
pub const TORRENT_CONTENT_TYPE: &str = "application/x-bittorrent";

/// Per-client session state: the cookie jar and the login-attempt counter.
///
/// Owned by exactly one [`RetrievalClient`] and never written to disk.
#[derive(Debug)]
pub struct Session {
    cookies: Arc<Jar>,
    login_attempts: u32,
}

impl Session {
    fn new() -> Self {
        Self {
            cookies: Arc::new(Jar::default()),
            login_attempts: 0,
        }
    }

    /// Login attempts made during the current logical request.
    pub fn login_attempts(&self) -> u32 {
        self.login_attempts
    }
}

/// HTTP method of a tracker request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A request to the tracker.
#[derive(Debug, Clone)]
pub struct TrackerRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    /// Extra cookies, added to the session jar for the request's URL.
    pub cookies: Vec<(String, String)>,
}

impl TrackerRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url.into())
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url.into())
    }

    fn new(method: Method, url: String) -> Self {
        Self {
            method,
            url,
            query: Vec::new(),
            form: Vec::new(),
            headers: Vec::new(),
            cookies: Vec::new(),
        }
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn form(mut self, key: &str, value: impl Into<String>) -> Self {
        self.form.push((key.to_string(), value.into()));
        self
    }

    pub fn header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers.push((key.to_string(), value.into()));
        self
    }

    pub fn cookie(mut self, key: &str, value: impl Into<String>) -> Self {
        self.cookies.push((key.to_string(), value.into()));
        self
    }
}

/// Raw tracker response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Whether the response carries a .torrent file.
    pub fn is_torrent(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains(TORRENT_CONTENT_TYPE))
    }
}

/// Credentials form submitted to the tracker's login endpoint.
#[derive(Clone)]
pub struct LoginForm {
    pub url: String,
    pub fields: Vec<(String, String)>,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // field values hold the password
        f.debug_struct("LoginForm")
            .field("url", &self.url)
            .field("fields", &self.fields.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .finish()
    }
}

/// Options for a [`RetrievalClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Tracker name, used in errors and logs.
    pub tracker: String,
    /// User-Agent sent with every request.
    pub user_agent: String,
    pub timeout_secs: u32,
    /// Login attempts allowed per logical request.
    pub max_login_attempts: u32,
    /// Bytes that only appear on pages served to a logged-in user.
    pub authenticated_marker: String,
}

/// HTTP client that keeps a tracker session alive.
pub struct RetrievalClient {
    http: Client,
    session: Mutex<Session>,
    login: LoginForm,
    options: ClientOptions,
}

impl RetrievalClient {
    pub fn new(options: ClientOptions, login: LoginForm) -> Result<Self, TrackerError> {
        let session = Session::new();
        let http = Client::builder()
            .user_agent(&options.user_agent)
            .timeout(Duration::from_secs(options.timeout_secs as u64))
            .cookie_provider(Arc::clone(&session.cookies))
            .build()?;

        Ok(Self {
            http,
            session: Mutex::new(session),
            login,
            options,
        })
    }

    /// Send a request, logging in first if the response shows that the
    /// session is not authenticated.
    ///
    /// Returns as soon as the response is a .torrent file, contains the
    /// authenticated marker, or `requires_auth` is false. Fails with
    /// [`TrackerError::LoginFailed`] once the login budget is spent.
    pub async fn request(
        &self,
        request: &TrackerRequest,
        requires_auth: bool,
    ) -> Result<RawResponse, TrackerError> {
        // Held for the whole exchange so a login never interleaves with
        // another caller's request.
        let mut session = self.session.lock().await;
        session.login_attempts = 0;

        loop {
            let response = self.send(&session, request).await?;

            if response.is_torrent() || self.is_authenticated(&response.body) || !requires_auth {
                return Ok(response);
            }

            if session.login_attempts >= self.options.max_login_attempts {
                return Err(self.login_failed(format!(
                    "still unauthenticated after {} login attempts",
                    session.login_attempts
                )));
            }

            debug!(tracker = %self.options.tracker, url = %request.url, "Session not authenticated, logging in");
            session.login_attempts += 1;
            match self.login(&session).await? {
                true => info!(tracker = %self.options.tracker, "Logged in"),
                false if session.login_attempts >= self.options.max_login_attempts => {
                    return Err(self.login_failed("credentials rejected".to_string()));
                }
                false => warn!(
                    tracker = %self.options.tracker,
                    attempt = session.login_attempts,
                    "Login failed, retrying"
                ),
            }
        }
    }

    /// Submit the login form. Returns whether the tracker accepted it.
    async fn login(&self, session: &Session) -> Result<bool, TrackerError> {
        let mut request = TrackerRequest::post(&self.login.url);
        request.form = self.login.fields.clone();

        let response = self.send(session, &request).await?;
        Ok(self.is_authenticated(&response.body))
    }

    async fn send(
        &self,
        session: &Session,
        request: &TrackerRequest,
    ) -> Result<RawResponse, TrackerError> {
        let url =
            Url::parse(&request.url).map_err(|e| TrackerError::InvalidUrl(format!("{}: {}", request.url, e)))?;

        for (name, value) in &request.cookies {
            session
                .cookies
                .add_cookie_str(&format!("{}={}", name, value), &url);
        }

        let mut builder = match request.method {
            Method::Get => self.http.get(url),
            Method::Post => self.http.post(url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if !request.form.is_empty() {
            builder = builder.form(&request.form);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status();
        // Auth failures fall through to the marker check like a login page.
        if !status.is_success() && status != StatusCode::UNAUTHORIZED && status != StatusCode::FORBIDDEN {
            return Err(TrackerError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.bytes().await?.to_vec();

        Ok(RawResponse { content_type, body })
    }

    fn is_authenticated(&self, body: &[u8]) -> bool {
        let marker = self.options.authenticated_marker.as_bytes();
        !marker.is_empty() && body.windows(marker.len()).any(|w| w == marker)
    }

    fn login_failed(&self, reason: String) -> TrackerError {
        TrackerError::LoginFailed {
            tracker: self.options.tracker.clone(),
            reason,
        }
    }
}
