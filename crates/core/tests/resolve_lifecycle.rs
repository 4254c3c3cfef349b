//! Resolution lifecycle integration tests.
//!
//! These tests drive the resolver against mock HTTP servers standing in for
//! Discogs and rutracker:
//! - description -> Discogs match -> tracker search -> selection -> download
//! - silent session expiry on the tracker
//! - fatal login failures

use encoding_rs::WINDOWS_1251;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use automudo_core::{load_config_from_str, validate_config, Resolution, Resolver};

const LOGIN_PAGE: &str = r#"<html><form action="login.php" method="post">
<input name="login_username"><input name="login_password" type="password">
</form></html>"#;

/// Test helper owning both mock servers.
struct TestHarness {
    discogs: MockServer,
    tracker: MockServer,
}

impl TestHarness {
    async fn new() -> Self {
        Self {
            discogs: MockServer::start().await,
            tracker: MockServer::start().await,
        }
    }

    fn resolver(&self) -> Resolver {
        let config = load_config_from_str(&format!(
            r#"
user_agent = "automudo-tests/1.0"

[discogs]
api_key = "token"
base_url = "{discogs}"
rate_limit_ms = 0
fetch_tracklists = false

[tracker]
username = "alice"
password = "secret"
base_url = "{tracker}/forum"
login_url = "{tracker}/forum/login.php"
download_url = "{tracker}/forum/dl.php"
timeout_secs = 5
"#,
            discogs = self.discogs.uri(),
            tracker = self.tracker.uri(),
        ))
        .expect("Failed to parse test config");
        validate_config(&config).expect("Test config is invalid");
        Resolver::from_config(&config).expect("Failed to build resolver")
    }

    /// Serve one search result for every scope and format.
    async fn mount_discogs(&self, title: &str) {
        Mock::given(method("GET"))
            .and(path("/database/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "pagination": {"page": 1, "pages": 1},
                "results": [{"id": 1337, "title": title, "year": "1998", "format": ["CD"]}]
            })))
            .mount(&self.discogs)
            .await;
    }

    async fn mount_listing(&self, rows: &str) {
        let html = format!(
            r#"<html><body><a href="login.php?logout=1">logout</a>
<table id="tor-tbl"><tbody>{}</tbody></table></body></html>"#,
            rows
        );
        let (body, _, _) = WINDOWS_1251.encode(&html);
        Mock::given(method("GET"))
            .and(path("/forum/tracker.php"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(body.into_owned(), "text/html"),
            )
            .mount(&self.tracker)
            .await;
    }
}

fn listing_row(id: u32, title: &str, size: &str, seeders: u32) -> String {
    format!(
        r#"<tr>
<td class="row1 f-name-col"><div class="f-name"><a>Electronic (lossless)</a></div></td>
<td class="row4 t-title-col"><div class="t-title"><a class="tLink" href="viewtopic.php?t={id}">{title}</a></div></td>
<td class="row4 tor-size"><a href="dl.php?t={id}">{size}</a></td>
<td class="row4"><b class="seedmed">{seeders}</b></td>
<td class="row4 leechmed">0</td>
</tr>"#
    )
}

#[tokio::test]
async fn test_full_resolution_and_download() {
    let harness = TestHarness::new().await;
    harness
        .mount_discogs("Boards Of Canada - Music Has The Right To Children")
        .await;
    harness
        .mount_listing(&format!(
            "{}{}{}",
            listing_row(1, "Boards of Canada - Music Has the Right to Children - 1998, FLAC", "420 MB", 25),
            listing_row(2, "Boards of Canada - Music Has the Right to Children (24bit Vinyl Rip)", "1.9 GB", 80),
            listing_row(3, "Boards of Canada - Geogaddi - 2002, FLAC", "500 MB", 40),
        ))
        .await;
    Mock::given(method("GET"))
        .and(path("/forum/dl.php"))
        .and(query_param("t", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(b"d8:announce3:urle".to_vec(), "application/x-bittorrent"),
        )
        .expect(1)
        .mount(&harness.tracker)
        .await;

    let resolver = harness.resolver();
    let resolution = resolver
        .resolve("Boards of Canada - Music Has the Right to Children (Full Album)")
        .await
        .unwrap();

    let Resolution::Found { album, torrent } = resolution else {
        panic!("expected a torrent, got {:?}", resolution);
    };
    assert_eq!(album.candidate.source_id, "1337");
    assert_eq!(album.candidate.primary_name, "Boards Of Canada");
    assert_eq!(torrent.torrent_id, "1");
    assert_eq!(torrent.size_bytes, 420 * 1024 * 1024);

    let bytes = resolver.download(&torrent).await.unwrap();
    assert_eq!(bytes, b"d8:announce3:urle");
}

#[tokio::test]
async fn test_expired_session_logs_in_once() {
    let harness = TestHarness::new().await;
    harness.mount_discogs("Radiohead - OK Computer").await;

    // Without the session cookie the tracker serves its login page.
    Mock::given(method("GET"))
        .and(path("/forum/tracker.php"))
        .and(wiremock::matchers::header_regex("cookie", "bb_session=ok"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<a>logout</a><table id="tor-tbl"><tbody>{}</tbody></table>"#,
            listing_row(7, "Radiohead - OK Computer - 1997, FLAC", "400 MB", 3)
        )))
        .with_priority(1)
        .mount(&harness.tracker)
        .await;
    Mock::given(method("GET"))
        .and(path("/forum/tracker.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_PAGE))
        .with_priority(10)
        .mount(&harness.tracker)
        .await;
    Mock::given(method("POST"))
        .and(path("/forum/login.php"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "bb_session=ok; Path=/")
                .set_body_string("<a>logout</a>"),
        )
        .expect(1)
        .mount(&harness.tracker)
        .await;

    let resolver = harness.resolver();
    let first = resolver.resolve("radiohead ok computer").await.unwrap();
    let second = resolver.resolve("radiohead ok computer").await.unwrap();

    assert!(matches!(first, Resolution::Found { .. }));
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_rejected_credentials_stop_the_batch() {
    let harness = TestHarness::new().await;
    harness.mount_discogs("Radiohead - OK Computer").await;
    Mock::given(method("GET"))
        .and(path("/forum/tracker.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_PAGE))
        .mount(&harness.tracker)
        .await;
    Mock::given(method("POST"))
        .and(path("/forum/login.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_PAGE))
        .expect(2)
        .mount(&harness.tracker)
        .await;

    let err = harness
        .resolver()
        .resolve("radiohead ok computer")
        .await
        .unwrap_err();
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_unmatched_description_never_reaches_tracker() {
    let harness = TestHarness::new().await;
    harness.mount_discogs("Radiohead - OK Computer").await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&harness.tracker)
        .await;

    let resolution = harness
        .resolver()
        .resolve("Aphex Twin - Selected Ambient Works 85-92")
        .await
        .unwrap();
    assert_eq!(resolution, Resolution::NoAlbumMatch);
}
