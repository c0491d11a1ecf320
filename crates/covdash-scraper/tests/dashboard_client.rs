//! Integration tests for `DashboardClient` and `collect_images`.
//!
//! Uses `wiremock` to stand up a local HTTP server for each test so no
//! real network traffic is made.

use std::time::Duration;

use covdash_core::Document;
use covdash_scraper::{collect_images, DashboardClient, FetchError, ImageFetchError, PageSource};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MARKER: &str = "UW-EauClaireCOVID-19DataTrackerDashboard";

fn test_client(server: &MockServer) -> DashboardClient {
    DashboardClient::new(&format!("{}/dashboard/", server.uri()), 1, "covdash-test/0.1")
        .expect("failed to build test DashboardClient")
}

// ---------------------------------------------------------------------------
// Page fetch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_page_returns_body_and_media_type() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/dashboard/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<h4>3:45 p.m. 9/14/20</h4>", "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let fetched = test_client(&server).fetch_page().await.expect("page fetch");
    assert_eq!(fetched.body, b"<h4>3:45 p.m. 9/14/20</h4>");
    assert_eq!(
        fetched.media_type.as_deref(),
        Some("text/html; charset=utf-8")
    );
}

#[tokio::test]
async fn fetch_page_server_error_is_unexpected_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/dashboard/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = test_client(&server).fetch_page().await.unwrap_err();
    assert!(
        matches!(err, FetchError::UnexpectedStatus { status: 503, .. }),
        "expected UnexpectedStatus(503), got: {err:?}"
    );
}

#[tokio::test]
async fn fetch_page_not_found_is_unexpected_status() {
    let server = MockServer::start().await;

    let err = test_client(&server).fetch_page().await.unwrap_err();
    assert!(
        matches!(err, FetchError::UnexpectedStatus { status: 404, .. }),
        "expected UnexpectedStatus(404), got: {err:?}"
    );
}

#[tokio::test]
async fn fetch_page_slow_response_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/dashboard/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let err = test_client(&server).fetch_page().await.unwrap_err();
    assert!(
        matches!(err, FetchError::Timeout { .. }),
        "expected Timeout, got: {err:?}"
    );
}

// ---------------------------------------------------------------------------
// Chart images
// ---------------------------------------------------------------------------

#[tokio::test]
async fn collect_images_fetches_only_marked_images() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/static/{MARKER}HSTiles/HealthServicesTiles/1.png")))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(vec![0x89, b'P', b'N', b'G'], "image/png"),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/static/logo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1]))
        .expect(0)
        .mount(&server)
        .await;

    let document = Document::parse(&format!(
        r#"<img src="/static/logo.png">
           <img src="/static/{MARKER}HSTiles/HealthServicesTiles/1.png">"#
    ));

    let images = collect_images(&test_client(&server), &document, MARKER)
        .await
        .expect("images");

    assert_eq!(images.len(), 1);
    assert_eq!(
        images[&format!("{MARKER}HSTiles_HealthServicesTiles_1.png")],
        vec![0x89, b'P', b'N', b'G']
    );
}

#[tokio::test]
async fn collect_images_reports_failing_identifier() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let document = Document::parse(&format!(r#"<img src="/static/{MARKER}/tile.png">"#));

    let err = collect_images(&test_client(&server), &document, MARKER)
        .await
        .unwrap_err();
    assert!(
        matches!(err, ImageFetchError::Fetch { ref identifier, .. } if identifier == &format!("{MARKER}_tile.png")),
        "expected Fetch error for tile, got: {err:?}"
    );
}

#[tokio::test]
async fn collect_images_rejects_json_payload() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("{\"error\":\"gone\"}", "application/json"),
        )
        .mount(&server)
        .await;

    let document = Document::parse(&format!(r#"<img src="/static/{MARKER}/tile.png">"#));

    let err = collect_images(&test_client(&server), &document, MARKER)
        .await
        .unwrap_err();
    assert!(
        matches!(err, ImageFetchError::Content { .. }),
        "expected Content error, got: {err:?}"
    );
}

#[tokio::test]
async fn collect_images_without_marked_images_is_empty() {
    let server = MockServer::start().await;
    let document = Document::parse("<p>no charts today</p>");

    let images = collect_images(&test_client(&server), &document, MARKER)
        .await
        .expect("images");
    assert!(images.is_empty());
}
