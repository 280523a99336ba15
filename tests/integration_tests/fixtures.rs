//! Test fixtures for integration tests
//!
//! Builds archive and article pages in the publisher's format and a config
//! whose waits are all in milliseconds.

use harvester::config::{BackoffRule, Config, RetryConfig};
use harvester::utils::retry::Exhaustion;
use serde_json::{json, Map, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Article page without an embedded data script
pub const PLAIN_ARTICLE_HTML: &str = r#"
<!DOCTYPE html>
<html lang="en">
<head><title>Subscribe to continue reading</title></head>
<body><p>This content is for subscribers.</p></body>
</html>
"#;

/// Archive page without a state script
pub const BLOCKED_ARCHIVE_HTML: &str = r#"
<!DOCTYPE html>
<html><body><h1>Access Denied</h1></body></html>
"#;

/// Config pointing at `server`, with journals under `dir` and ms-scale waits
pub fn test_config(server: &MockServer, dir: &TempDir) -> Config {
    let mut config = Config::default();

    config.archive.base_url = server.uri();
    config.archive.retry = retry(Exhaustion::Raise, &[500]);

    config.detail.min_interval_ms = 1;
    config.detail.retry = retry(Exhaustion::Tolerate, &[403, 500, 503]);

    config.http.request_timeout_secs = 5;

    config.storage.shallow_path = dir.path().join("data/shallow_article_data.jsonl");
    config.storage.detail_path = dir.path().join("data/full_article_data.jsonl");
    config.storage.sync_writes = false;

    config
}

fn retry(on_exhausted: Exhaustion, statuses: &[u16]) -> RetryConfig {
    RetryConfig {
        max_attempts: 2,
        cooldown_ms: 1,
        on_exhausted,
        rules: statuses
            .iter()
            .map(|&status| BackoffRule {
                status,
                backoff_ms: 1,
            })
            .collect(),
        transport_backoff_ms: Some(1),
    }
}

/// URL of an article served by the mock
pub fn article_url(server: &MockServer, id: &str) -> String {
    format!("{}/articles/{id}", server.uri())
}

/// Archive page listing `ids`, reporting `page` of `last`
pub fn archive_html(server: &MockServer, archive_path: &str, ids: &[&str], page: u32, last: u32) -> String {
    let mut data = Map::new();

    data.insert(
        "allesseh_content_full_a1b2".to_string(),
        json!({
            "data": {
                "collection": ids.iter().map(|id| json!({"id": id, "type": "article"})).collect::<Vec<_>>(),
                "data": {
                    "linksForPagination": {
                        "self": format!("{archive_path}?page={page}"),
                        "last": format!("{archive_path}?page={last}")
                    }
                }
            }
        }),
    );

    for id in ids {
        data.insert(
            format!("article|capi_{id}"),
            json!({
                "data": {
                    "data": {
                        "id": id,
                        "url": article_url(server, id),
                        "headline": format!("Headline {id}"),
                        "articleSection": "Markets",
                        "image": {"src": "https://images.example.com/x.jpg"}
                    }
                }
            }),
        );
    }

    state_html(&json!({ "data": data }))
}

/// Archive page whose state has no content collection
pub fn empty_archive_html() -> String {
    state_html(&json!({"data": {"navigation": {"items": []}}}))
}

fn state_html(state: &Value) -> String {
    format!(
        "<!DOCTYPE html><html><head><script>window.__STATE__ = {state};</script></head><body></body></html>"
    )
}

/// Article page embedding `data` in its data script
pub fn article_html(data: &Value) -> String {
    format!(
        r#"<!DOCTYPE html><html><head>
<script id="__NEXT_DATA__" type="application/json">{data}</script>
</head><body><article>...</article></body></html>"#
    )
}

/// Mount one archive page that must be requested exactly `times` times
pub async fn mount_archive_page(
    server: &MockServer,
    archive_path: &str,
    page: u32,
    body: String,
    times: u64,
) {
    Mock::given(method("GET"))
        .and(path(archive_path))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(times)
        .mount(server)
        .await;
}

/// Mount an article page that must be requested exactly `times` times
pub async fn mount_article(server: &MockServer, id: &str, template: ResponseTemplate, times: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/articles/{id}")))
        .respond_with(template)
        .expect(times)
        .mount(server)
        .await;
}

/// Fail the test if anything not mounted explicitly is requested
pub async fn forbid_other_requests(server: &MockServer) {
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(599))
        .with_priority(u8::MAX)
        .expect(0)
        .mount(server)
        .await;
}
