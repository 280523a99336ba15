//! Error scenario integration tests
//!
//! Tests various failure modes and error handling:
//! 1. Archive server errors: recovery and exhaustion
//! 2. Statuses outside the retry table
//! 3. Article rate limiting and timeouts: recovery and tolerated exhaustion
//! 4. Unusable payloads
//! 5. Damaged journals

use chrono::NaiveDate;
use harvester::crawler::Harvester;
use harvester::error::{Error, ErrorCategory, FetchError, HarvestError, HarvesterErrorTrait, StoreError};
use harvester::utils::retry::FailedFetch;
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::fixtures::{
    archive_html, article_html, article_url, empty_archive_html, forbid_other_requests,
    mount_archive_page, mount_article, test_config, BLOCKED_ARCHIVE_HTML,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn mount_archive_status(server: &MockServer, archive_path: &str, status: u16, times: u64) {
    Mock::given(method("GET"))
        .and(path(archive_path))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(status))
        .expect(times)
        .mount(server)
        .await;
}

async fn seed_shallow(server: &MockServer, config: &harvester::config::Config, ids: &[&str]) {
    let (shallow, _) = harvester::storage::open_stores(&config.storage);
    let summaries: Vec<harvester::models::ArticleSummary> = ids
        .iter()
        .map(|id| {
            serde_json::from_value(json!({"id": id, "url": article_url(server, id)})).unwrap()
        })
        .collect();
    shallow.append("2024-01-02", &summaries).unwrap();
}

// ============================================================================
// Archive Error Tests
// ============================================================================

#[tokio::test]
async fn test_archive_500_recovers() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let archive = "/news/archive/2024/01/02";

    Mock::given(method("GET"))
        .and(path(archive))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .with_priority(1)
        .expect(2)
        .mount(&server)
        .await;
    mount_archive_page(&server, archive, 1, archive_html(&server, archive, &["a1"], 1, 1), 1).await;

    let mut harvester = Harvester::from_config(&test_config(&server, &dir)).unwrap();
    harvester.load().unwrap();
    harvester
        .shallow_sweep(date(2024, 1, 2), date(2024, 1, 2))
        .await
        .unwrap();

    assert_eq!(harvester.shallow()["2024-01-02"].len(), 1);
    assert!(harvester.failures().is_empty());
}

#[tokio::test]
async fn test_archive_500_exhaustion_aborts_day() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);

    let newer = "/news/archive/2024/01/02";
    mount_archive_page(&server, newer, 1, archive_html(&server, newer, &["a1"], 1, 1), 1).await;

    // max_attempts = 2, so the third 500 gives up
    mount_archive_status(&server, "/news/archive/2024/01/01", 500, 3).await;
    forbid_other_requests(&server).await;

    let mut harvester = Harvester::from_config(&config).unwrap();
    harvester.load().unwrap();
    let result = harvester
        .shallow_sweep(date(2023, 12, 31), date(2024, 1, 2))
        .await;

    match result {
        Err(HarvestError::Day {
            day,
            source: FetchError::MaxRetriesExceeded { status, attempts, .. },
        }) => {
            assert_eq!(day, "2024-01-01");
            assert_eq!(status, 500);
            assert_eq!(attempts, 3);
        }
        other => panic!("Expected day failure, got: {other:?}"),
    }

    // Completed days stay, the failed one and everything after it are absent
    let mut reloaded = Harvester::from_config(&config).unwrap();
    reloaded.load().unwrap();
    assert!(reloaded.shallow().contains_key("2024-01-02"));
    assert!(!reloaded.shallow().contains_key("2024-01-01"));
    assert!(!reloaded.shallow().contains_key("2023-12-31"));
}

#[tokio::test]
async fn test_archive_status_outside_table_is_tolerated() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let archive = "/news/archive/2024/01/02";

    mount_archive_status(&server, archive, 404, 1).await;
    forbid_other_requests(&server).await;

    let mut harvester = Harvester::from_config(&test_config(&server, &dir)).unwrap();
    harvester.load().unwrap();
    harvester
        .shallow_sweep(date(2024, 1, 2), date(2024, 1, 2))
        .await
        .unwrap();

    assert!(harvester.shallow()["2024-01-02"].is_empty());
    assert_eq!(
        harvester.failures(),
        vec![FailedFetch {
            status: Some(404),
            url: format!("{}{archive}?page=1", server.uri()),
        }]
    );
    assert_eq!(harvester.stats().tolerated_failures, 1);
}

#[tokio::test]
async fn test_archive_without_state_is_an_empty_day() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let blocked = "/news/archive/2024/01/02";
    let quiet = "/news/archive/2024/01/01";
    mount_archive_page(&server, blocked, 1, BLOCKED_ARCHIVE_HTML.to_string(), 1).await;
    mount_archive_page(&server, quiet, 1, empty_archive_html(), 1).await;
    forbid_other_requests(&server).await;

    let mut harvester = Harvester::from_config(&test_config(&server, &dir)).unwrap();
    harvester.load().unwrap();
    harvester
        .shallow_sweep(date(2024, 1, 1), date(2024, 1, 2))
        .await
        .unwrap();

    assert!(harvester.shallow()["2024-01-02"].is_empty());
    assert!(harvester.shallow()["2024-01-01"].is_empty());
    assert_eq!(harvester.stats().days_fetched, 2);
}

#[tokio::test]
async fn test_archive_unreachable_aborts() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    let mut config = test_config(&server, &dir);
    config.archive.base_url = "http://127.0.0.1:1".to_string();

    let mut harvester = Harvester::from_config(&config).unwrap();
    harvester.load().unwrap();
    let result = harvester
        .shallow_sweep(date(2024, 1, 2), date(2024, 1, 2))
        .await;

    assert!(matches!(result, Err(HarvestError::Day { .. })));
    assert!(!config.storage.shallow_path.exists());
}

#[tokio::test]
async fn test_invalid_date_range() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    forbid_other_requests(&server).await;

    let mut harvester = Harvester::from_config(&test_config(&server, &dir)).unwrap();
    let result = harvester
        .shallow_sweep(date(2024, 1, 3), date(2024, 1, 1))
        .await;

    assert!(matches!(result, Err(HarvestError::InvalidDateRange { .. })));
}

// ============================================================================
// Article Error Tests
// ============================================================================

#[tokio::test]
async fn test_article_403_recovers() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);
    seed_shallow(&server, &config, &["a1"]).await;

    Mock::given(method("GET"))
        .and(path("/articles/a1"))
        .respond_with(ResponseTemplate::new(403))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_article(
        &server,
        "a1",
        ResponseTemplate::new(200).set_body_string(article_html(&json!({"ok": true}))),
        1,
    )
    .await;

    let mut harvester = Harvester::from_config(&config).unwrap();
    harvester.load().unwrap();
    harvester.detail_sweep(None).await.unwrap();

    assert!(!harvester.details()[&article_url(&server, "a1")].is_empty());
    assert!(harvester.failures().is_empty());
}

#[tokio::test]
async fn test_article_503_exhaustion_is_tolerated() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);
    seed_shallow(&server, &config, &["busy", "fine"]).await;

    mount_article(&server, "busy", ResponseTemplate::new(503), 3).await;
    mount_article(
        &server,
        "fine",
        ResponseTemplate::new(200).set_body_string(article_html(&json!({"ok": true}))),
        1,
    )
    .await;

    let mut harvester = Harvester::from_config(&config).unwrap();
    harvester.load().unwrap();
    harvester.detail_sweep(None).await.unwrap();

    let busy = article_url(&server, "busy");
    assert!(harvester.details()[&busy].is_empty());
    assert!(!harvester.details()[&article_url(&server, "fine")].is_empty());
    assert_eq!(
        harvester.failures(),
        vec![FailedFetch {
            status: Some(503),
            url: busy,
        }]
    );
}

#[tokio::test]
async fn test_article_timeout_is_retried() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&server, &dir);
    config.http.request_timeout_secs = 1;
    seed_shallow(&server, &config, &["slow"]).await;

    Mock::given(method("GET"))
        .and(path("/articles/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_article(
        &server,
        "slow",
        ResponseTemplate::new(200).set_body_string(article_html(&json!({"ok": true}))),
        1,
    )
    .await;

    let mut harvester = Harvester::from_config(&config).unwrap();
    harvester.load().unwrap();
    harvester.detail_sweep(None).await.unwrap();

    assert!(!harvester.details()[&article_url(&server, "slow")].is_empty());
    assert!(harvester.failures().is_empty());
}

#[tokio::test]
async fn test_article_timeout_exhaustion_is_tolerated() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&server, &dir);
    config.http.request_timeout_secs = 1;
    seed_shallow(&server, &config, &["stuck"]).await;

    // max_attempts = 2, so the third timeout gives up
    mount_article(
        &server,
        "stuck",
        ResponseTemplate::new(200).set_delay(Duration::from_secs(3)),
        3,
    )
    .await;

    let mut harvester = Harvester::from_config(&config).unwrap();
    harvester.load().unwrap();
    harvester.detail_sweep(None).await.unwrap();

    let stuck = article_url(&server, "stuck");
    assert!(harvester.details()[&stuck].is_empty());
    assert_eq!(
        harvester.failures(),
        vec![FailedFetch {
            status: None,
            url: stuck,
        }]
    );
}

#[tokio::test]
async fn test_article_with_broken_payload_is_empty() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);
    seed_shallow(&server, &config, &["broken"]).await;

    let html = r#"<html><script id="__NEXT_DATA__" type="application/json">{"props": </script></html>"#;
    mount_article(&server, "broken", ResponseTemplate::new(200).set_body_string(html), 1).await;

    let mut harvester = Harvester::from_config(&config).unwrap();
    harvester.load().unwrap();
    harvester.detail_sweep(None).await.unwrap();

    assert!(harvester.details()[&article_url(&server, "broken")].is_empty());
    assert!(harvester.failures().is_empty());
}

// ============================================================================
// Journal Damage Tests
// ============================================================================

#[tokio::test]
async fn test_partial_last_record_is_recovered() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);
    seed_shallow(&server, &config, &["a1"]).await;

    let mut journal = std::fs::read_to_string(&config.storage.shallow_path).unwrap();
    journal.push_str("{\"2024-01-01\":[{\"id\":\"cut");
    std::fs::write(&config.storage.shallow_path, journal).unwrap();

    let mut harvester = Harvester::from_config(&config).unwrap();
    harvester.load().unwrap();

    assert_eq!(harvester.shallow().len(), 1);
    assert!(!harvester.shallow().contains_key("2024-01-01"));
}

#[tokio::test]
async fn test_corrupt_middle_record_fails_load() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);

    std::fs::create_dir_all(config.storage.detail_path.parent().unwrap()).unwrap();
    std::fs::write(
        &config.storage.detail_path,
        "{\"https://a\":{}}\nnot json\n{\"https://b\":{}}\n",
    )
    .unwrap();

    let mut harvester = Harvester::from_config(&config).unwrap();
    assert!(matches!(
        harvester.load(),
        Err(StoreError::CorruptRecord { line: 2, .. })
    ));
}

#[tokio::test]
async fn test_open_reports_corrupt_journal_as_storage_error() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);

    std::fs::create_dir_all(config.storage.shallow_path.parent().unwrap()).unwrap();
    std::fs::write(
        &config.storage.shallow_path,
        "{\"2024-01-01\":[]}\n{\"2024-01-02\":\"oops\"}\n",
    )
    .unwrap();

    let err = match Harvester::open(&config) {
        Ok(_) => panic!("corrupt journal must not open"),
        Err(e) => e,
    };
    assert!(matches!(
        err,
        Error::Store(StoreError::CorruptRecord { line: 2, .. })
    ));
    assert_eq!(err.category(), ErrorCategory::Storage);
    assert_eq!(err.category().as_str(), "storage");
    assert!(!err.is_recoverable());
}
