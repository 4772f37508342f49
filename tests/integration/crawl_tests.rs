//! Integration tests for the harvester
//!
//! These tests use wiremock for the portal's HTTP side and a scripted
//! rendering session in place of Chromium, exercising full runs end-to-end.

mod support;

use mahiti_harvest::crawler::{preflight, Coordinator, FetchClient, FetchError, RateLimiter, RetryPolicy};
use mahiti_harvest::discovery::{ElementSnapshot, ScriptedPage, ScriptedSession};
use mahiti_harvest::model::SchemeRecord;
use mahiti_harvest::robots::ensure_allowed;
use mahiti_harvest::{crawl, HarvestError};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use support::*;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ALLOW_ALL: &str = "User-agent: *\nAllow: /";

async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn read_lines(path: &std::path::Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn ledger_keys(output_dir: &std::path::Path) -> Vec<String> {
    let path = output_dir.join("resume_state.json");
    if !path.exists() {
        return Vec::new();
    }
    let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    value["completed"]
        .as_array()
        .unwrap()
        .iter()
        .map(|key| key.as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_structured_scheme_fans_out_across_geography() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_robots(&server, ALLOW_ALL).await;
    mount_json(
        &server,
        "/scheme/1",
        json!({
            "schemeName": "Crop Insurance",
            "benefits": "Premium subsidy",
            "officialLinks": ["https://portal.test/apply", "https://portal.test/apply"]
        }),
    )
    .await;

    let detail_url = format!("{}/scheme/1", server.uri());
    let session = single_listing(&server, &[("Crop Insurance", "/scheme/1")])
        .page(
            &detail_url,
            detail_page(&["Bellary", "Mysuru", "Udupi"], &["North", "South"])
                .with_response(&format!("{}/api/scheme/1", server.uri()), Some(r#"{"id": 1}"#)),
        );
    let journal = session.journal();

    let config = test_config(&server.uri(), dir.path());
    let pre = preflight(&config).await.unwrap();
    let mut coordinator = Coordinator::new(config, &pre).unwrap();
    let stats = coordinator.run(session).await.unwrap();

    assert_eq!(stats.sub_departments, 1);
    assert_eq!(stats.schemes_discovered, 1);
    assert_eq!(stats.extracted_structured, 1);
    assert_eq!(stats.records_written, 6);
    assert_eq!(stats.failed, 0);

    assert_eq!(sqlite_rows(&dir.path().join("schemes.db")), 6);
    let csv_lines = read_lines(&dir.path().join("Agriculture").join("Crop_Insurance.csv"));
    assert_eq!(csv_lines.len(), 7);
    let json_lines = read_lines(&dir.path().join("Agriculture").join("Crop_Insurance.json"));
    assert_eq!(json_lines.len(), 6);

    let record: SchemeRecord = serde_json::from_str(&json_lines[0]).unwrap();
    assert_eq!(record.department_name, "Agriculture");
    assert_eq!(record.sub_department_name, "Crop");
    assert_eq!(record.benefits, "Premium subsidy");
    assert_eq!(record.official_links, vec!["https://portal.test/apply"]);

    assert_eq!(ledger_keys(dir.path()), vec![format!("Agriculture|Crop|{}", detail_url)]);
    assert!(dir.path().join("run_config.json").exists());
    let hints = read_lines(&dir.path().join("api_hints.jsonl"));
    assert_eq!(hints.len(), 1);
    assert!(journal.closed());
}

#[tokio::test]
async fn test_markup_fallback_when_structured_source_is_html() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_robots(&server, ALLOW_ALL).await;
    Mock::given(method("GET"))
        .and(path("/scheme/2"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(
                    r#"<html><body>
                    <div>Eligibility: Must be a farmer</div>
                    <div>Benefits - Free seeds</div>
                    <a href="/apply">Apply</a><a href="/apply">Apply again</a>
                    </body></html>"#,
                ),
        )
        // three JSON attempts, then one text fetch
        .expect(4)
        .mount(&server)
        .await;

    let session = single_listing(&server, &[("Seed Subsidy", "/scheme/2")]);
    let config = test_config(&server.uri(), dir.path());
    let pre = preflight(&config).await.unwrap();
    let mut coordinator = Coordinator::new(config, &pre).unwrap();
    let stats = coordinator.run(session).await.unwrap();

    assert_eq!(stats.extracted_markup, 1);
    assert_eq!(stats.extracted_structured, 0);
    assert_eq!(stats.records_written, 1);

    let lines = read_lines(&dir.path().join("Agriculture").join("Seed_Subsidy.json"));
    let record: SchemeRecord = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(record.scheme_name, "Seed Subsidy");
    assert_eq!(record.eligibility_criteria, "Must be a farmer");
    assert_eq!(record.benefits, "Free seeds");
    assert!(record.district.is_empty());
    assert_eq!(record.official_links, vec!["/apply"]);
}

#[tokio::test]
async fn test_districts_without_talukas() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_robots(&server, ALLOW_ALL).await;
    mount_json(&server, "/scheme/1", json!([{ "name": "Crop Insurance" }])).await;

    let detail_url = format!("{}/scheme/1", server.uri());
    let session = single_listing(&server, &[("Crop Insurance", "/scheme/1")])
        .page(&detail_url, detail_page(&["Bellary", "Mysuru", "Udupi"], &[]));

    let config = test_config(&server.uri(), dir.path());
    let pre = preflight(&config).await.unwrap();
    let mut coordinator = Coordinator::new(config, &pre).unwrap();
    let stats = coordinator.run(session).await.unwrap();

    assert_eq!(stats.records_written, 3);
    assert_eq!(sqlite_rows(&dir.path().join("schemes.db")), 3);
}

#[tokio::test]
async fn test_completed_ledger_means_zero_fetches() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_robots(&server, ALLOW_ALL).await;
    Mock::given(method("GET"))
        .and(path("/scheme/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "x"})))
        .expect(0)
        .mount(&server)
        .await;

    let key = format!("Agriculture|Crop|{}/scheme/1", server.uri());
    std::fs::write(
        dir.path().join("resume_state.json"),
        json!({ "completed": [key] }).to_string(),
    )
    .unwrap();

    let session = single_listing(&server, &[("Crop Insurance", "/scheme/1")]);
    let journal = session.journal();
    let config = test_config(&server.uri(), dir.path());
    let pre = preflight(&config).await.unwrap();
    let mut coordinator = Coordinator::new(config, &pre).unwrap();
    let stats = coordinator.run(session).await.unwrap();

    assert_eq!(stats.skipped_resumed, 1);
    assert_eq!(stats.records_written, 0);
    assert!(!journal.visits().contains(&format!("{}/scheme/1", server.uri())));
}

#[tokio::test]
async fn test_robots_disallow_aborts_before_writing() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_robots(&server, "User-agent: *\nDisallow: /").await;

    let config = test_config(&server.uri(), dir.path());
    let result = crawl(config).await;

    assert!(matches!(result, Err(HarvestError::RobotsDenied { .. })));
    assert!(!dir.path().join("run_config.json").exists());
    assert!(!dir.path().join("resume_state.json").exists());
    assert!(!dir.path().join("schemes.db").exists());
}

#[tokio::test]
async fn test_duplicate_variants_written_once() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_robots(&server, ALLOW_ALL).await;
    mount_json(&server, "/scheme/1", json!({ "schemeName": "Crop Insurance" })).await;

    let detail_url = format!("{}/scheme/1", server.uri());
    let session = single_listing(&server, &[("Crop Insurance", "/scheme/1")])
        .page(&detail_url, detail_page(&["Bellary", "BELLARY"], &[]));

    let config = test_config(&server.uri(), dir.path());
    let pre = preflight(&config).await.unwrap();
    let mut coordinator = Coordinator::new(config, &pre).unwrap();
    let stats = coordinator.run(session).await.unwrap();

    assert_eq!(stats.records_written, 1);
    assert_eq!(stats.duplicates_suppressed, 1);
    assert_eq!(sqlite_rows(&dir.path().join("schemes.db")), 1);
    let csv_lines = read_lines(&dir.path().join("Agriculture").join("Crop_Insurance.csv"));
    assert_eq!(csv_lines.len(), 2);
}

#[tokio::test]
async fn test_district_filter_limits_fan_out() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_robots(&server, ALLOW_ALL).await;
    mount_json(&server, "/scheme/1", json!({ "schemeName": "Crop Insurance" })).await;

    let detail_url = format!("{}/scheme/1", server.uri());
    let session = single_listing(&server, &[("Crop Insurance", "/scheme/1")])
        .page(&detail_url, detail_page(&["Bellary", "Mysuru"], &["Hospet", "Sandur"]));

    let mut config = test_config(&server.uri(), dir.path());
    config.district = Some("bell".to_string());
    let pre = preflight(&config).await.unwrap();
    let mut coordinator = Coordinator::new(config, &pre).unwrap();
    let stats = coordinator.run(session).await.unwrap();

    assert_eq!(stats.records_written, 2);
    let lines = read_lines(&dir.path().join("Agriculture").join("Crop_Insurance.json"));
    assert!(lines
        .iter()
        .map(|line| serde_json::from_str::<SchemeRecord>(line).unwrap())
        .all(|record| record.district == "Bellary"));
}

#[tokio::test]
async fn test_department_filter_skips_other_departments() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_robots(&server, ALLOW_ALL).await;
    mount_json(&server, "/scheme/health", json!({ "schemeName": "Clinic Grant" })).await;
    Mock::given(method("GET"))
        .and(path("/scheme/farm"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let home = ScriptedPage::new().with_elements(
        SUB_DEPARTMENT_SELECTOR,
        vec![
            sub_department_link("Agriculture", "Crop", "/subdepartment/farm"),
            sub_department_link("Health & Family Welfare", "Clinics", "/subdepartment/health"),
        ],
    );
    let session = ScriptedSession::new()
        .page(&home_url(&server), home)
        .page(
            &format!("{}/subdepartment/farm", server.uri()),
            ScriptedPage::new().with_elements(SCHEME_SELECTOR, vec![ElementSnapshot::link("Farm", "/scheme/farm")]),
        )
        .page(
            &format!("{}/subdepartment/health", server.uri()),
            ScriptedPage::new().with_elements(SCHEME_SELECTOR, vec![ElementSnapshot::link("Clinic Grant", "/scheme/health")]),
        );

    let mut config = test_config(&server.uri(), dir.path());
    config.department = Some("HEALTH".to_string());
    let pre = preflight(&config).await.unwrap();
    let mut coordinator = Coordinator::new(config, &pre).unwrap();
    let stats = coordinator.run(session).await.unwrap();

    assert_eq!(stats.sub_departments, 1);
    assert_eq!(stats.records_written, 1);
}

#[tokio::test]
async fn test_stalled_detail_page_is_retried_next_run() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_robots(&server, ALLOW_ALL).await;
    mount_json(&server, "/scheme/1", json!({ "schemeName": "Crop Insurance" })).await;
    let detail_url = format!("{}/scheme/1", server.uri());

    let config = test_config(&server.uri(), dir.path());
    let pre = preflight(&config).await.unwrap();

    let stalled = single_listing(&server, &[("Crop Insurance", "/scheme/1")]).failing(&detail_url);
    let mut first = Coordinator::new(config.clone(), &pre).unwrap();
    let stats = first.run(stalled).await.unwrap();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.records_written, 0);
    assert!(ledger_keys(dir.path()).is_empty());

    let healthy = single_listing(&server, &[("Crop Insurance", "/scheme/1")]);
    let mut second = Coordinator::new(config, &pre).unwrap();
    let stats = second.run(healthy).await.unwrap();
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.records_written, 1);
    assert_eq!(ledger_keys(dir.path()).len(), 1);
}

#[tokio::test]
async fn test_unreachable_scheme_is_skipped() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_robots(&server, ALLOW_ALL).await;
    Mock::given(method("GET"))
        .and(path("/scheme/gone"))
        .respond_with(ResponseTemplate::new(503))
        .expect(6)
        .mount(&server)
        .await;

    let session = single_listing(&server, &[("Gone", "/scheme/gone")]);
    let config = test_config(&server.uri(), dir.path());
    let pre = preflight(&config).await.unwrap();
    let mut coordinator = Coordinator::new(config, &pre).unwrap();
    let stats = coordinator.run(session).await.unwrap();

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.extracted(), 0);
    assert!(ledger_keys(dir.path()).is_empty());
}

fn fetch_client(max_retries: u32) -> FetchClient {
    FetchClient::new(
        "TestAgent/1.0",
        Duration::from_secs(5),
        RetryPolicy::new(max_retries, Duration::ZERO),
        Arc::new(RateLimiter::new(1000.0)),
    )
    .unwrap()
}

#[tokio::test]
async fn test_fetch_client_retries_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/scheme"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_json(&server, "/api/scheme", json!({ "ok": true })).await;

    let value = fetch_client(3)
        .fetch_json(&format!("{}/api/scheme", server.uri()), &[("id", "7")])
        .await
        .unwrap();

    assert_eq!(value["ok"], true);
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].url.query(), Some("id=7"));
}

#[tokio::test]
async fn test_fetch_client_retries_non_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/s"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>warming up</html>"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_json(&server, "/s", json!({ "schemeName": "X" })).await;

    let value = fetch_client(3)
        .fetch_json(&format!("{}/s", server.uri()), &[])
        .await
        .unwrap();

    assert_eq!(value["schemeName"], "X");
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_fetch_client_gives_up_after_max_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = fetch_client(3)
        .fetch_text(&format!("{}/scheme/1", server.uri()), &[])
        .await;

    assert!(matches!(result, Err(FetchError::Status { status: 503, .. })));
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_robots_status_codes() {
    let server = MockServer::start().await;
    let base = url::Url::parse(&server.uri()).unwrap();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    assert!(ensure_allowed(&base, "TestAgent/1.0", Duration::from_secs(5)).await.is_ok());
    assert!(matches!(
        ensure_allowed(&base, "TestAgent/1.0", Duration::from_secs(5)).await,
        Err(HarvestError::RobotsDenied { .. })
    ));
}

#[tokio::test]
async fn test_crawl_delay_widens_rate_limit() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_robots(&server, "User-agent: *\nCrawl-delay: 2\nAllow: /").await;

    let config = test_config(&server.uri(), dir.path());
    let pre = preflight(&config).await.unwrap();

    assert_eq!(pre.limiter.interval().await, Duration::from_secs(2));
}
