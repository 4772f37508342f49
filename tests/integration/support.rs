//! Shared fixtures for the harvest integration tests

use mahiti_harvest::config::Config;
use mahiti_harvest::discovery::{ElementSnapshot, ScriptedPage, ScriptedSession};
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SCHEME_SELECTOR: &str = "a[href*='scheme'], .scheme-card a, .scheme-list a";
pub const SUB_DEPARTMENT_SELECTOR: &str = "a[href*='subdepartment']";
pub const DISTRICT_SELECTOR: &str = "select[name*='district']";
pub const TALUKA_SELECTOR: &str = "select[name*='taluka']";

/// Settings pointed at the mock portal, with no pacing or backoff
pub fn test_config(base_url: &str, output_dir: &Path) -> Config {
    Config {
        base_url: base_url.to_string(),
        output_dir: output_dir.to_path_buf(),
        sqlite_path: Some(output_dir.join("schemes.db")),
        user_agent_file: None,
        request_timeout: 5.0,
        max_retries: 3,
        retry_backoff_seconds: 0.0,
        rate_limit_per_second: 1000.0,
        idle_timeout: 1.0,
        ..Config::default()
    }
}

pub async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Landing page address as the discovery agent navigates to it
pub fn home_url(server: &MockServer) -> String {
    format!("{}/", server.uri())
}

pub fn sub_department_link(department: &str, name: &str, href: &str) -> ElementSnapshot {
    let mut link = ElementSnapshot::link(name, href);
    link.attributes
        .insert("data-department".to_string(), department.to_string());
    link
}

/// A portal with one sub-department listing the given schemes
///
/// Each scheme is `(name, href)`; hrefs are relative to the server root.
pub fn single_listing(server: &MockServer, schemes: &[(&str, &str)]) -> ScriptedSession {
    let home = ScriptedPage::new().with_elements(
        SUB_DEPARTMENT_SELECTOR,
        vec![sub_department_link("Agriculture", "Crop", "/subdepartment/1")],
    );
    let listing = ScriptedPage::new().with_elements(
        SCHEME_SELECTOR,
        schemes
            .iter()
            .map(|(name, href)| ElementSnapshot::link(name, href))
            .collect(),
    );

    ScriptedSession::new()
        .page(&home_url(server), home)
        .page(&format!("{}/subdepartment/1", server.uri()), listing)
}

/// Detail page state offering the given dropdown options
pub fn detail_page(districts: &[&str], talukas: &[&str]) -> ScriptedPage {
    let mut page = ScriptedPage::new();
    if !districts.is_empty() {
        let mut labels = vec!["Select District"];
        labels.extend_from_slice(districts);
        page = page.with_options(DISTRICT_SELECTOR, labels);
    }
    if !talukas.is_empty() {
        let mut labels = vec!["Select Taluka"];
        labels.extend_from_slice(talukas);
        page = page.with_options(TALUKA_SELECTOR, labels);
    }
    page
}

pub fn sqlite_rows(db: &Path) -> i64 {
    let conn = rusqlite::Connection::open(db).unwrap();
    conn.query_row("SELECT COUNT(*) FROM schemes", [], |row| row.get(0))
        .unwrap()
}
