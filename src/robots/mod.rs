//! Robots.txt handling module
//!
//! The harvester checks the portal's published crawling policy once, before any
//! page is fetched or rendered, and aborts the run when the chosen user agent is
//! not allowed to crawl the base address.

mod parser;

pub use parser::ParsedRobots;

use crate::HarvestError;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Fetches and interprets `<base>/robots.txt`
///
/// # Status handling
///
/// | Response | Policy |
/// |----------|--------|
/// | 2xx | parse body |
/// | 401 / 403 | deny everything |
/// | other 4xx | allow everything |
/// | 5xx | deny everything |
/// | network failure | `HarvestError::Http` |
pub async fn fetch_robots(
    base_url: &Url,
    user_agent: &str,
    timeout: Duration,
) -> Result<ParsedRobots, HarvestError> {
    let robots_url = base_url.join("/robots.txt")?;

    let client = Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
        .map_err(|source| HarvestError::Http {
            url: robots_url.to_string(),
            source,
        })?;

    let response = client
        .get(robots_url.clone())
        .send()
        .await
        .map_err(|source| HarvestError::Http {
            url: robots_url.to_string(),
            source,
        })?;

    let status = response.status();
    if status.is_success() {
        let body = response.text().await.map_err(|source| HarvestError::Http {
            url: robots_url.to_string(),
            source,
        })?;
        return Ok(ParsedRobots::from_content(&body));
    }

    tracing::debug!("robots.txt at {} answered HTTP {}", robots_url, status);
    let policy = match status.as_u16() {
        401 | 403 => ParsedRobots::deny_all(),
        400..=499 => ParsedRobots::allow_all(),
        _ => ParsedRobots::deny_all(),
    };
    Ok(policy)
}

/// Pre-flight gate: fails with [`HarvestError::RobotsDenied`] when crawling is forbidden
pub async fn ensure_allowed(
    base_url: &Url,
    user_agent: &str,
    timeout: Duration,
) -> Result<ParsedRobots, HarvestError> {
    let robots = fetch_robots(base_url, user_agent, timeout).await?;

    if !robots.is_allowed(base_url.as_str(), user_agent) {
        return Err(HarvestError::RobotsDenied {
            url: base_url.to_string(),
        });
    }

    Ok(robots)
}
