//! Crawler module for fetching and harvest coordination
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching with retry logic
//! - Request pacing
//! - Overall harvest coordination

mod coordinator;
mod fetcher;
mod rate_limiter;

pub use coordinator::{geography_variants, preflight, run_crawl, Coordinator, Preflight, HINTS_FILE, RESUME_FILE};
pub use fetcher::{build_http_client, FetchClient, FetchError, RetryPolicy};
pub use rate_limiter::{RateLimiter, MIN_RATE_PER_SECOND};

use crate::config::Config;
use crate::output::RunStats;
use crate::Result;

/// Runs a complete harvest
///
/// This is the main entry point for starting a run. It will:
/// 1. Check robots.txt for the chosen user agent
/// 2. Open the resume ledger and storage backends
/// 3. Drive the rendering browser through the portal
/// 4. Fetch, extract and persist every scheme not yet complete
///
/// # Returns
///
/// * `Ok(RunStats)` - Harvest completed
/// * `Err(HarvestError)` - Pre-flight rejection or a fatal error
pub async fn crawl(config: Config) -> Result<RunStats> {
    run_crawl(config).await
}
