//! Crawler coordinator - main harvest orchestration logic
//!
//! This module ties discovery, fetching, extraction and persistence together:
//! - Pre-flight robots gate and user-agent choice
//! - Sub-department and scheme walk in discovery order
//! - Structured fetch with markup fallback per scheme
//! - Bounded-concurrency geography fan-out
//! - Resume ledger bookkeeping

use crate::config::{write_run_snapshot, Config, UserAgentPool};
use crate::crawler::{FetchClient, RateLimiter, RetryPolicy};
use crate::discovery::{write_hints, ChromiumSession, DiscoveryAgent, IdlePolicy, RenderSession};
use crate::extract::{from_json_value, from_markup};
use crate::model::{resume_key, SchemeHandle, SchemeRecord, SubDepartment};
use crate::output::{ExtractionSource, RunStats};
use crate::robots::ensure_allowed;
use crate::state::ResumeLedger;
use crate::storage::{open_sink, PersistenceSink};
use crate::{HarvestError, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Ledger file inside the output root
pub const RESUME_FILE: &str = "resume_state.json";

/// Diagnostic capture file inside the output root
pub const HINTS_FILE: &str = "api_hints.jsonl";

/// Quiet window of the network-idle heuristic
const IDLE_QUIET: Duration = Duration::from_millis(500);

/// Identity and pacing settled before any work starts
#[derive(Debug, Clone)]
pub struct Preflight {
    pub user_agent: String,
    pub limiter: Arc<RateLimiter>,
}

/// Picks the run's user agent and checks it against robots.txt
///
/// A `Crawl-delay` for the agent widens the limiter interval.
///
/// # Errors
///
/// * `HarvestError::RobotsDenied` - The base address is disallowed; nothing was written
pub async fn preflight(config: &Config) -> Result<Preflight> {
    let pool = UserAgentPool::load(config.user_agent_file.as_deref());
    let user_agent = pool.pick();
    tracing::debug!("Using user agent {} (pool of {})", user_agent, pool.len());

    let base_url = Url::parse(&config.base_url)?;
    let robots = ensure_allowed(&base_url, &user_agent, config.request_timeout_duration()).await?;

    let limiter = Arc::new(RateLimiter::new(config.rate_limit_per_second));
    if let Some(delay) = robots.crawl_delay(&user_agent) {
        if delay.is_finite() && delay > 0.0 {
            limiter.widen(Duration::from_secs_f64(delay)).await;
            tracing::info!("robots.txt asks for a {}s crawl delay", delay);
        }
    }

    Ok(Preflight { user_agent, limiter })
}

/// Main harvest coordinator
pub struct Coordinator {
    config: Arc<Config>,
    base_url: Url,
    client: FetchClient,
    ledger: ResumeLedger,
    sink: Arc<PersistenceSink>,
    stats: RunStats,
}

/// Per-scheme fan-out tally
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct FanOut {
    written: u64,
    duplicates: u64,
    failed: u64,
}

impl Coordinator {
    /// Creates a coordinator for a run that already passed pre-flight
    ///
    /// Writes `run_config.json`, opens the resume ledger and every configured
    /// storage backend.
    pub fn new(config: Config, preflight: &Preflight) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)?;

        let snapshot = write_run_snapshot(&config)?;
        tracing::debug!("Wrote run snapshot to {}", snapshot.display());

        let ledger = ResumeLedger::open(&config.output_dir.join(RESUME_FILE))?;
        if !ledger.is_empty() {
            tracing::info!("Resuming: {} schemes already complete", ledger.len());
        }

        let sink = open_sink(&config)?;
        tracing::info!("Persisting to: {}", sink.backend_names().join(", "));

        let policy = RetryPolicy::new(config.max_retries, config.retry_backoff_duration());
        let client = FetchClient::new(
            &preflight.user_agent,
            config.request_timeout_duration(),
            policy,
            Arc::clone(&preflight.limiter),
        )?;

        Ok(Self {
            config: Arc::new(config),
            base_url,
            client,
            ledger,
            sink: Arc::new(sink),
            stats: RunStats::default(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Runs the harvest with `session` as the rendering browser
    ///
    /// The session is closed on every exit path. `api_hints.jsonl` is only
    /// written when the walk finished.
    pub async fn run<S: RenderSession>(&mut self, session: S) -> Result<RunStats> {
        let start = Instant::now();
        let mut agent = DiscoveryAgent::new(session, self.base_url.clone())
            .with_idle_policy(IdlePolicy {
                quiet: IDLE_QUIET,
                cap: self.config.idle_timeout_duration(),
            })
            .with_max_pages(self.config.max_pages);

        let outcome = self.harvest(&mut agent).await;
        let captures = agent.take_captures();
        if let Err(e) = agent.shutdown().await {
            tracing::warn!("Rendering session did not close cleanly: {}", e);
        }
        outcome?;

        let hints_path = self.config.output_dir.join(HINTS_FILE);
        write_hints(&hints_path, &captures)?;
        tracing::debug!("Wrote {} API hints to {}", captures.len(), hints_path.display());

        self.stats.log_summary(start.elapsed());
        Ok(self.stats.clone())
    }

    async fn harvest<S: RenderSession>(&mut self, agent: &mut DiscoveryAgent<S>) -> Result<()> {
        agent.open_home().await?;

        let mut sub_departments = agent.discover_sub_departments().await?;
        let discovered = sub_departments.len();
        sub_departments.retain(|entry| self.config.matches_department(&entry.department));
        if sub_departments.len() != discovered {
            tracing::info!(
                "Department filter kept {} of {} sub-departments",
                sub_departments.len(),
                discovered
            );
        }

        for (index, sub_department) in sub_departments.iter().enumerate() {
            tracing::info!(
                "[{}/{}] {} / {}",
                index + 1,
                sub_departments.len(),
                sub_department.department,
                sub_department.name
            );
            self.stats.sub_departments += 1;

            match agent.discover_schemes(&sub_department.url).await {
                Ok(schemes) => self.process_schemes(agent, sub_department, &schemes).await?,
                Err(e) => {
                    tracing::error!("Skipping sub-department {}: {}", sub_department.url, e);
                }
            }
        }

        Ok(())
    }

    /// Processes the schemes of one sub-department in order
    ///
    /// Only ledger write failures abort; everything else skips the scheme.
    async fn process_schemes<S: RenderSession>(
        &mut self,
        agent: &mut DiscoveryAgent<S>,
        sub_department: &SubDepartment,
        schemes: &[SchemeHandle],
    ) -> Result<()> {
        self.stats.schemes_discovered += schemes.len() as u64;

        for scheme in schemes {
            let key = resume_key(&sub_department.department, &sub_department.name, &scheme.detail_url);
            if self.ledger.is_done(&key) {
                tracing::debug!("Already complete: {}", key);
                self.stats.skipped_resumed += 1;
                continue;
            }

            match self.process_scheme(agent, sub_department, scheme).await {
                Ok(true) => self.ledger.mark_done(&key)?,
                Ok(false) => self.stats.failed += 1,
                Err(e) => {
                    tracing::error!("Skipping scheme {}: {}", scheme.detail_url, e);
                    self.stats.failed += 1;
                }
            }
        }

        Ok(())
    }

    /// Fetches, extracts and fans out one scheme
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - Every geography variant was persisted (or was a duplicate)
    /// * `Ok(false)` - Some variant failed to persist
    /// * `Err(HarvestError)` - Extraction or dropdown discovery failed
    async fn process_scheme<S: RenderSession>(
        &mut self,
        agent: &mut DiscoveryAgent<S>,
        sub_department: &SubDepartment,
        scheme: &SchemeHandle,
    ) -> Result<bool> {
        let record = self.fetch_scheme_detail(sub_department, scheme).await?;

        let (districts, talukas) = agent.extract_dropdown_values(&scheme.detail_url).await?;
        let districts: Vec<String> = districts
            .into_iter()
            .filter(|district| self.config.matches_district(district))
            .collect();

        let variants = geography_variants(&record, &districts, &talukas);
        let variant_count = variants.len();
        let outcome = self.expand_geographies(variants).await?;

        self.stats.records_written += outcome.written;
        self.stats.duplicates_suppressed += outcome.duplicates;

        if outcome.failed > 0 {
            tracing::error!(
                "{} of {} variants of {} failed to persist",
                outcome.failed,
                variant_count,
                record.scheme_name
            );
            return Ok(false);
        }

        tracing::debug!(
            "{}: {} written, {} duplicates",
            record.scheme_name,
            outcome.written,
            outcome.duplicates
        );
        Ok(true)
    }

    /// Builds the base record: structured response first, markup second
    ///
    /// The two sources are never merged.
    async fn fetch_scheme_detail(
        &mut self,
        sub_department: &SubDepartment,
        scheme: &SchemeHandle,
    ) -> Result<SchemeRecord> {
        let url = scheme.detail_url.as_str();
        let department = sub_department.department.as_str();
        let sub_name = sub_department.name.as_str();

        match self.client.fetch_json(url, &[]).await {
            Ok(value) => match from_json_value(&value, department, sub_name) {
                Some(record) => {
                    self.stats.record_extraction(ExtractionSource::Structured);
                    return Ok(record);
                }
                None => tracing::info!("Structured response for {} is not a record, parsing HTML", url),
            },
            Err(e) => tracing::info!("JSON endpoint not available for {} ({}), parsing HTML", url, e),
        }

        match self.client.fetch_text(url, &[]).await {
            Ok(html) => {
                self.stats.record_extraction(ExtractionSource::Markup);
                Ok(from_markup(&html, department, sub_name, &scheme.name))
            }
            Err(e) => {
                tracing::error!("Failed scheme detail extraction for {}: {}", url, e);
                Err(HarvestError::Extraction { url: url.to_string() })
            }
        }
    }

    /// Persists every variant with at most `max_parallel_districts` in flight
    ///
    /// All tasks are joined before returning, whatever their outcome.
    async fn expand_geographies(&self, variants: Vec<SchemeRecord>) -> Result<FanOut> {
        let permits = Arc::new(Semaphore::new(self.config.max_parallel_districts.max(1)));
        let mut tasks = JoinSet::new();

        for record in variants {
            let permit = Arc::clone(&permits)
                .acquire_owned()
                .await
                .map_err(|e| HarvestError::FanOut(e.to_string()))?;
            let sink = Arc::clone(&self.sink);

            tasks.spawn_blocking(move || {
                let _permit = permit;
                sink.persist(&record)
            });
        }

        let mut outcome = FanOut::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(true)) => outcome.written += 1,
                Ok(Ok(false)) => outcome.duplicates += 1,
                Ok(Err(e)) => {
                    tracing::warn!("Variant not persisted: {}", e);
                    outcome.failed += 1;
                }
                Err(e) => {
                    tracing::warn!("Persistence task aborted: {}", e);
                    outcome.failed += 1;
                }
            }
        }

        Ok(outcome)
    }
}

/// Expands a base record over its geography
///
/// No districts yields the base record alone; districts without talukas yield
/// one clone per district; otherwise the full district × taluka product.
pub fn geography_variants(base: &SchemeRecord, districts: &[String], talukas: &[String]) -> Vec<SchemeRecord> {
    if districts.is_empty() {
        return vec![base.clone()];
    }

    if talukas.is_empty() {
        return districts
            .iter()
            .map(|district| base.with_geography(district, ""))
            .collect();
    }

    districts
        .iter()
        .flat_map(|district| talukas.iter().map(move |taluka| base.with_geography(district, taluka)))
        .collect()
}

/// Runs a complete harvest against the live portal
///
/// This function orchestrates the entire run:
///
/// 1. Pick a user agent and pass the robots.txt gate
/// 2. Write the run snapshot, open the ledger and sinks
/// 3. Launch Chromium
/// 4. Walk sub-departments and schemes, fanning out geographies
/// 5. Export API hints and log the summary
///
/// # Example
///
/// ```no_run
/// use mahiti_harvest::config::load_config;
/// use mahiti_harvest::crawler::run_crawl;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(None)?;
/// let stats = run_crawl(config).await?;
/// println!("{} records written", stats.records_written);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<RunStats> {
    let preflight = preflight(&config).await?;
    let mut coordinator = Coordinator::new(config, &preflight)?;

    let session = ChromiumSession::launch(
        coordinator.config().headless,
        &preflight.user_agent,
        coordinator.config().request_timeout_duration(),
    )
    .await?;

    coordinator.run(session).await
}
