//! Mahiti-Harvest main entry point
//!
//! This is the command-line interface for the scheme-portal harvester.

use anyhow::Context;
use clap::Parser;
use mahiti_harvest::config::{compute_config_hash, load_config, validate, Config, OutputFormat};
use mahiti_harvest::crawler::crawl;
use mahiti_harvest::HarvestError;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Mahiti-Harvest: an incremental scheme-portal harvester
///
/// Walks the portal's departments, sub-departments and schemes, fans every
/// scheme out across its districts and talukas, and resumes where an
/// interrupted run stopped.
#[derive(Parser, Debug)]
#[command(name = "mahiti-harvest")]
#[command(version)]
#[command(about = "An incremental scheme-portal harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Only visit departments whose name contains this text
    #[arg(long)]
    department: Option<String>,

    /// Only expand districts whose name contains this text
    #[arg(long)]
    district: Option<String>,

    /// Run the browser without a window
    #[arg(long, conflicts_with = "headed")]
    headless: bool,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// File formats to write
    #[arg(long, value_enum)]
    output_format: Option<OutputFormat>,

    /// Root folder for every artifact
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// SQLite database path
    #[arg(long, value_name = "PATH", conflicts_with = "no_sqlite")]
    sqlite_path: Option<PathBuf>,

    /// Disable the SQLite backend
    #[arg(long)]
    no_sqlite: bool,

    /// Concurrent persistence tasks per scheme
    #[arg(long, value_name = "N")]
    max_parallel_districts: Option<usize>,

    /// Validate settings and print them without harvesting
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Command-line flags win over file and environment settings
    fn apply(&self, mut config: Config) -> Config {
        if let Some(department) = &self.department {
            config.department = Some(department.clone());
        }
        if let Some(district) = &self.district {
            config.district = Some(district.clone());
        }
        if self.headless {
            config.headless = true;
        }
        if self.headed {
            config.headless = false;
        }
        if let Some(format) = self.output_format {
            config.output_format = format;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(path) = &self.sqlite_path {
            config.sqlite_path = Some(path.clone());
        }
        if self.no_sqlite {
            config.sqlite_path = None;
        }
        if let Some(n) = self.max_parallel_districts {
            config.max_parallel_districts = n;
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    if let Some(path) = &cli.config {
        tracing::info!("Loading configuration from: {}", path.display());
    }
    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    let config = cli.apply(config);
    validate(&config).context("Invalid command-line settings")?;

    let hash = compute_config_hash(&config)?;
    tracing::info!("Configuration ready (hash: {})", hash);

    if cli.dry_run {
        print_settings(&config);
        return Ok(());
    }

    handle_crawl(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("mahiti_harvest=info,warn"),
            1 => EnvFilter::new("mahiti_harvest=debug,info"),
            2 => EnvFilter::new("mahiti_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles --dry-run: shows the effective settings
fn print_settings(config: &Config) {
    println!("=== Mahiti-Harvest Dry Run ===\n");

    println!("Portal: {}", config.base_url);
    println!("  Headless: {}", config.headless);
    println!(
        "  Department filter: {}",
        config.department.as_deref().unwrap_or("(none)")
    );
    println!(
        "  District filter: {}",
        config.district.as_deref().unwrap_or("(none)")
    );

    println!("\nNetwork:");
    println!("  Request timeout: {}s", config.request_timeout);
    println!(
        "  Attempts: {} (backoff {}s)",
        config.max_retries, config.retry_backoff_seconds
    );
    println!("  Rate limit: {}/s", config.rate_limit_per_second);

    println!("\nOutput:");
    println!("  Directory: {}", config.output_dir.display());
    println!("  Format: {}", config.output_format);
    match &config.sqlite_path {
        Some(path) => println!("  SQLite: {}", path.display()),
        None => println!("  SQLite: disabled"),
    }
    println!("  Parallel districts: {}", config.max_parallel_districts);

    println!("\n✓ Configuration is valid");
}

/// Handles the main harvest operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Harvesting {} into {}",
        config.base_url,
        config.output_dir.display()
    );

    match crawl(config).await {
        Ok(stats) => {
            tracing::info!(
                "Harvest completed: {} records written",
                stats.records_written
            );
            Ok(())
        }
        Err(e @ HarvestError::RobotsDenied { .. }) => {
            tracing::error!("{}", e);
            Err(e.into())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
