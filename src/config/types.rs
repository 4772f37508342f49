use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default portal address
pub const DEFAULT_BASE_URL: &str = "https://mahitikanaja.karnataka.gov.in";

/// Effective settings for one harvesting run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Portal landing page
    pub base_url: String,

    /// Root folder for every artifact written by a run
    pub output_dir: PathBuf,

    /// Run the rendering browser without a window
    pub headless: bool,

    /// Case-insensitive substring filter on department names
    pub department: Option<String>,

    /// Case-insensitive substring filter on district names
    pub district: Option<String>,

    pub output_format: OutputFormat,

    /// Per-attempt request timeout (seconds)
    pub request_timeout: f64,

    /// Total attempts per fetch, including the first one
    pub max_retries: u32,

    /// Linear backoff unit between attempts (seconds)
    pub retry_backoff_seconds: f64,

    /// Outbound request cadence
    pub rate_limit_per_second: f64,

    /// Concurrent persistence tasks per scheme fan-out
    pub max_parallel_districts: usize,

    /// SQLite database; `None` disables the relational backend
    pub sqlite_path: Option<PathBuf>,

    /// Optional newline-separated user-agent pool
    pub user_agent_file: Option<PathBuf>,

    /// Safety ceiling on listing pagination
    pub max_pages: u32,

    /// Upper bound on a single network-idle wait (seconds)
    pub idle_timeout: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            output_dir: PathBuf::from("data"),
            headless: true,
            department: None,
            district: None,
            output_format: OutputFormat::Both,
            request_timeout: 30.0,
            max_retries: 3,
            retry_backoff_seconds: 1.5,
            rate_limit_per_second: 2.0,
            max_parallel_districts: 4,
            sqlite_path: Some(PathBuf::from("data/schemes.db")),
            user_agent_file: Some(PathBuf::from("user_agents.txt")),
            max_pages: 200,
            idle_timeout: 30.0,
        }
    }
}

impl Config {
    pub fn request_timeout_duration(&self) -> Duration {
        Duration::from_secs_f64(self.request_timeout)
    }

    pub fn retry_backoff_duration(&self) -> Duration {
        Duration::from_secs_f64(self.retry_backoff_seconds)
    }

    pub fn idle_timeout_duration(&self) -> Duration {
        Duration::from_secs_f64(self.idle_timeout)
    }

    /// True when `department` passes the configured department filter
    pub fn matches_department(&self, department: &str) -> bool {
        contains_ignore_case(department, self.department.as_deref())
    }

    /// True when `district` passes the configured district filter
    pub fn matches_district(&self, district: &str) -> bool {
        contains_ignore_case(district, self.district.as_deref())
    }
}

fn contains_ignore_case(value: &str, filter: Option<&str>) -> bool {
    match filter {
        Some(needle) => value.to_lowercase().contains(&needle.to_lowercase()),
        None => true,
    }
}

/// Which flat-file formats receive records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Csv,
    Both,
}

impl OutputFormat {
    pub fn writes_json(self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::Both)
    }

    pub fn writes_csv(self) -> bool {
        matches!(self, OutputFormat::Csv | OutputFormat::Both)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Both => "both",
        };
        f.write_str(name)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "both" => Ok(OutputFormat::Both),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}
