//! Mahiti-Harvest: an incremental scheme-portal harvester
//!
//! This crate walks a government-services portal (department → sub-department →
//! paginated scheme list → scheme detail → district/taluka dropdowns), reconciles
//! the structured API response with an HTML fallback, fans each scheme out across
//! its geography and persists deduplicated records that survive interrupted runs.

pub mod config;
pub mod crawler;
pub mod discovery;
pub mod extract;
pub mod model;
pub mod output;
pub mod robots;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for harvesting operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Scraping blocked by robots.txt for {url}")]
    RobotsDenied { url: String },

    #[error("Discovery error: {0}")]
    Discovery(#[from] discovery::DiscoveryError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Extraction failed for {url}")]
    Extraction { url: String },

    #[error("Geography fan-out failed: {0}")]
    FanOut(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: String, value: String },
}

/// Result type alias for harvesting operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, OutputFormat};
pub use crawler::{crawl, Coordinator};
pub use output::RunStats;
pub use model::{SchemeHandle, SchemeRecord, SubDepartment};
