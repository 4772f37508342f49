use crate::config::types::Config;
use crate::config::validation::validate;
use crate::{ConfigError, ConfigResult};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Loads settings from defaults, an optional TOML file and the environment
///
/// # Arguments
///
/// * `path` - Optional path to a TOML file; missing keys keep their defaults
///
/// # Returns
///
/// * `Ok(Config)` - Loaded and validated settings
/// * `Err(ConfigError)` - Failed to read, parse, or validate
///
/// # Example
///
/// ```no_run
/// use mahiti_harvest::config::load_config;
///
/// let config = load_config(None).unwrap();
/// println!("Harvesting {}", config.base_url);
/// ```
pub fn load_config(path: Option<&Path>) -> ConfigResult<Config> {
    let config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => Config::default(),
    };

    let config = apply_env_overrides(config, |key| std::env::var(key).ok())?;
    validate(&config)?;

    Ok(config)
}

/// Applies the supported environment overrides through `lookup`
///
/// Recognized keys: `BASE_URL`, `HEADLESS`, `REQUEST_TIMEOUT`, `MAX_RETRIES`,
/// `RETRY_BACKOFF_SECONDS`, `RATE_LIMIT_PER_SECOND`, `USER_AGENT_FILE`.
pub fn apply_env_overrides<F>(mut config: Config, lookup: F) -> ConfigResult<Config>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(base_url) = lookup("BASE_URL") {
        config.base_url = base_url;
    }
    if let Some(headless) = lookup("HEADLESS") {
        config.headless = headless.trim().eq_ignore_ascii_case("true");
    }
    if let Some(value) = lookup("REQUEST_TIMEOUT") {
        config.request_timeout = parse_env("REQUEST_TIMEOUT", &value)?;
    }
    if let Some(value) = lookup("MAX_RETRIES") {
        config.max_retries = parse_env("MAX_RETRIES", &value)?;
    }
    if let Some(value) = lookup("RETRY_BACKOFF_SECONDS") {
        config.retry_backoff_seconds = parse_env("RETRY_BACKOFF_SECONDS", &value)?;
    }
    if let Some(value) = lookup("RATE_LIMIT_PER_SECOND") {
        config.rate_limit_per_second = parse_env("RATE_LIMIT_PER_SECOND", &value)?;
    }
    if let Some(path) = lookup("USER_AGENT_FILE") {
        config.user_agent_file = Some(PathBuf::from(path));
    }
    Ok(config)
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Computes a SHA-256 hash of the effective settings
///
/// Two runs with the same hash crawled with the same settings, which makes
/// the snapshot useful when comparing resumed runs.
pub fn compute_config_hash(config: &Config) -> ConfigResult<String> {
    let serialized = serde_json::to_vec(config)?;
    let mut hasher = Sha256::new();
    hasher.update(&serialized);
    Ok(hex::encode(hasher.finalize()))
}

#[derive(Serialize)]
struct RunSnapshot<'a> {
    base_url: &'a str,
    headless: bool,
    department: Option<&'a str>,
    district: Option<&'a str>,
    output_format: String,
    config_hash: String,
    written_at: String,
}

/// Writes `run_config.json` into the output root and returns its path
pub fn write_run_snapshot(config: &Config) -> ConfigResult<PathBuf> {
    std::fs::create_dir_all(&config.output_dir)?;

    let snapshot = RunSnapshot {
        base_url: &config.base_url,
        headless: config.headless,
        department: config.department.as_deref(),
        district: config.district.as_deref(),
        output_format: config.output_format.to_string(),
        config_hash: compute_config_hash(config)?,
        written_at: chrono::Utc::now().to_rfc3339(),
    };

    let path = config.output_dir.join("run_config.json");
    std::fs::write(&path, serde_json::to_string_pretty(&snapshot)?)?;
    Ok(path)
}
