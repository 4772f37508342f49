use crate::config::types::Config;
use crate::ConfigError;
use url::Url;

/// Validates the effective settings
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_base_url(&config.base_url)?;
    validate_network(config)?;
    validate_crawl_bounds(config)?;
    Ok(())
}

fn validate_base_url(base_url: &str) -> Result<(), ConfigError> {
    let url = Url::parse(base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url '{}': {}", base_url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    Ok(())
}

fn validate_network(config: &Config) -> Result<(), ConfigError> {
    if !(config.request_timeout > 0.0) {
        return Err(ConfigError::Validation(format!(
            "request_timeout must be > 0, got {}",
            config.request_timeout
        )));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(
            "max_retries must be >= 1".to_string(),
        ));
    }

    if !(config.retry_backoff_seconds >= 0.0) {
        return Err(ConfigError::Validation(format!(
            "retry_backoff_seconds must be >= 0, got {}",
            config.retry_backoff_seconds
        )));
    }

    if !(config.rate_limit_per_second > 0.0) {
        return Err(ConfigError::Validation(format!(
            "rate_limit_per_second must be > 0, got {}",
            config.rate_limit_per_second
        )));
    }

    Ok(())
}

fn validate_crawl_bounds(config: &Config) -> Result<(), ConfigError> {
    if config.max_parallel_districts < 1 || config.max_parallel_districts > 64 {
        return Err(ConfigError::Validation(format!(
            "max_parallel_districts must be between 1 and 64, got {}",
            config.max_parallel_districts
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation("max_pages must be >= 1".to_string()));
    }

    if !(config.idle_timeout > 0.0) {
        return Err(ConfigError::Validation(format!(
            "idle_timeout must be > 0, got {}",
            config.idle_timeout
        )));
    }

    Ok(())
}
