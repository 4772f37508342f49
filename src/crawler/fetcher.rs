//! Retrying HTTP fetch client
//!
//! This module handles every GET the harvester issues outside the rendering
//! browser:
//! - Building the HTTP client with the run's user agent and timeout
//! - Gating each attempt on the shared [`RateLimiter`]
//! - Retrying transient failures with linear backoff
//! - Decoding JSON or text bodies

use crate::crawler::rate_limiter::RateLimiter;
use reqwest::{Client, Response};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the fetch client once retries are exhausted
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Body from {url} is not JSON: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl FetchError {
    /// Whether another attempt could plausibly succeed
    ///
    /// | Condition | Retried |
    /// |-----------|---------|
    /// | Network error / timeout | yes |
    /// | Non-2xx status | yes |
    /// | Body is not JSON | yes |
    /// | Client construction | no |
    pub fn is_transient(&self) -> bool {
        !matches!(self, FetchError::Client(_))
    }
}

/// Attempt budget and linear backoff unit
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_retries: u32,
    /// Sleep `backoff * attempt` between attempts
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            backoff,
        }
    }

    /// Runs `op` until it succeeds, fails permanently, or the budget is spent
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, url: &str, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() || attempt >= self.max_retries => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        "Retrying {} after error (attempt {}/{}): {}",
                        url,
                        attempt,
                        self.max_retries,
                        e
                    );
                    tokio::time::sleep(self.backoff * attempt).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Rate-limited, retrying GET client for JSON and text bodies
#[derive(Debug, Clone)]
pub struct FetchClient {
    client: Client,
    limiter: Arc<RateLimiter>,
    policy: RetryPolicy,
}

impl FetchClient {
    /// Builds a client that identifies as `user_agent`
    pub fn new(
        user_agent: &str,
        timeout: Duration,
        policy: RetryPolicy,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self, FetchError> {
        let client = build_http_client(user_agent, timeout).map_err(FetchError::Client)?;
        Ok(Self {
            client,
            limiter,
            policy,
        })
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// GETs `url` and decodes the body as JSON
    pub async fn fetch_json(&self, url: &str, params: &[(&str, &str)]) -> Result<Value, FetchError> {
        self.policy
            .run(url, move |_| async move {
                let response = self.send(url, params).await?;
                let body = response.text().await.map_err(|source| FetchError::Request {
                    url: url.to_string(),
                    source,
                })?;
                serde_json::from_str(&body).map_err(|source| FetchError::Decode {
                    url: url.to_string(),
                    source,
                })
            })
            .await
    }

    /// GETs `url` and returns the body as text
    pub async fn fetch_text(&self, url: &str, params: &[(&str, &str)]) -> Result<String, FetchError> {
        self.policy
            .run(url, move |_| async move {
                let response = self.send(url, params).await?;
                response.text().await.map_err(|source| FetchError::Request {
                    url: url.to_string(),
                    source,
                })
            })
            .await
    }

    /// One gated attempt; non-2xx statuses become errors
    async fn send(&self, url: &str, params: &[(&str, &str)]) -> Result<Response, FetchError> {
        self.limiter.wait().await;

        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

/// Builds an HTTP client with the run's identity
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::ACCEPT,
        reqwest::header::HeaderValue::from_static("application/json, text/html"),
    );

    Client::builder()
        .user_agent(user_agent)
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}
