//! Shared JSON GET with bounded retry.
//!
//! Only rate-limit (429) and timeout failures are retried, with the delay
//! doubling from `base_delay` up to `max_delay`. Every other failure ends the
//! call at once and is reported to callers as "not found".

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use super::{RemoteError, RemoteResult};
use crate::config::HttpConfig;

/// Retry schedule for transient failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&HttpConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.backoff_base_ms),
            max_delay: Duration::from_millis(config.backoff_max_ms),
        }
    }

    /// Delay before the retry that follows `attempt` (0-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// HTTP GET client shared by the catalog and label clients.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl HttpFetcher {
    /// Build a client with the configured timeout and user agent.
    pub fn new(config: &HttpConfig) -> RemoteResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            policy: RetryPolicy::from_config(config),
        })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GET and decode JSON, collapsing every failure to `None`.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Option<T> {
        match self.fetch_json(url, query).await {
            Ok(value) => Some(value),
            Err(RemoteError::NotFound) => {
                tracing::debug!(url, "remote: no matching record");
                None
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "remote: request failed, treating as not found");
                None
            }
        }
    }

    /// GET and decode JSON, retrying transient failures.
    ///
    /// Returns the last error once retries are exhausted.
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> RemoteResult<T> {
        let mut attempt = 0;
        loop {
            match self.attempt(url, query).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt + 1 < self.policy.max_attempts => {
                    let delay = self.policy.delay_after(attempt);
                    tracing::debug!(
                        url,
                        attempt = attempt + 1,
                        max_attempts = self.policy.max_attempts,
                        ?delay,
                        error = %e,
                        "remote: transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn attempt<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> RemoteResult<T> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(RemoteError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status));
        }

        response.json::<T>().await.map_err(RemoteError::from_reqwest)
    }
}

/// Map a non-success status to a remote error.
pub fn classify_status(status: StatusCode) -> RemoteError {
    match status {
        StatusCode::NOT_FOUND => RemoteError::NotFound,
        StatusCode::TOO_MANY_REQUESTS => RemoteError::RateLimited,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            RemoteError::Timeout(format!("HTTP {}", status.as_u16()))
        }
        other => RemoteError::Status(other.as_u16()),
    }
}
