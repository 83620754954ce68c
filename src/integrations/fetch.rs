use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::rate_limit::HostRateLimiter;
use crate::{
    config::Config,
    constants::{
        FETCH_MAX_ATTEMPTS, FETCH_MAX_RETRY_AFTER_SECS, FETCH_RETRY_DELAY_MS, FETCH_TIMEOUT_SECS,
    },
    error::{AppError, Result},
};

pub type ResponseValidator = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

#[derive(Clone, Default)]
pub struct FetchOptions {
    pub timeout: Option<Duration>,
    pub validator: Option<ResponseValidator>,
}

impl FetchOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub timeout: Duration,
    pub max_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: FETCH_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(FETCH_RETRY_DELAY_MS),
            timeout: Duration::from_secs(FETCH_TIMEOUT_SECS),
            max_retry_after: Duration::from_secs(FETCH_MAX_RETRY_AFTER_SECS),
        }
    }
}

impl RetryPolicy {
    /// Linear backoff: `attempt * base_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Wait after a 429: the advertised `Retry-After`, capped, else backoff.
    pub fn rate_limited_delay(&self, retry_after: Option<Duration>, attempt: u32) -> Duration {
        match retry_after {
            Some(wait) => wait.min(self.max_retry_after),
            None => self.delay_for(attempt),
        }
    }
}

enum AttemptError {
    RateLimited {
        retry_after: Option<Duration>,
        error: AppError,
    },
    Failed(AppError),
}

/// HTTP GET with bounded retries, per-attempt timeout and JSON validation.
#[derive(Clone)]
pub struct FetchClient {
    client: Client,
    policy: RetryPolicy,
    limiter: Option<Arc<HostRateLimiter>>,
}

impl FetchClient {
    pub fn new(policy: RetryPolicy, rate_limit_per_host_rps: Option<u32>) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(4))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client: {}", e);
                Client::new()
            });

        Self {
            client,
            policy,
            limiter: rate_limit_per_host_rps.map(|rps| Arc::new(HostRateLimiter::new(rps))),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let policy = RetryPolicy {
            max_attempts: config.fetch_max_attempts.max(1),
            base_delay: config.fetch_retry_delay(),
            timeout: config.fetch_timeout(),
            ..RetryPolicy::default()
        };
        Self::new(policy, config.rate_limit_per_host_rps)
    }

    pub async fn get_json(&self, url: &str, options: &FetchOptions) -> Result<Value> {
        let timeout = options.timeout.unwrap_or(self.policy.timeout);
        let max_attempts = self.policy.max_attempts.max(1);
        let host = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string));

        let mut last_error = None;
        for attempt in 1..=max_attempts {
            if let (Some(limiter), Some(host)) = (&self.limiter, host.as_deref()) {
                limiter.acquire(host).await;
            }

            let delay = match self.attempt(url, timeout, options).await {
                Ok(value) => return Ok(value),
                Err(AttemptError::RateLimited { retry_after, error }) => {
                    last_error = Some(error);
                    self.policy.rate_limited_delay(retry_after, attempt)
                }
                Err(AttemptError::Failed(error)) => {
                    last_error = Some(error);
                    self.policy.delay_for(attempt)
                }
            };

            if attempt < max_attempts {
                if let Some(error) = &last_error {
                    tracing::warn!(
                        "GET {} failed (attempt {}/{}): {}; retrying in {:?}",
                        url,
                        attempt,
                        max_attempts,
                        error,
                        delay
                    );
                }
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error
            .unwrap_or_else(|| AppError::Network(format!("GET {} failed without a response", url))))
    }

    /// Like [`get_json`](Self::get_json) but deserializes into `T`.
    pub async fn get_typed<T: DeserializeOwned>(&self, url: &str, options: &FetchOptions) -> Result<T> {
        let value = self.get_json(url, options).await?;
        serde_json::from_value(value).map_err(|e| {
            AppError::Validation(format!("Unexpected response shape from {}: {}", url, e))
        })
    }

    async fn attempt(
        &self,
        url: &str,
        timeout: Duration,
        options: &FetchOptions,
    ) -> std::result::Result<Value, AttemptError> {
        let request = async {
            let response = self
                .client
                .get(url)
                .header(header::ACCEPT, "application/json")
                .send()
                .await
                .map_err(|e| AttemptError::Failed(e.into()))?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = response
                    .headers()
                    .get(header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .map(Duration::from_secs);
                return Err(AttemptError::RateLimited {
                    retry_after,
                    error: AppError::Network(format!("Rate limited by {}", url)),
                });
            }
            if !status.is_success() {
                return Err(AttemptError::Failed(AppError::Network(format!(
                    "HTTP {} from {}",
                    status, url
                ))));
            }

            let is_json = response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.contains("application/json"));
            if !is_json {
                return Err(AttemptError::Failed(AppError::Validation(format!(
                    "Expected JSON from {}",
                    url
                ))));
            }

            let body = response
                .text()
                .await
                .map_err(|e| AttemptError::Failed(e.into()))?;
            serde_json::from_str::<Value>(&body).map_err(|e| AttemptError::Failed(e.into()))
        };

        let value = tokio::time::timeout(timeout, request)
            .await
            .map_err(|_| {
                AttemptError::Failed(AppError::Network(format!(
                    "GET {} timed out after {:?}",
                    url, timeout
                )))
            })??;

        if let Some(validator) = &options.validator {
            if !validator(&value) {
                return Err(AttemptError::Failed(AppError::Validation(format!(
                    "Response from {} failed validation",
                    url
                ))));
            }
        }

        Ok(value)
    }
}

#[cfg(test)]
pub(crate) fn fast_client(max_attempts: u32) -> FetchClient {
    FetchClient::new(
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(10),
            timeout: Duration::from_secs(2),
            max_retry_after: Duration::from_secs(3),
        },
        None,
    )
}
