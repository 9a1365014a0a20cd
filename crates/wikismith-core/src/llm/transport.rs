//! Shared HTTP transport: rate limiting, retry and cancellation
//!
//! Every backend adapter sends its requests through a [`Transport`], so the
//! cross-cutting policy is identical regardless of wire format:
//! - a single-token bucket refilled at the configured requests-per-second
//! - linear backoff (`retry_delay * attempt`) for transport errors and 5xx
//! - 4xx responses are returned immediately, never retried
//! - one cancellation token covers the limiter wait, the backoff and the call

use crate::config::ProviderConfig;
use crate::error::{Result, WikismithError};
use reqwest::Method;
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// One logical request, independent of backend
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<Value>,
}

impl HttpRequest {
    /// JSON POST request
    pub fn post_json(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn bearer(self, token: Option<&str>) -> Self {
        match token {
            Some(token) => self.header("Authorization", format!("Bearer {}", token)),
            None => self,
        }
    }
}

/// Fully read response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Linear retry policy
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Wait before the given attempt (attempt 0 never waits)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// Token bucket with capacity 1
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(requests_per_second: f64) -> Self {
        let interval = if requests_per_second.is_finite() && requests_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / requests_per_second)
        } else {
            Duration::ZERO
        };
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for a token; returns false if cancelled first
    ///
    /// The slot is claimed only once it is due, so a cancelled waiter never
    /// holds one.
    pub async fn acquire(&self, cancel: &CancellationToken) -> bool {
        loop {
            if cancel.is_cancelled() {
                return false;
            }

            let now = Instant::now();
            let due = {
                let mut next = self.next_slot.lock().unwrap_or_else(|e| e.into_inner());
                match *next {
                    Some(at) if at > now => at,
                    _ => {
                        *next = Some(now + self.interval);
                        return true;
                    }
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = tokio::time::sleep_until(due) => {}
            }
        }
    }
}

/// HTTP transport shared by one adapter instance
pub struct Transport {
    provider: String,
    client: reqwest::Client,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl Transport {
    /// Create transport from provider configuration
    pub fn new(provider: &str, config: &ProviderConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(WikismithError::Http)?;

        Ok(Self {
            provider: provider.to_string(),
            client,
            limiter: RateLimiter::new(config.requests_per_second),
            retry: RetryPolicy {
                max_retries: config.max_retries,
                base_delay: config.retry_delay(),
            },
        })
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Send request and read the whole body
    pub async fn execute(
        &self,
        request: &HttpRequest,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse> {
        let response = self.send_with_retry(request, cancel).await?;
        let status = response.status().as_u16();

        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(WikismithError::Cancelled(self.provider.clone())),
            body = response.bytes() => body.map_err(|source| WikismithError::Transport {
                provider: self.provider.clone(),
                source,
            })?,
        };

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }

    /// Send request and hand back the successful response for incremental reads
    pub async fn execute_streaming(
        &self,
        request: &HttpRequest,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response> {
        self.send_with_retry(request, cancel).await
    }

    async fn send_with_retry(
        &self,
        request: &HttpRequest,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response> {
        let mut attempt: u32 = 0;

        loop {
            if attempt > 0 {
                let delay = self.retry.delay_for(attempt);
                tokio::select! {
                    _ = cancel.cancelled() => {
                        return Err(WikismithError::Cancelled(self.provider.clone()));
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            if !self.limiter.acquire(cancel).await {
                return Err(WikismithError::RateLimitExceeded(self.provider.clone()));
            }

            tracing::debug!(provider = %self.provider, attempt, url = %request.url, "Sending request");

            match self.send_once(request, cancel).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && attempt < self.retry.max_retries => {
                    tracing::warn!(
                        provider = %self.provider,
                        attempt,
                        max_retries = self.retry.max_retries,
                        "Request failed, retrying: {}",
                        err
                    );
                    attempt += 1;
                }
                Err(err) if err.is_retryable() => {
                    return Err(WikismithError::RetryExhausted {
                        provider: self.provider.clone(),
                        attempts: attempt + 1,
                        source: Box::new(err),
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send_once(
        &self,
        request: &HttpRequest,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response> {
        let mut builder = self.client.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(WikismithError::Cancelled(self.provider.clone())),
            response = builder.send() => response.map_err(|source| WikismithError::Transport {
                provider: self.provider.clone(),
                source,
            })?,
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // Drain the body so the connection can be reused
        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(WikismithError::Cancelled(self.provider.clone())),
            body = response.text() => body.unwrap_or_default(),
        };
        Err(WikismithError::Api {
            provider: self.provider.clone(),
            status: status.as_u16(),
            body,
        })
    }
}
