//! Provider retry — bounded attempts with per-attempt timeouts and
//! exponential backoff.
//!
//! Wraps a single backend. Transient failures (network, timeout, rate limit,
//! 5xx) are retried up to `max_retries` times; everything else is returned
//! immediately.

use async_trait::async_trait;
use campusdesk_core::error::ProviderError;
use campusdesk_core::provider::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Timeout and retry limits for one backend.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Deadline for a single attempt
    pub timeout: Duration,
    /// Attempts after the first one
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each subsequent one
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based).
    pub fn backoff_for(&self, retry: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_retries: 2,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

/// A provider that retries the wrapped provider on transient failure.
pub struct RetryProvider {
    name: String,
    inner: Arc<dyn campusdesk_core::Provider>,
    policy: RetryPolicy,
}

impl RetryProvider {
    pub fn new(inner: Arc<dyn campusdesk_core::Provider>, policy: RetryPolicy) -> Self {
        Self {
            name: inner.name().to_string(),
            inner,
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl campusdesk_core::Provider for RetryProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let total = self.policy.max_retries + 1;
        let mut attempt = 0;

        loop {
            attempt += 1;

            let error = match tokio::time::timeout(
                self.policy.timeout,
                self.inner.complete(request.clone()),
            )
            .await
            {
                Ok(Ok(response)) => {
                    if attempt > 1 {
                        info!(provider = %self.name, attempt, "Retry: backend recovered");
                    }
                    return Ok(response);
                }
                Ok(Err(e)) => e,
                Err(_) => ProviderError::Timeout(format!(
                    "Provider '{}' timed out after {}s",
                    self.name,
                    self.policy.timeout.as_secs()
                )),
            };

            if !error.is_transient() || attempt >= total {
                warn!(
                    provider = %self.name,
                    attempt,
                    total,
                    error = %error,
                    "Retry: giving up"
                );
                return Err(error);
            }

            let delay = match &error {
                ProviderError::RateLimited { retry_after_secs } => self
                    .policy
                    .backoff_for(attempt)
                    .max(Duration::from_secs(*retry_after_secs)),
                _ => self.policy.backoff_for(attempt),
            };

            warn!(
                provider = %self.name,
                attempt,
                total,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retry: transient backend failure, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        self.inner.health_check().await
    }
}
