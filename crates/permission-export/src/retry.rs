//! Retry utilities for metadata store calls.
//!
//! Only errors the store marks as retryable are retried; everything else is
//! returned on the first failure. Delays grow exponentially up to a cap.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::error::StoreResult;

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds
    pub initial_delay_ms: u64,

    /// Maximum delay between retries, in milliseconds
    pub max_delay_ms: u64,

    /// Base for exponential backoff (typically 2.0)
    pub exponential_base: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 200,
            max_delay_ms: 5_000,
            exponential_base: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a configuration that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay_ms: 0,
            max_delay_ms: 0,
            exponential_base: 1.0,
        }
    }

    /// Delay before the first retry.
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Delay that follows `delay`, capped at the maximum.
    ///
    /// A base below 1.0 or one that is not finite never shrinks the delay;
    /// [`RetryConfig::validate`] rejects such a base up front.
    pub fn next_delay(&self, delay: Duration) -> Duration {
        let max = Duration::from_millis(self.max_delay_ms);
        let base = if self.exponential_base.is_finite() {
            self.exponential_base.max(1.0)
        } else {
            1.0
        };
        Duration::try_from_secs_f64(delay.as_secs_f64() * base).map_or(max, |next| next.min(max))
    }

    /// Check that the settings describe a usable backoff.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1");
        }
        if !self.exponential_base.is_finite() || self.exponential_base < 1.0 {
            return Err("exponential_base must be a finite number of at least 1.0");
        }
        Ok(())
    }
}

/// Run a store call, retrying while it fails with a retryable error.
///
/// # Example
///
/// ```rust,no_run
/// use permission_export::retry::{with_store_retry, RetryConfig};
/// use permission_export::StoreResult;
///
/// async fn example() -> StoreResult<u32> {
///     with_store_retry(&RetryConfig::default(), "describe_object", || async { Ok(7) }).await
/// }
/// ```
pub async fn with_store_retry<F, Fut, T>(
    config: &RetryConfig,
    operation: &str,
    mut f: F,
) -> StoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay();

    loop {
        attempt += 1;

        match f().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(
                        operation,
                        attempts = attempt,
                        "Store call succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) if attempt >= config.max_attempts => {
                tracing::warn!(
                    operation,
                    attempts = attempt,
                    error = %e,
                    "Store call retries exhausted"
                );
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Store call failed, retrying"
                );
                sleep(delay).await;
                delay = config.next_delay(delay);
            }
        }
    }
}
