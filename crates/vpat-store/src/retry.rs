//! Retry policy with exponential backoff and jitter.
//!
//! Only idempotent writes (status patches) go through this; inserts would
//! duplicate rows on a blind retry.

use std::time::Duration;

use rand::Rng;
use tracing::{info_span, warn, Instrument};

use crate::error::{StoreError, StoreResult};
use crate::metrics::record_retry;

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Base delay for exponential backoff (in milliseconds).
    pub base_delay_ms: u64,
    /// Maximum delay cap (in milliseconds).
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 5000,
        }
    }
}

impl RetryConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_delay_ms: u64 = std::env::var("STORE_RETRY_BASE_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.base_delay_ms);

        let max_delay_ms: u64 = std::env::var("STORE_RETRY_MAX_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_delay_ms);

        Self {
            max_retries: defaults.max_retries,
            base_delay_ms,
            max_delay_ms: max_delay_ms.max(base_delay_ms),
        }
    }

    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

/// Execute an async operation with retry.
///
/// Retries on network errors, HTTP 429 (honoring Retry-After) and 5xx.
/// Any other failure is returned immediately.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, operation: &str, op: F) -> StoreResult<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = StoreResult<T>>,
{
    let mut last_error = None;

    for attempt in 0..=config.max_retries {
        let span = info_span!("store_retry", operation = %operation, attempt = attempt + 1);

        match op().instrument(span).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                let delay = calculate_delay(config, attempt, e.retry_after_ms());

                warn!(
                    operation = %operation,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Store operation failed, retrying: {}",
                    e
                );

                record_retry(operation);

                tokio::time::sleep(delay).await;
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or_else(|| StoreError::invalid_response("retry loop exhausted")))
}

/// Exponential backoff with full jitter, floored at the base delay.
fn calculate_delay(config: &RetryConfig, attempt: u32, retry_after_ms: Option<u64>) -> Duration {
    if let Some(after) = retry_after_ms {
        return Duration::from_millis(after.min(config.max_delay_ms));
    }

    let exp_delay = config
        .base_delay_ms
        .saturating_mul(2u64.saturating_pow(attempt));
    let capped_delay = exp_delay.min(config.max_delay_ms);

    let jittered = if capped_delay > 0 {
        rand::rng().random_range(0..=capped_delay)
    } else {
        0
    };

    Duration::from_millis(jittered.max(config.base_delay_ms))
}
