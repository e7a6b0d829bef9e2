// rust/elastic-core/src/retry.rs

//! Retry policy for rendezvous backend calls.
//!
//! Transient backend failures (`BackendUnavailable`) are retried locally with
//! exponential backoff and jitter. Once the attempt budget is spent the last
//! error is returned to the caller, where it becomes fatal.

use std::future::Future;
use std::time::Duration;

use crate::config::RetrySettings;
use crate::error::{ElasticError, Result};

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Backoff multiplier (e.g., 2.0 for exponential backoff).
    pub backoff_multiplier: f64,
    /// Whether to add random jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            initial_delay: Duration::from_millis(settings.initial_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Creates a retry configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Calculates the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt >= self.max_retries {
            return Duration::ZERO;
        }

        let base_delay =
            self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);

        let delay_secs = base_delay.min(self.max_delay.as_secs_f64());

        let final_delay = if self.jitter {
            // Add up to 25% jitter
            let jitter_factor = 1.0 + (rand_simple(attempt) * 0.25);
            delay_secs * jitter_factor
        } else {
            delay_secs
        };

        Duration::from_secs_f64(final_delay)
    }

    /// Returns true if more retries are allowed for the given attempt.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

/// Deterministic pseudo-random value in [0, 1) seeded by the attempt number.
fn rand_simple(seed: u32) -> f64 {
    let x = seed.wrapping_mul(1103515245).wrapping_add(12345);
    (x as f64) / (u32::MAX as f64)
}

/// Represents a retryable operation result.
#[derive(Debug)]
pub enum RetryResult<T, E> {
    /// Operation succeeded.
    Ok(T),
    /// Operation failed but can be retried.
    Retry(E),
    /// Operation failed and should not be retried.
    Fail(E),
}

impl<T, E> RetryResult<T, E> {
    /// Returns true if the operation should be retried.
    pub fn should_retry(&self) -> bool {
        matches!(self, Self::Retry(_))
    }

    /// Converts to a standard Result, discarding retry information.
    pub fn into_result(self) -> std::result::Result<T, E> {
        match self {
            Self::Ok(v) => Ok(v),
            Self::Retry(e) | Self::Fail(e) => Err(e),
        }
    }
}

impl<T> From<Result<T>> for RetryResult<T, ElasticError> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(e) if e.is_transient() => Self::Retry(e),
            Err(e) => Self::Fail(e),
        }
    }
}

/// Execute an async operation with retries.
pub async fn retry_async<T, E, F, Fut>(config: &RetryConfig, mut operation: F) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RetryResult<T, E>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            RetryResult::Ok(value) => return Ok(value),
            RetryResult::Fail(error) => return Err(error),
            RetryResult::Retry(error) => {
                if !config.should_retry(attempt) {
                    return Err(error);
                }

                let delay = config.delay_for_attempt(attempt);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Execute a backend call, retrying while it fails with a transient error.
pub async fn retry_transient<T, F, Fut>(config: &RetryConfig, what: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    retry_async(config, || {
        attempt += 1;
        let call = operation();
        let current = attempt;
        async move {
            let result = RetryResult::from(call.await);
            if let RetryResult::Retry(e) = &result {
                tracing::warn!(attempt = current, operation = what, error = %e, "transient backend error, retrying");
            }
            result
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryConfig {
        RetryConfig {
            max_retries: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }

    #[test]
    fn test_default_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.initial_delay, Duration::from_millis(100));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert!(config.jitter);
    }

    #[test]
    fn test_no_retry() {
        let config = RetryConfig::no_retry();
        assert!(!config.should_retry(0));
    }

    #[test]
    fn test_delay_for_attempt() {
        let config = RetryConfig {
            max_retries: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: false,
        };

        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(config.delay_for_attempt(5), Duration::ZERO);
    }

    #[test]
    fn test_delay_respects_max() {
        let config = RetryConfig {
            max_retries: 10,
            initial_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: false,
        };

        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(30));
        assert_eq!(config.delay_for_attempt(5), Duration::from_secs(30));
    }

    #[test]
    fn test_from_settings() {
        let settings = RetrySettings {
            max_retries: 3,
            initial_delay_ms: 200,
            max_delay_ms: 5000,
        };

        let config = RetryConfig::from(&settings);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_delay, Duration::from_millis(200));
        assert_eq!(config.max_delay, Duration::from_millis(5000));
    }

    #[test]
    fn test_classification() {
        let retry: RetryResult<(), _> =
            RetryResult::from(Err(ElasticError::backend_unavailable("refused")));
        assert!(retry.should_retry());

        let fail: RetryResult<(), _> = RetryResult::from(Err(ElasticError::rendezvous_timeout(
            "job",
            Duration::from_secs(1),
            "",
        )));
        assert!(!fail.should_retry());
    }

    #[tokio::test]
    async fn test_retry_transient_eventual_success() {
        let attempts = AtomicU32::new(0);
        let result = retry_transient(&fast(), "observe", || {
            let count = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if count < 2 {
                    Err(ElasticError::backend_unavailable("not yet"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_transient_exhausted_escalates() {
        let attempts = AtomicU32::new(0);
        let result: Result<()> = retry_transient(&fast(), "join", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(ElasticError::backend_unavailable("down")) }
        })
        .await;

        assert!(matches!(result, Err(ElasticError::BackendUnavailable { .. })));
        // Initial attempt + 2 retries
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_transient_does_not_retry_fatal() {
        let attempts = AtomicU32::new(0);
        let result: Result<()> = retry_transient(&fast(), "wait_round", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async {
                Err(ElasticError::rendezvous_timeout(
                    "job",
                    Duration::from_millis(5),
                    "1/2 nodes",
                ))
            }
        })
        .await;

        assert!(matches!(result, Err(ElasticError::RendezvousTimeout { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
