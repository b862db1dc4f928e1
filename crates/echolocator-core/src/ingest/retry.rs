//! Bounded retry with exponential backoff.
//!
//! Stateless policy applied to transient embedding, asset, and repository
//! failures. Permanent failures (validation, rejected input) return on the
//! first attempt.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use echolocator_types::config::RetryConfig;

/// Retry policy for one class of operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. `1` disables retrying.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Whether another attempt is allowed after `attempt` (1-based) failed.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay before the attempt following `attempt` (1-based):
    /// `initial * 2^(attempt - 1)`, capped at `max_backoff`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }

    /// Run `attempt_fn` until it succeeds, fails permanently, or the attempt
    /// budget is spent. The last error is returned unchanged.
    pub async fn run<T, E, F, Fut>(
        &self,
        operation: &str,
        is_transient: fn(&E) -> bool,
        mut attempt_fn: F,
    ) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            match attempt_fn().await {
                Ok(value) => return Ok(value),
                Err(err) if is_transient(&err) && self.should_retry(attempt) => {
                    let delay = self.backoff_for(attempt);
                    tracing::warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
        }
    }

    #[test]
    fn test_should_retry_within_limit() {
        let policy = fast_policy(3);
        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }

    #[test]
    fn test_none_never_retries() {
        assert!(!RetryPolicy::none().should_retry(1));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(2_000),
        };
        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(400));
        assert_eq!(policy.backoff_for(6), Duration::from_millis(2_000));
        assert_eq!(policy.backoff_for(40), Duration::from_millis(2_000));
    }

    #[test]
    fn test_from_config_floors_attempts() {
        let policy = RetryPolicy::from_config(&RetryConfig {
            max_attempts: 0,
            initial_backoff_ms: 5,
            max_backoff_ms: 50,
        });
        assert_eq!(policy.max_attempts, 1);
    }

    #[tokio::test]
    async fn test_run_retries_transient_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<u32, String> = fast_policy(3)
            .run("op", |_| true, move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 { Err(format!("fail {n}")) } else { Ok(n) }
            })
            .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_gives_up_after_budget() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), String> = fast_policy(2)
            .run("op", |_| true, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("still down".to_string())
            })
            .await;
        assert_eq!(result.unwrap_err(), "still down");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_run_does_not_retry_permanent_errors() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), String> = fast_policy(5)
            .run("op", |_| false, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("bad input".to_string())
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
