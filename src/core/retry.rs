//! Retry with backoff for transient failures
//!
//! One combinator shared by the remote fetch path and the per-record
//! persistence path. Only errors the predicate classifies as transient are
//! retried; the delay grows linearly with the attempt number.

use crate::config::RetryConfig;
use crate::log_retry_attempt;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let scaled = self.base_delay.saturating_mul(attempt as u32);
        scaled.min(self.max_delay)
    }

    /// A policy that never waits, for tests
    pub fn immediate(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

/// Runs `operation` until it succeeds, fails permanently, or runs out of attempts
///
/// # Example
///
/// ```
/// use parksync::core::retry::{retry_with_backoff, RetryPolicy};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// let rt = tokio::runtime::Runtime::new().unwrap();
/// let calls = AtomicUsize::new(0);
/// let result: Result<u32, String> = rt.block_on(retry_with_backoff(
///     &RetryPolicy::immediate(3),
///     |e: &String| e.contains("timeout"),
///     || async {
///         if calls.fetch_add(1, Ordering::SeqCst) == 0 {
///             Err("timeout".to_string())
///         } else {
///             Ok(7)
///         }
///     },
/// ));
/// assert_eq!(result, Ok(7));
/// assert_eq!(calls.load(Ordering::SeqCst), 2);
/// ```
pub async fn retry_with_backoff<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    is_transient: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt >= policy.max_attempts || !is_transient(&e) {
                    return Err(e);
                }

                let delay = policy.delay_for(attempt);
                log_retry_attempt!(attempt + 1, policy.max_attempts, e);
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_delay_scales_linearly_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(1200),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(1200));
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), String> = retry_with_backoff(
            &RetryPolicy::immediate(3),
            |_| true,
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("connection refused".to_string())
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), String> = retry_with_backoff(
            &RetryPolicy::immediate(3),
            |e: &String| e.contains("timeout"),
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("invalid table".to_string())
            },
        )
        .await;

        assert_eq!(result, Err("invalid table".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
