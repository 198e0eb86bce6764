use std::future::Future;
use std::time::Duration;

use serde_json::Value;

use crate::core::config::settings::section_u64;
use crate::core::errors::RagError;

/// Bounded retry with a per-attempt timeout and capped exponential backoff.
///
/// Only errors reporting `is_retryable()` are attempted again.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
            call_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Value) -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: section_u64(config, "retry", "max_attempts")
                .map(|v| v.clamp(1, 10) as u32)
                .unwrap_or(defaults.max_attempts),
            initial_backoff: section_u64(config, "retry", "initial_backoff_ms")
                .map(Duration::from_millis)
                .unwrap_or(defaults.initial_backoff),
            max_backoff: section_u64(config, "retry", "max_backoff_ms")
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_backoff),
            call_timeout: section_u64(config, "retry", "timeout_ms")
                .map(Duration::from_millis)
                .unwrap_or(defaults.call_timeout),
        }
    }

    /// Policy that never waits between attempts.
    pub fn immediate(max_attempts: u32, call_timeout: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            call_timeout,
        }
    }

    /// Delay after the given failed attempt (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }

    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, RagError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RagError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let outcome = match tokio::time::timeout(self.call_timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(RagError::Timeout(self.call_timeout.as_millis() as u64)),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.backoff_for(attempt);
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        operation,
                        attempt,
                        max_attempts,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(350),
            call_timeout: Duration::from_secs(1),
        };
        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(350));
        assert_eq!(policy.backoff_for(30), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let policy = RetryPolicy::immediate(3, Duration::from_secs(1));
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let value = policy
            .run("embed", move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(RagError::RateLimited("429".into()))
                } else {
                    Ok(7)
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failures_stop_immediately() {
        let policy = RetryPolicy::immediate(5, Duration::from_secs(1));
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let err = policy
            .run("generate", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(RagError::MalformedResponse("no choices".into()))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, RagError::MalformedResponse(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_attempts_time_out_and_exhaust_attempts() {
        let policy = RetryPolicy::immediate(2, Duration::from_millis(20));
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let err = policy
            .run("generate", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, RagError>(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, RagError::Timeout(20)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
