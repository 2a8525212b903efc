//! Bounded retry with linear backoff.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::clock::Clock;
use crate::result::{TradeInError, TradeInResult};

/// Default attempts per action
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default backoff unit (200ms); attempt `n` waits `n` units before retrying
pub const DEFAULT_BACKOFF_MS: u64 = 200;

/// Retry policy for a single UI action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts (at least one is always made)
    pub max_attempts: u32,
    /// Backoff unit in milliseconds
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_ms: DEFAULT_BACKOFF_MS,
        }
    }
}

impl RetryPolicy {
    /// Create a policy
    #[must_use]
    pub const fn new(max_attempts: u32, backoff_ms: u64) -> Self {
        Self {
            max_attempts,
            backoff_ms,
        }
    }

    /// Delay after the given failed attempt (1-based)
    #[must_use]
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_ms.saturating_mul(u64::from(attempt)))
    }

    /// Run `op` until it succeeds or attempts run out.
    ///
    /// `op` receives the 1-based attempt number. Errors that are not
    /// retryable (configuration, validation) are returned as-is without
    /// further attempts.
    pub async fn run<T, F, Fut>(&self, clock: &dyn Clock, mut op: F) -> TradeInResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = TradeInResult<T>>,
    {
        let max = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) if attempt >= max => {
                    return Err(TradeInError::RetriesExhausted {
                        attempts: attempt,
                        source: Box::new(err),
                    })
                }
                Err(err) => {
                    warn!(attempt, max, %err, "action failed, retrying");
                    clock.sleep(self.backoff_after(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_first_attempt_succeeds() {
        let clock = FakeClock::new();
        let value = RetryPolicy::default()
            .run(&clock, |attempt| async move { Ok::<_, TradeInError>(attempt) })
            .await
            .unwrap();
        assert_eq!(value, 1);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_linear_backoff_then_exhausted() {
        let clock = FakeClock::new();
        let calls = AtomicU32::new(0);
        let err = RetryPolicy::default()
            .run(&clock, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(TradeInError::driver("detached")) }
            })
            .await
            .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(clock.sleeps(), vec![200, 400]);
        assert!(matches!(err, TradeInError::RetriesExhausted { attempts: 3, .. }));
        assert!(err.to_string().contains("detached"));
    }

    #[tokio::test]
    async fn test_succeeds_on_second_attempt() {
        let clock = FakeClock::new();
        let value = RetryPolicy::new(3, 50)
            .run(&clock, |attempt| async move {
                if attempt < 2 {
                    Err(TradeInError::driver("not yet"))
                } else {
                    Ok(attempt)
                }
            })
            .await
            .unwrap();
        assert_eq!(value, 2);
        assert_eq!(clock.sleeps(), vec![50]);
    }

    #[tokio::test]
    async fn test_config_error_not_retried() {
        let clock = FakeClock::new();
        let calls = AtomicU32::new(0);
        let err = RetryPolicy::default()
            .run(&clock, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(TradeInError::config("bad")) }
            })
            .await
            .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, TradeInError::Config { .. }));
    }
}
