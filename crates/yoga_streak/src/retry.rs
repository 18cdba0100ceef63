use rand::{RngExt, rng};
use std::time::Duration;

use crate::StreakError;

/// Exponential backoff with full jitter for activity fetches.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Run `f` until it succeeds, `should_retry` rejects the error, or the
    /// retry budget is spent.
    pub async fn retry_if<F, Fut, T, E, P>(&self, mut f: F, should_retry: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let mut attempt = 0u32;
        loop {
            match f().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries || !should_retry(&e) {
                        return Err(e);
                    }
                    let delay = self.backoff(attempt);
                    tracing::debug!(attempt, ?delay, "retrying activity fetch");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let max_delay = self
            .base_delay
            .checked_mul(1u32 << attempt.min(16))
            .unwrap_or(Duration::MAX);
        let max_ms = u64::try_from(max_delay.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return Duration::ZERO;
        }
        let jitter = rng().random_range(0..max_ms);
        Duration::from_millis(jitter)
    }
}

/// Network failures and 5xx responses are worth another attempt; auth and
/// input problems are not.
pub fn is_transient(err: &StreakError) -> bool {
    match err {
        StreakError::Http(_) => true,
        StreakError::Api { status, .. } => *status >= 500 || *status == 429,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn backoff_with_huge_base_delay_does_not_overflow() {
        let policy = RetryPolicy {
            max_retries: 20,
            base_delay: Duration::MAX / 2,
        };
        for attempt in [1, 2, 16, 20] {
            assert!(policy.backoff(attempt) <= Duration::MAX);
        }
        assert_eq!(RetryPolicy::none().backoff(3), Duration::ZERO);
    }

    #[tokio::test]
    async fn retry_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result = fast()
            .retry_if(
                move || {
                    let c = c.clone();
                    async move {
                        let prev = c.fetch_add(1, Ordering::SeqCst) + 1;
                        if prev < 3 {
                            Err(StreakError::Api {
                                status: 502,
                                body: String::new(),
                            })
                        } else {
                            Ok(42)
                        }
                    }
                },
                is_transient,
            )
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_stops_on_permanent_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result: Result<(), StreakError> = fast()
            .retry_if(
                move || {
                    let c = c.clone();
                    async move {
                        c.fetch_add(1, Ordering::SeqCst);
                        Err(StreakError::Auth("bad token".into()))
                    }
                },
                is_transient,
            )
            .await;
        assert!(matches!(result, Err(StreakError::Auth(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retry_gives_up_after_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result: Result<(), StreakError> = fast()
            .retry_if(
                move || {
                    let c = c.clone();
                    async move {
                        c.fetch_add(1, Ordering::SeqCst);
                        Err(StreakError::Api {
                            status: 503,
                            body: String::new(),
                        })
                    }
                },
                is_transient,
            )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
