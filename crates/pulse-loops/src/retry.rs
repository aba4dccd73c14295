//! Fixed-delay retry for rate-limited Loops calls.
//!
//! The historical behavior of these jobs is to sleep one second and retry
//! the same call indefinitely on a 429. That remains the default, but the
//! policy is explicit so callers can cap attempts; running out of a bounded
//! policy surfaces as [`LoopsError::RetryExhausted`] rather than the
//! underlying 429.

use std::future::Future;
use std::time::Duration;

use crate::error::LoopsError;

/// Retry behavior for rate-limited calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first. `None` retries forever.
    pub max_attempts: Option<u32>,
    /// Fixed sleep between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            delay: Duration::from_secs(1),
        }
    }
}

/// Runs `operation`, sleeping `policy.delay` and retrying whenever it fails
/// with [`LoopsError::RateLimited`]. All other errors are returned
/// immediately without retrying.
///
/// # Errors
///
/// Returns [`LoopsError::RetryExhausted`] once a bounded policy's attempts
/// are used up, or whatever non-rate-limit error the operation produced.
pub async fn retry_on_rate_limit<T, F, Fut>(
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, LoopsError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LoopsError>>,
{
    let mut attempts = 0u32;
    loop {
        attempts = attempts.saturating_add(1);
        match operation().await {
            Ok(value) => return Ok(value),
            Err(LoopsError::RateLimited) => {
                if let Some(max) = policy.max_attempts {
                    if attempts >= max {
                        return Err(LoopsError::RetryExhausted { attempts });
                    }
                }
                tracing::warn!(
                    attempts,
                    delay_ms = u64::try_from(policy.delay.as_millis()).unwrap_or(u64::MAX),
                    "Loops rate limit hit, retrying after fixed delay"
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn no_delay(max_attempts: Option<u32>) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::ZERO,
        }
    }

    #[test]
    fn default_policy_is_unbounded_with_one_second_delay() {
        let policy = RetryPolicy::default();
        assert!(policy.max_attempts.is_none());
        assert_eq!(policy.delay, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_on_rate_limit(no_delay(Some(3)), || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, LoopsError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_rate_limited_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_on_rate_limit(no_delay(None), || {
            let c = Arc::clone(&c);
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(LoopsError::RateLimited)
                } else {
                    Ok::<u32, LoopsError>(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn bounded_policy_surfaces_retry_exhausted() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_on_rate_limit(no_delay(Some(3)), || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(LoopsError::RateLimited)
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(
            result,
            Err(LoopsError::RetryExhausted { attempts: 3 })
        ));
    }

    #[tokio::test]
    async fn non_rate_limit_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_on_rate_limit(no_delay(None), || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(LoopsError::MissingExportId)
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(LoopsError::MissingExportId)));
    }
}
