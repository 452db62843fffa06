//! Retry with exponential backoff and jitter for transient provider errors.

use graphloom_core::ClassifierError;
use rand::RngExt;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Attempt cap including the first try.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Base delay; attempt `n` waits `base * 2^n` plus jitter.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(250);

/// Run `operation` until it succeeds, fails non-retryably, or the attempt
/// cap is reached. Rate-limit and availability errors are retried; the
/// final error surfaces as [`ClassifierError::Exhausted`].
pub async fn with_retries<T, F, Fut>(
    max_attempts: u32,
    base_delay: Duration,
    mut operation: F,
) -> Result<T, ClassifierError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClassifierError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt + 1 < max_attempts => {
                let backoff = base_delay * 2u32.saturating_pow(attempt);
                let jitter = Duration::from_millis(
                    rand::rng().random_range(0..=backoff.as_millis().max(1) as u64 / 2),
                );
                warn!(attempt = attempt + 1, error = %err, "retrying transient provider error");
                tokio::time::sleep(backoff + jitter).await;
                attempt += 1;
            }
            Err(err) if err.is_retryable() => {
                return Err(ClassifierError::Exhausted {
                    attempts: attempt + 1,
                    last: err.to_string(),
                })
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let attempts = AtomicU32::new(0);
        let result = with_retries(3, Duration::from_millis(1), || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ClassifierError::RateLimited("slow down".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_after_the_attempt_cap() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), _> = with_retries(2, Duration::from_millis(1), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(ClassifierError::Unavailable("down".into())) }
        })
        .await;
        assert!(matches!(
            result,
            Err(ClassifierError::Exhausted { attempts: 2, .. })
        ));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_retryable_errors_surface_immediately() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), _> = with_retries(5, Duration::from_millis(1), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(ClassifierError::InvalidResponse("bad json".into())) }
        })
        .await;
        assert!(matches!(result, Err(ClassifierError::InvalidResponse(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
