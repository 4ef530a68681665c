//! Generic retry-with-backoff wrapper.
//!
//! A single reusable function in place of a one-off inline retry loop: an
//! explicit `(fn, attempts, min_backoff, max_backoff, is_retryable)` wrapper
//! instead of a decorator.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::AppError;

/// Retry an async operation with exponential backoff.
///
/// `attempt` is called once per try (1-indexed) and returns either the
/// success value or an `AppError` indicating what went wrong.
/// `is_retryable` decides whether a given error deserves another attempt;
/// `AppError::ProviderRejection` and `AppError::Validation` are never
/// retried regardless of what `is_retryable` returns, matching the "no
/// retry on 4xx client errors" contract.
pub async fn with_retry<T, F, Fut>(
    label: &str,
    max_attempts: u32,
    min_backoff: Duration,
    max_backoff: Duration,
    mut attempt: F,
) -> Result<T, AppError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut backoff = min_backoff;
    let mut last_err = None;

    for try_num in 1..=max_attempts.max(1) {
        match attempt(try_num).await {
            Ok(value) => return Ok(value),
            Err(e) if !is_retryable(&e) => return Err(e),
            Err(e) => {
                if try_num < max_attempts {
                    warn!(
                        label,
                        attempt = try_num,
                        error = %e,
                        wait_ms = backoff.as_millis() as u64,
                        "retrying after transient failure"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(max_backoff);
                } else {
                    debug!(label, attempt = try_num, error = %e, "retries exhausted");
                }
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| AppError::Fatal(format!("{label}: no attempts made"))))
}

fn is_retryable(err: &AppError) -> bool {
    !matches!(
        err,
        AppError::ProviderRejection(_) | AppError::Validation(_) | AppError::Conflict(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = with_retry(
            "test",
            3,
            Duration::from_millis(1),
            Duration::from_millis(5),
            |_| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(AppError::Transient("not yet".into()))
                    } else {
                        Ok(42)
                    }
                }
            },
        )
        .await;

        assert_eq!(result.expect("should eventually succeed"), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_provider_rejection() {
        let calls = AtomicU32::new(0);
        let result: Result<(), AppError> = with_retry(
            "test",
            5,
            Duration::from_millis(1),
            Duration::from_millis(5),
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(AppError::ProviderRejection("bad key".into())) }
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
