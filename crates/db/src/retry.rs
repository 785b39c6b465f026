//! Bounded retry of transient storage failures.

use std::future::Future;
use std::time::Duration;

use crate::error::StoreError;

/// Delays between attempts. The operation runs at most `len + 1` times.
pub const RETRY_DELAYS_MS: [u64; 3] = [50, 200, 500];

/// Run `op`, retrying while it fails with a transient [`StoreError`].
///
/// Each attempt must be a complete transaction: partial work from a failed
/// attempt has already been rolled back when the error surfaces.
pub async fn with_retry<T, F, Fut>(operation: &str, mut op: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < RETRY_DELAYS_MS.len() => {
                let delay = RETRY_DELAYS_MS[attempt];
                attempt += 1;
                tracing::warn!(
                    operation,
                    attempt,
                    delay_ms = delay,
                    error = %err,
                    "Transient storage failure, retrying",
                );
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert_matches::assert_matches;
    use naoty_core::error::CoreError;

    use super::*;

    #[tokio::test]
    async fn retries_transient_until_success() {
        let calls = AtomicUsize::new(0);
        let out = with_retry("test", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(StoreError::Database(sqlx::Error::PoolTimedOut))
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(out.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_last_delay() {
        let calls = AtomicUsize::new(0);
        let out: Result<(), _> = with_retry("test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        })
        .await;
        assert!(out.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), RETRY_DELAYS_MS.len() + 1);
    }

    #[tokio::test]
    async fn domain_errors_are_returned_immediately() {
        let calls = AtomicUsize::new(0);
        let out: Result<(), _> = with_retry("test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Core(CoreError::InvalidAction("bad".into())))
        })
        .await;
        assert_matches!(out, Err(StoreError::Core(CoreError::InvalidAction(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
