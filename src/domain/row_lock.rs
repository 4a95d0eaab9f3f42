//! Row-level locking and bounded conflict retry.
//!
//! Facilities and reservations are stored as `Arc<RwLock<_>>` rows. A write
//! lock on a row is the transactional unit: guards are checked and the row
//! is mutated while it is held. Waiting for a row lock is bounded; a timeout
//! surfaces as [`ReservationError::StorageConflict`], which
//! [`retry_on_conflict`] retries a bounded number of times before escalating
//! to [`ReservationError::StorageUnavailable`].
//!
//! A conflict is only ever raised while acquiring the lock, before anything
//! is mutated, so a retried unit cannot apply its effect twice.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use crate::error::ReservationError;

/// Bounds for row-lock waits and conflict retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum time to wait for a single row lock.
    pub lock_timeout: Duration,
    /// Total attempts, including the first one. Zero behaves as one.
    pub max_attempts: u32,
    /// Linear backoff step: attempt `n` sleeps `n × backoff` before retrying.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(250),
            max_attempts: 3,
            backoff: Duration::from_millis(20),
        }
    }
}

/// Acquires the write lock of a row, waiting at most `timeout`.
///
/// # Errors
///
/// Returns [`ReservationError::StorageConflict`] if the lock is still held
/// by another operation when the timeout elapses.
pub async fn lock_row<T>(
    row: Arc<RwLock<T>>,
    timeout: Duration,
) -> Result<OwnedRwLockWriteGuard<T>, ReservationError> {
    tokio::time::timeout(timeout, row.write_owned())
        .await
        .map_err(|_| ReservationError::StorageConflict)
}

/// Runs `unit` until it succeeds, fails with a non-retryable error, or the
/// attempt budget of `policy` is spent.
///
/// # Errors
///
/// Propagates the first non-retryable error of `unit`. Returns
/// [`ReservationError::StorageUnavailable`] once every attempt conflicted.
pub async fn retry_on_conflict<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &'static str,
    mut unit: F,
) -> Result<T, ReservationError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ReservationError>>,
{
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        match unit().await {
            Err(err) if err.is_retryable() => {
                tracing::warn!(operation, attempt, attempts, "storage conflict");
                if attempt < attempts {
                    tokio::time::sleep(policy.backoff.saturating_mul(attempt)).await;
                }
            }
            other => return other,
        }
    }
    Err(ReservationError::StorageUnavailable {
        operation,
        attempts,
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            lock_timeout: Duration::from_millis(10),
            max_attempts,
            backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn lock_row_times_out_while_held() {
        let row = Arc::new(RwLock::new(0_u32));
        let _held = Arc::clone(&row).write_owned().await;
        let result = lock_row(Arc::clone(&row), Duration::from_millis(5)).await;
        assert!(matches!(result, Err(ReservationError::StorageConflict)));
    }

    #[tokio::test]
    async fn retry_gives_up_after_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_on_conflict(&fast_policy(3), "test.op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ReservationError::StorageConflict) }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            result,
            Err(ReservationError::StorageUnavailable {
                operation: "test.op",
                attempts: 3
            })
        );
    }

    #[tokio::test]
    async fn business_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_on_conflict(&fast_policy(5), "test.op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ReservationError::InvalidWindow) }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result, Err(ReservationError::InvalidWindow));
    }

    #[tokio::test]
    async fn retry_succeeds_once_lock_is_released() {
        let row = Arc::new(RwLock::new(0_u32));
        let held = Arc::clone(&row).write_owned().await;
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(15)).await;
            drop(held);
        });

        let policy = RetryPolicy {
            lock_timeout: Duration::from_millis(10),
            max_attempts: 10,
            backoff: Duration::from_millis(5),
        };
        let result = retry_on_conflict(&policy, "test.increment", || {
            let row = Arc::clone(&row);
            async move {
                let mut guard = lock_row(row, policy.lock_timeout).await?;
                *guard += 1;
                Ok(*guard)
            }
        })
        .await;
        assert_eq!(result, Ok(1));
    }
}
