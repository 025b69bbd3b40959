//! Retry for SQLite busy/locked errors
//!
//! Concurrent commit workers share one pool, so a write can briefly see
//! "database is locked". Those errors are retried with exponential backoff
//! (10ms doubling, capped at 1s) until `max_wait_ms` has elapsed. Any other
//! error, including constraint violations, is returned on the first attempt.

use std::time::{Duration, Instant};

use handreceipt_common::{Error, Result};

const INITIAL_BACKOFF_MS: u64 = 10;
const MAX_BACKOFF_MS: u64 = 1000;

pub async fn retry_on_lock<F, Fut, T>(
    operation_name: &str,
    max_wait_ms: u64,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let start = Instant::now();
    let max_duration = Duration::from_millis(max_wait_ms);
    let mut attempt = 0u32;
    let mut backoff_ms = INITIAL_BACKOFF_MS;

    loop {
        attempt += 1;

        let err = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Database operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !err.is_lock_error() {
            return Err(err);
        }

        let elapsed = start.elapsed();
        if elapsed >= max_duration {
            tracing::error!(
                operation = operation_name,
                attempt,
                elapsed_ms = elapsed.as_millis() as u64,
                max_wait_ms,
                "Database still locked, giving up"
            );
            return Err(Error::Internal(format!(
                "{}: database locked after {} attempts ({} ms)",
                operation_name,
                attempt,
                elapsed.as_millis()
            )));
        }

        let delay = Duration::from_millis(backoff_ms).min(max_duration.saturating_sub(elapsed));
        tracing::warn!(
            operation = operation_name,
            attempt,
            backoff_ms = delay.as_millis() as u64,
            "Database locked, retrying"
        );
        tokio::time::sleep(delay).await;
        backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
    }
}
