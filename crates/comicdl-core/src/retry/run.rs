//! Retry loop: run an async operation until success or policy says stop.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use super::classify;
use super::policy::RetryPolicy;
use crate::error::FetchError;

/// Runs `f` until it succeeds or the retry policy says to stop.
/// Backoff sleeps are cut short by `cancel`, which yields `FetchError::Cancelled`.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut f: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 1u32;
    loop {
        let err = match f().await {
            Ok(v) => return Ok(v),
            Err(e) => e,
        };
        let Some(delay) = policy.delay_after(attempt, classify::classify(&err)) else {
            return Err(err);
        };
        tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying request");
        tokio::select! {
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
        attempt += 1;
    }
}
