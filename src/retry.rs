//! Bounded exponential backoff for `integration_transient` failures (spec §7).
//!
//! Grounded on the teacher's `agent/provider.rs` `GLOBAL_HW_LOCK`-style
//! narrow-purpose helper: a single free function rather than a retry
//! builder type, since every call site here has the same policy (3
//! attempts, 200ms base, doubling, capped at 2s).

use crate::error::CoreError;
use std::future::Future;
use std::time::Duration;

const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY: Duration = Duration::from_millis(200);
const MAX_DELAY: Duration = Duration::from_secs(2);

/// Retries `f` up to [`MAX_ATTEMPTS`] times when it fails with a retryable
/// [`CoreError`] (`IntegrationTransient`), doubling the delay each attempt
/// and capping it at [`MAX_DELAY`]. Non-retryable errors return
/// immediately on the first failure.
pub async fn retry_with_backoff<T, F, Fut>(mut f: F) -> Result<T, CoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CoreError>>,
{
    let mut delay = BASE_DELAY;
    let mut attempt = 1;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < MAX_ATTEMPTS => {
                tracing::warn!(attempt, error = %e, "retrying transient integration failure");
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
