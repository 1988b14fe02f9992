use crate::utils::time::sleep_with_jitter;
use std::future::Future;
use tracing::warn;

fn next_delay(delay_ms: u64) -> u64 {
    delay_ms.saturating_mul(2)
}

/// Runs `operation` until it succeeds, doubling the delay between attempts.
///
/// Errors that are not retryable (missing partition, access denied) are
/// returned immediately.
pub async fn retry_with_backoff<T, F, Fut>(
    mut retries: u32,
    base_delay_ms: u64,
    operation: F,
) -> common::Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = common::Result<T>>,
{
    let mut delay = base_delay_ms;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if retries == 0 || !e.is_retryable() {
                    return Err(e);
                }

                warn!(error = %e, retries_left = retries, delay_ms = delay, "Retrying");
                retries -= 1;
                sleep_with_jitter(delay, delay / 2).await;
                delay = next_delay(delay);
            }
        }
    }
}
