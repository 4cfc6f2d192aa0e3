//! Retry with exponential back-off and jitter for provider calls.
//!
//! [`retry_with_backoff`] wraps a provider call and retries on transient
//! errors (timeouts, transport failures, upstream 5xx). Non-transient errors,
//! `RateLimited` and `AuthFailed` in particular, are returned immediately
//! so the dispatcher can turn them into pause triggers instead of burning
//! retries against a condition that needs operator attention.

use std::future::Future;
use std::time::Duration;

use sovscan_providers::ProviderError;

/// Runs `operation` up to `max_attempts` times, retrying transient errors.
///
/// Back-off schedule with `backoff_base_ms = 1_000`:
///
/// | Attempt | Sleep before next attempt        |
/// |---------|----------------------------------|
/// | 1       | 1 000 ms × 2⁰ ± 25 % jitter     |
/// | 2       | 1 000 ms × 2¹ ± 25 % jitter     |
///
/// Delay is capped at 60 s. `max_attempts` counts total attempts, so
/// `max_attempts = 3` means at most two sleeps.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_attempts: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    const MAX_DELAY_MS: u64 = 60_000;
    let mut attempt = 1u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_transient() || attempt >= max_attempts {
                    return Err(err);
                }
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms,
                    error = %err,
                    "transient provider error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_test.rs"]
mod tests;
