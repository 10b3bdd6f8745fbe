//! Retry with exponential backoff for calls to external services.
//!
//! Only errors whose [`ErrorCode::retryable`] flag is set are retried. The
//! delay doubles per attempt from `base`, is capped at `cap`, and gets up to
//! 25% random jitter so concurrent callers do not retry in lockstep.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::ErrorCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub cap: Duration,
}

impl Backoff {
    #[must_use]
    pub const fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    /// Delay before the retry that follows failed attempt `attempt` (0-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.min(16)).unwrap_or(u32::MAX);
        let exp = self.base.saturating_mul(factor).min(self.cap);
        let jitter_ms = u64::try_from(exp.as_millis() / 4).unwrap_or(0);
        if jitter_ms == 0 {
            return exp;
        }
        let jitter = rand::rng().random_range(0..=jitter_ms);
        exp.saturating_add(Duration::from_millis(jitter)).min(self.cap)
    }
}

/// Run `op` up to `attempts` times, sleeping between retryable failures.
///
/// # Errors
///
/// Returns the last error once attempts are exhausted, or the first
/// non-retryable error immediately.
pub async fn retry_async<T, E, F, Fut>(label: &str, attempts: u32, backoff: Backoff, mut op: F) -> Result<T, E>
where
    E: ErrorCode,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.retryable() && attempt + 1 < attempts => {
                let delay = backoff.delay(attempt);
                tracing::warn!(
                    target: "contentforge::retry",
                    %label,
                    attempt = attempt + 1,
                    attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    code = e.error_code(),
                    error = %e,
                    "retrying after failure"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
