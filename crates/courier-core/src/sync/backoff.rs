//! Retry schedule for failed deliveries

use std::time::Duration;

/// Delay before the first retry
pub const BASE_RETRY_DELAY: Duration = Duration::from_secs(15);

/// Upper bound for any retry delay
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(60 * 60);

const MAX_BACKOFF_EXPONENT: u32 = 8;

/// Delay before the next attempt of an item that has already been tried `attempts` times.
///
/// `15s * 2^min(attempts, 8)`, capped at one hour.
#[must_use]
pub fn retry_delay(attempts: u32) -> Duration {
    let factor = 1_u32 << attempts.min(MAX_BACKOFF_EXPONENT);
    BASE_RETRY_DELAY.saturating_mul(factor).min(MAX_RETRY_DELAY)
}

/// Absolute retry time in Unix milliseconds.
#[must_use]
pub fn next_retry_at(now: i64, attempts: u32) -> i64 {
    let delay = i64::try_from(retry_delay(attempts).as_millis()).unwrap_or(i64::MAX);
    now.saturating_add(delay)
}
