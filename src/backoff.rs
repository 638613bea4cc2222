//! Backoff arithmetic for the admission gate.
//!
//! Two schedules only: a fixed silence after a non-retryable status, and a
//! capped exponential for everything else. The exponential delay for the k-th
//! consecutive failure is `min(2^k + jitter, cap)` milliseconds; jitter is
//! added before the cap, so once the exponential term alone exceeds the cap,
//! jitter no longer matters.
//!
//! Overflow behavior: all arithmetic saturates. No attempt count or jitter
//! value can panic; absurd inputs clamp to the cap.

use std::time::Duration;

/// Fixed silence after a non-retryable status (24 hours).
pub const NON_RETRYABLE_BACKOFF: Duration = Duration::from_secs(24 * 60 * 60);

/// Cap on the exponential schedule for retryable statuses (30 minutes).
pub const MAX_RETRYABLE_BACKOFF: Duration = Duration::from_secs(30 * 60);

/// Delay before the next attempt after the `attempts`-th consecutive
/// retryable failure (1-based: the failure being recorded is included).
pub fn exponential_delay(attempts: u32, jitter_ms: u64, cap: Duration) -> Duration {
    let cap_ms = millis_saturated(cap);
    let raw = 2u128.saturating_pow(attempts).saturating_add(u128::from(jitter_ms));
    Duration::from_millis(raw.min(u128::from(cap_ms)) as u64)
}

pub(crate) fn millis_saturated(duration: Duration) -> u64 {
    duration.as_millis().try_into().unwrap_or(u64::MAX)
}
