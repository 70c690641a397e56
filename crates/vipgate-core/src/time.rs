//! Wall-clock helpers. Timestamps are Unix seconds throughout.

use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds in one day.
pub const SECS_PER_DAY: i64 = 86_400;

/// Current Unix timestamp in seconds.
#[inline]
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Whole days remaining until `end`, rounded down and clamped at zero.
#[inline]
pub fn days_until(end: i64, now: i64) -> i64 {
    ((end - now) / SECS_PER_DAY).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn days_until_rounds_down() {
        assert_eq!(days_until(1_000 + SECS_PER_DAY * 3 - 1, 1_000), 2);
        assert_eq!(days_until(1_000 + SECS_PER_DAY * 3, 1_000), 3);
    }

    #[test]
    fn days_until_clamps_past() {
        assert_eq!(days_until(0, SECS_PER_DAY * 10), 0);
    }
}
