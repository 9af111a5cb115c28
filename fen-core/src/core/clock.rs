//! Nanosecond clocks.
//!
//! Wall-clock time must be CLOCK_REALTIME-equivalent so exchange timestamps
//! (1970 epoch) and local stamps live on the same axis.

use std::sync::OnceLock;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

static START: OnceLock<Instant> = OnceLock::new();

/// Realtime nanoseconds since the Unix epoch.
#[inline(always)]
pub fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos() as u64
}

/// Realtime milliseconds since the Unix epoch (REST `timestamp` parameter).
#[inline(always)]
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

/// Monotonic nanoseconds since first use. Immune to wall-clock jumps; for
/// interval scheduling, never for exchange-facing timestamps.
#[inline(always)]
pub fn mono_ns() -> u64 {
    START.get_or_init(Instant::now).elapsed().as_nanos() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clocks_are_consistent() {
        let ns = now_ns();
        let ms = now_ms();
        // Same axis, ms derived from ns within a coarse tolerance.
        assert!(ns / 1_000_000 >= ms - 1_000);
        assert!(ns / 1_000_000 <= ms + 1_000);
    }

    #[test]
    fn now_ns_is_monotonic_enough() {
        let a = now_ns();
        let b = now_ns();
        assert!(b + 1_000_000 >= a);
    }

    #[test]
    fn mono_never_goes_backwards() {
        let a = mono_ns();
        let b = mono_ns();
        assert!(b >= a);
    }
}
