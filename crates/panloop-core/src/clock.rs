//! Process-local monotonic time source.
//!
//! All scheduling arithmetic in this crate works on differences of these
//! counters, so the absolute base is irrelevant; the epoch is pinned to the
//! first call so early readings stay small and the 32-bit accessors take a
//! long time to wrap. Concurrent first calls may observe bases a few
//! microseconds apart, which is harmless for difference arithmetic.

use std::sync::OnceLock;
use std::time::Instant;

static EPOCH: OnceLock<Instant> = OnceLock::new();

fn epoch() -> Instant {
    *EPOCH.get_or_init(Instant::now)
}

/// Milliseconds since the first clock read, full width.
pub fn millis64() -> u64 {
    epoch().elapsed().as_millis() as u64
}

/// Microseconds since the first clock read, full width.
pub fn micros64() -> u64 {
    epoch().elapsed().as_micros() as u64
}

/// Milliseconds since the first clock read, truncated to 32 bits.
///
/// Wraps modulo 2^32 (about 49.7 days). The scheduler uses wrapping
/// subtraction on these values, so the wrap is transparent to it.
pub fn millis() -> u32 {
    millis64() as u32
}

/// Microseconds since the first clock read, truncated to 32 bits.
///
/// Wraps modulo 2^32 (about 71.6 minutes).
pub fn micros() -> u32 {
    micros64() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn millis_is_monotonic() {
        let a = millis64();
        std::thread::sleep(Duration::from_millis(5));
        let b = millis64();
        assert!(b >= a + 4, "expected at least 4ms between reads, got {a}..{b}");
    }

    #[test]
    fn micros_is_monotonic() {
        let a = micros64();
        let b = micros64();
        assert!(b >= a);
    }

    #[test]
    fn first_read_is_near_zero() {
        // Other tests may have touched the clock first, so only bound it
        // loosely: a fresh process stays far below an hour.
        assert!(millis64() < 3_600_000);
    }

    #[test]
    fn narrow_accessors_truncate() {
        let wide = millis64();
        let narrow = millis();
        assert_eq!(narrow, wide as u32);
    }
}
