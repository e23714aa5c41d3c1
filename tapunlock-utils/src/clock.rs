//! Shared monotonic clock
//!
//! Tap timestamps and recording windows must be comparable across the
//! client and the daemon, so both read the same system-wide monotonic clock
//! instead of a per-process `Instant`.

/// Current value of `CLOCK_MONOTONIC` in nanoseconds
pub fn monotonic_nanos() -> u64 {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `ts` is a valid, writable timespec and CLOCK_MONOTONIC is
    // supported on every platform we build for.
    let rc = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
    if rc != 0 {
        return 0;
    }
    (ts.tv_sec as u64)
        .saturating_mul(1_000_000_000)
        .saturating_add(ts.tv_nsec as u64)
}

/// Convert milliseconds to nanoseconds
pub fn millis_to_nanos(ms: u64) -> u64 {
    ms.saturating_mul(1_000_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_never_goes_back() {
        let a = monotonic_nanos();
        let b = monotonic_nanos();
        assert!(a > 0);
        assert!(b >= a);
    }

    #[test]
    fn test_monotonic_advances() {
        let a = monotonic_nanos();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let b = monotonic_nanos();
        assert!(b - a >= millis_to_nanos(5));
    }

    #[test]
    fn test_millis_to_nanos() {
        assert_eq!(millis_to_nanos(150), 150_000_000);
        assert_eq!(millis_to_nanos(u64::MAX), u64::MAX);
    }
}
