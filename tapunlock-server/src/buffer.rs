//! Tap buffer
//!
//! Keeps the most recent taps reported by the detector so recordings and
//! watch subscriptions can look back in time. Taps are stored oldest first.

use std::collections::VecDeque;

use tracing::{trace, warn};

use tapunlock_protocol::Tap;
use tapunlock_utils::millis_to_nanos;

use crate::config::BufferConfig;

/// Bounded, time-ordered tap history
#[derive(Debug)]
pub struct TapBuffer {
    /// Taps in non-decreasing timestamp order
    taps: VecDeque<Tap>,
    /// Hard upper bound on stored taps
    capacity: usize,
    /// Age after which unpinned taps are pruned
    retention_ns: u64,
    /// Taps at or after this timestamp survive age pruning
    pinned_from: Option<u64>,
}

impl TapBuffer {
    pub fn new(config: &BufferConfig) -> Self {
        Self::with_limits(config.capacity, millis_to_nanos(config.retention_ms))
    }

    pub fn with_limits(capacity: usize, retention_ns: u64) -> Self {
        let capacity = capacity.max(1);
        Self {
            taps: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            retention_ns,
            pinned_from: None,
        }
    }

    /// Append a tap and prune old entries
    ///
    /// Returns `false` and drops the tap if it is older than the newest
    /// stored tap.
    pub fn push(&mut self, tap: Tap) -> bool {
        if let Some(newest) = self.taps.back() {
            if tap.timestamp < newest.timestamp {
                warn!(
                    "Dropping out-of-order tap at {} (newest is {})",
                    tap.timestamp, newest.timestamp
                );
                return false;
            }
        }

        self.taps.push_back(tap);
        self.prune(tap.timestamp);
        true
    }

    /// Drop taps that fell out of the retention window or exceed capacity
    pub fn prune(&mut self, now: u64) {
        let cutoff = now.saturating_sub(self.retention_ns);
        while let Some(oldest) = self.taps.front() {
            if oldest.timestamp >= cutoff || self.is_pinned(oldest.timestamp) {
                break;
            }
            self.taps.pop_front();
        }

        while self.taps.len() > self.capacity {
            if let Some(dropped) = self.taps.pop_front() {
                if self.is_pinned(dropped.timestamp) {
                    warn!(
                        "Buffer full, dropping tap at {} from an active recording",
                        dropped.timestamp
                    );
                }
            }
        }
    }

    fn is_pinned(&self, timestamp: u64) -> bool {
        self.pinned_from.is_some_and(|from| timestamp >= from)
    }

    /// Keep taps from `from` on regardless of age, or release the pin
    pub fn set_pin(&mut self, from: Option<u64>) {
        if self.pinned_from != from {
            trace!("Buffer pin {:?} -> {:?}", self.pinned_from, from);
        }
        self.pinned_from = from;
    }

    /// Current pin, if any
    pub fn pinned_from(&self) -> Option<u64> {
        self.pinned_from
    }

    /// Copy of the taps in `[from, until]`
    pub fn window(&self, from: u64, until: u64) -> Vec<Tap> {
        self.taps
            .iter()
            .filter(|t| t.timestamp >= from && t.timestamp <= until)
            .copied()
            .collect()
    }

    /// Remove every tap at or before `until`
    pub fn drain_through(&mut self, until: u64) -> usize {
        let before = self.taps.len();
        while self.taps.front().is_some_and(|t| t.timestamp <= until) {
            self.taps.pop_front();
        }
        before - self.taps.len()
    }

    /// The newest `count` taps strictly after `after`, oldest first
    ///
    /// Returns fewer than `count` taps if not enough are available.
    pub fn recent(&self, count: usize, after: u64) -> Vec<Tap> {
        let mut taps: Vec<Tap> = self
            .taps
            .iter()
            .rev()
            .take_while(|t| t.timestamp > after)
            .take(count)
            .copied()
            .collect();
        taps.reverse();
        taps
    }

    pub fn len(&self) -> usize {
        self.taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapunlock_protocol::Side;

    fn tap(timestamp: u64) -> Tap {
        Tap::new(timestamp, Side::Back)
    }

    fn timestamps(taps: &[Tap]) -> Vec<u64> {
        taps.iter().map(|t| t.timestamp).collect()
    }

    #[test]
    fn test_new_from_config() {
        let buffer = TapBuffer::new(&BufferConfig::default());
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 256);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut buffer = TapBuffer::with_limits(0, 1_000);
        buffer.push(tap(1));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_push_keeps_order() {
        let mut buffer = TapBuffer::with_limits(10, 1_000);
        assert!(buffer.push(tap(1)));
        assert!(buffer.push(tap(2)));
        assert!(buffer.push(tap(2)));
        assert!(!buffer.push(tap(1)));
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut buffer = TapBuffer::with_limits(3, u64::MAX);
        for t in 1..=5 {
            buffer.push(tap(t));
        }
        assert_eq!(timestamps(&buffer.window(0, u64::MAX)), vec![3, 4, 5]);
    }

    #[test]
    fn test_retention_prunes_old_taps() {
        let mut buffer = TapBuffer::with_limits(100, 100);
        buffer.push(tap(10));
        buffer.push(tap(50));
        buffer.push(tap(140));

        // cutoff = 40
        assert_eq!(timestamps(&buffer.window(0, u64::MAX)), vec![50, 140]);
    }

    #[test]
    fn test_pin_survives_retention() {
        let mut buffer = TapBuffer::with_limits(100, 100);
        buffer.push(tap(5));
        buffer.set_pin(Some(10));
        buffer.push(tap(10));
        buffer.push(tap(20));
        buffer.push(tap(500));

        assert_eq!(timestamps(&buffer.window(0, u64::MAX)), vec![10, 20, 500]);

        buffer.set_pin(None);
        buffer.prune(500);
        assert_eq!(timestamps(&buffer.window(0, u64::MAX)), vec![500]);
    }

    #[test]
    fn test_pin_does_not_override_capacity() {
        let mut buffer = TapBuffer::with_limits(2, u64::MAX);
        buffer.set_pin(Some(0));
        for t in 1..=4 {
            buffer.push(tap(t));
        }
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.pinned_from(), Some(0));
    }

    #[test]
    fn test_window_inclusive_bounds() {
        let mut buffer = TapBuffer::with_limits(10, u64::MAX);
        for t in [10, 20, 30, 40] {
            buffer.push(tap(t));
        }
        assert_eq!(timestamps(&buffer.window(20, 30)), vec![20, 30]);
        assert!(buffer.window(41, 100).is_empty());
        // Snapshot leaves the buffer untouched
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn test_drain_through() {
        let mut buffer = TapBuffer::with_limits(10, u64::MAX);
        for t in [10, 20, 30, 40] {
            buffer.push(tap(t));
        }
        assert_eq!(buffer.drain_through(30), 3);
        assert_eq!(timestamps(&buffer.window(0, u64::MAX)), vec![40]);
        assert_eq!(buffer.drain_through(5), 0);
    }

    #[test]
    fn test_recent() {
        let mut buffer = TapBuffer::with_limits(10, u64::MAX);
        for t in [10, 20, 30, 40, 50] {
            buffer.push(tap(t));
        }
        assert_eq!(timestamps(&buffer.recent(3, 0)), vec![30, 40, 50]);
        assert_eq!(timestamps(&buffer.recent(3, 35)), vec![40, 50]);
        assert!(buffer.recent(3, 50).is_empty());
        assert!(buffer.recent(0, 0).is_empty());
    }
}
