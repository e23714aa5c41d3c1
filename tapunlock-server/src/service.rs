//! Detection service core
//!
//! Receives taps from the detector, keeps them in the [`TapBuffer`] and
//! evaluates every watch subscription as taps arrive.
//!
//! Lock order is buffer first, registry second. Nothing holds a registry
//! entry while taking the buffer lock.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, trace};

use tapunlock_protocol::{ServerMessage, Side, Tap, TapPattern};

use crate::buffer::TapBuffer;
use crate::config::BufferConfig;
use crate::detector::TapObserver;
use crate::registry::ClientRegistry;

/// Shared tap history plus the subscriptions evaluated against it
pub struct DetectionService {
    buffer: Mutex<TapBuffer>,
    registry: Arc<ClientRegistry>,
}

impl DetectionService {
    pub fn new(config: &BufferConfig, registry: Arc<ClientRegistry>) -> Self {
        Self::with_buffer(TapBuffer::new(config), registry)
    }

    pub fn with_buffer(buffer: TapBuffer, registry: Arc<ClientRegistry>) -> Self {
        Self {
            buffer: Mutex::new(buffer),
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    /// Store a tap and push a match to every watch it completes
    ///
    /// Returns the number of matches delivered.
    pub fn record_tap(&self, tap: Tap) -> usize {
        let buffer = {
            let mut buffer = self.buffer.lock();
            if !buffer.push(tap) {
                return 0;
            }
            buffer
        };

        let delivered = self.registry.evaluate_watches(|watch| {
            let wanted = watch.pattern.size();
            let taps = buffer.recent(wanted, watch.consumed_until());
            if taps.len() < wanted {
                return None;
            }

            let candidate = TapPattern::from_taps(&taps);
            if !watch.pattern.matches(&candidate) {
                trace!(
                    "Subscription {} not matched by {}",
                    watch.subscription_id,
                    candidate
                );
                return None;
            }

            info!("Subscription {} matched", watch.subscription_id);
            Some((
                tap.timestamp,
                ServerMessage::Match {
                    subscription_id: watch.subscription_id,
                    pattern: candidate.to_wire(),
                },
            ))
        });

        drop(buffer);
        delivered
    }

    /// Taps in `[from, until]` as a pattern
    ///
    /// Everything up to `until` is drained from the buffer so the same taps
    /// are never handed out twice.
    pub fn taps_in_window(&self, from: u64, until: u64) -> TapPattern {
        let mut buffer = self.buffer.lock();
        let taps = buffer.window(from, until);
        let drained = buffer.drain_through(until);
        debug!(
            "Window [{}, {}] holds {} taps, drained {}",
            from,
            until,
            taps.len(),
            drained
        );
        TapPattern::from_taps(&taps)
    }

    /// Pin the buffer to the oldest active recording, or release the pin
    pub fn refresh_pin(&self) {
        let pin = self.registry.earliest_recording();
        self.buffer.lock().set_pin(pin);
    }

    /// Number of taps currently buffered
    pub fn buffered_taps(&self) -> usize {
        self.buffer.lock().len()
    }
}

impl TapObserver for DetectionService {
    fn on_tap(&self, timestamp: u64, now: u64, side: Side) {
        trace!(
            "Tap on {} at {}, reported after {}ns",
            side,
            timestamp,
            now.saturating_sub(timestamp)
        );
        self.record_tap(Tap::new(timestamp, side));
    }
}
