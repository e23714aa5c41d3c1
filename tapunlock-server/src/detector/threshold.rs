//! Threshold based tap detection
//!
//! Tracks gravity with a low-pass filter over accelerometer samples and
//! reports a tap whenever the remaining linear acceleration exceeds the
//! configured threshold. A refractory period suppresses the ringing that
//! follows every physical tap.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use tapunlock_protocol::Side;
use tapunlock_utils::{millis_to_nanos, monotonic_nanos};

use super::{Accuracy, ObserverList, SensorType, TapDetector, TapObserver};
use crate::config::DetectorConfig;

/// Weight of the previous gravity estimate in the low-pass filter
const GRAVITY_SMOOTHING: f32 = 0.8;

/// Accelerometer spike detector
pub struct ThresholdDetector {
    threshold: f32,
    refractory_ns: u64,
    gravity: Option<[f32; 3]>,
    last_tap: Option<u64>,
    accuracy: Accuracy,
    observers: ObserverList,
    clock: fn() -> u64,
}

impl ThresholdDetector {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            threshold: config.threshold,
            refractory_ns: millis_to_nanos(config.refractory_ms),
            gravity: None,
            last_tap: None,
            accuracy: Accuracy::High,
            observers: ObserverList::new(),
            clock: monotonic_nanos,
        }
    }

    #[cfg(test)]
    fn with_clock(config: &DetectorConfig, clock: fn() -> u64) -> Self {
        Self {
            clock,
            ..Self::new(config)
        }
    }

    fn in_refractory_period(&self, timestamp: u64) -> bool {
        match self.last_tap {
            Some(last) => timestamp < last || timestamp - last < self.refractory_ns,
            None => false,
        }
    }
}

/// The face that was tapped, from the direction the device was pushed
///
/// A tap pushes the device away from the tapped face. Axes follow the usual
/// handheld convention: x to the right, y to the top, z out of the screen.
fn side_from_acceleration(linear: [f32; 3]) -> Side {
    let [x, y, z] = linear;
    let (ax, ay, az) = (x.abs(), y.abs(), z.abs());

    if ax >= ay && ax >= az {
        if x > 0.0 {
            Side::Left
        } else {
            Side::Right
        }
    } else if ay >= az {
        if y > 0.0 {
            Side::Bottom
        } else {
            Side::Top
        }
    } else if z > 0.0 {
        Side::Back
    } else {
        Side::Front
    }
}

impl TapDetector for ThresholdDetector {
    fn on_sensor_changed(
        &mut self,
        timestamp: u64,
        sensor: SensorType,
        accuracy: Accuracy,
        values: &[f32],
    ) {
        if sensor != SensorType::Accelerometer {
            trace!("Ignoring {} sample", sensor);
            return;
        }

        if accuracy == Accuracy::Unreliable || self.accuracy == Accuracy::Unreliable {
            trace!("Skipping unreliable accelerometer sample at {}", timestamp);
            return;
        }

        let sample = match values {
            [x, y, z, ..] => [*x, *y, *z],
            _ => {
                warn!("Accelerometer sample with {} values, need 3", values.len());
                return;
            }
        };

        let Some(gravity) = self.gravity else {
            self.gravity = Some(sample);
            return;
        };

        let linear = [
            sample[0] - gravity[0],
            sample[1] - gravity[1],
            sample[2] - gravity[2],
        ];
        self.gravity = Some([
            GRAVITY_SMOOTHING * gravity[0] + (1.0 - GRAVITY_SMOOTHING) * sample[0],
            GRAVITY_SMOOTHING * gravity[1] + (1.0 - GRAVITY_SMOOTHING) * sample[1],
            GRAVITY_SMOOTHING * gravity[2] + (1.0 - GRAVITY_SMOOTHING) * sample[2],
        ]);

        let magnitude = linear.iter().map(|v| v * v).sum::<f32>().sqrt();
        if magnitude < self.threshold || self.in_refractory_period(timestamp) {
            return;
        }

        let side = side_from_acceleration(linear);
        self.last_tap = Some(timestamp);
        debug!(
            "Tap on {} at {} (linear acceleration {:.2})",
            side, timestamp, magnitude
        );
        self.observers.notify(timestamp, (self.clock)(), side);
    }

    fn on_accuracy_changed(&mut self, sensor: SensorType, accuracy: Accuracy) {
        if sensor != SensorType::Accelerometer {
            return;
        }
        if accuracy != self.accuracy {
            debug!("Accelerometer accuracy {:?} -> {:?}", self.accuracy, accuracy);
        }
        // Samples taken while unreliable may carry a drifted baseline
        if accuracy == Accuracy::Unreliable {
            self.gravity = None;
        }
        self.accuracy = accuracy;
    }

    fn register_tap_observer(&mut self, observer: Arc<dyn TapObserver>) {
        self.observers.register(observer);
    }

    fn remove_tap_observer(&mut self, observer: &Arc<dyn TapObserver>) {
        self.observers.remove(observer);
    }
}
