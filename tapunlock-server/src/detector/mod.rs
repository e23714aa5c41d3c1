//! Tap detector capability
//!
//! A detector consumes raw motion samples and reports discrete taps to its
//! registered observers. Detector algorithms are interchangeable behind
//! [`TapDetector`]; the daemon picks one through `detector.kind`.

mod threshold;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tapunlock_protocol::Side;

use crate::config::{DetectorConfig, DetectorKind};

pub use threshold::ThresholdDetector;

/// Motion sensor a sample originates from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorType {
    Accelerometer,
    Gyroscope,
}

impl FromStr for SensorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "accelerometer" | "accel" => Ok(SensorType::Accelerometer),
            "gyroscope" | "gyro" => Ok(SensorType::Gyroscope),
            other => Err(format!("unknown sensor '{}'", other)),
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorType::Accelerometer => write!(f, "accelerometer"),
            SensorType::Gyroscope => write!(f, "gyroscope"),
        }
    }
}

/// Sensor accuracy as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Accuracy {
    Unreliable,
    Low,
    Medium,
    High,
}

impl FromStr for Accuracy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unreliable" => Ok(Accuracy::Unreliable),
            "low" => Ok(Accuracy::Low),
            "medium" => Ok(Accuracy::Medium),
            "high" => Ok(Accuracy::High),
            other => Err(format!("unknown accuracy '{}'", other)),
        }
    }
}

/// Receives taps from a detector
///
/// `on_tap` is called at most once per physical tap, with timestamps in
/// non-decreasing order. `now` is the clock reading at notification time.
pub trait TapObserver: Send + Sync {
    fn on_tap(&self, timestamp: u64, now: u64, side: Side);
}

/// Turns raw sensor samples into taps
pub trait TapDetector: Send {
    /// Feed one raw sample
    fn on_sensor_changed(
        &mut self,
        timestamp: u64,
        sensor: SensorType,
        accuracy: Accuracy,
        values: &[f32],
    );

    /// Report a change in sensor accuracy
    fn on_accuracy_changed(&mut self, sensor: SensorType, accuracy: Accuracy);

    /// Subscribe an observer; registering the same observer twice is a no-op
    fn register_tap_observer(&mut self, observer: Arc<dyn TapObserver>);

    /// Unsubscribe an observer previously registered
    fn remove_tap_observer(&mut self, observer: &Arc<dyn TapObserver>);
}

/// Build the detector selected by configuration
pub fn build_detector(config: &DetectorConfig) -> Box<dyn TapDetector> {
    match config.kind {
        DetectorKind::Threshold => Box::new(ThresholdDetector::new(config)),
    }
}

/// Observer bookkeeping shared by detector implementations
#[derive(Default)]
pub struct ObserverList {
    observers: Vec<Arc<dyn TapObserver>>,
}

impl ObserverList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, observer: Arc<dyn TapObserver>) {
        if !self.observers.iter().any(|o| same_observer(o, &observer)) {
            self.observers.push(observer);
        }
    }

    pub fn remove(&mut self, observer: &Arc<dyn TapObserver>) {
        self.observers.retain(|o| !same_observer(o, observer));
    }

    pub fn notify(&self, timestamp: u64, now: u64, side: Side) {
        for observer in &self.observers {
            observer.on_tap(timestamp, now, side);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

// Compare data pointers only; vtable pointers for one type may differ
// between codegen units.
fn same_observer(a: &Arc<dyn TapObserver>, b: &Arc<dyn TapObserver>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}
