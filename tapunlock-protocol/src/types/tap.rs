use serde::{Deserialize, Serialize};

use super::side::Side;

/// A single detected tap
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tap {
    /// When the tap happened, in nanoseconds on the shared monotonic clock
    pub timestamp: u64,
    /// Side the tap was attributed to
    pub side: Side,
}

impl Tap {
    pub fn new(timestamp: u64, side: Side) -> Self {
        Self { timestamp, side }
    }
}
