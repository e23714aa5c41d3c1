//! Tap pattern value type and its wire form
//!
//! A tap pattern is described by the side that has been tapped and the pause
//! between two consecutive taps. Force or exact position of a tap are not part
//! of the model.

use serde::{Deserialize, Serialize};

use super::side::Side;
use super::tap::Tap;

/// Errors raised by pattern construction, access and decoding
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    /// A pause of zero or less was appended to a non-empty pattern
    #[error("Pause before tap must be positive, got {pause}")]
    NonPositivePause { pause: i64 },

    #[error("Tap index {index} out of range for pattern of size {size}")]
    IndexOutOfRange { index: usize, size: usize },

    #[error("Malformed pattern data: {0}")]
    MalformedWire(String),
}

/// Flat representation of a pattern used to cross the IPC boundary
///
/// `sides` holds side ordinals (length N), `pauses` the pauses in
/// nanoseconds (length N-1, or empty when N <= 1).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WirePattern {
    pub sides: Vec<u32>,
    pub pauses: Vec<u64>,
}

/// An ordered sequence of taps and the pauses between them
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "WirePattern", into = "WirePattern")]
pub struct TapPattern {
    sides: Vec<Side>,
    /// `pauses[i]` is the time in nanoseconds between tap `i` and tap `i + 1`
    pauses: Vec<u64>,
}

impl TapPattern {
    /// Create an empty tap pattern
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pattern from timestamped taps
    ///
    /// Pauses are the differences between consecutive timestamps. A tap whose
    /// timestamp does not advance past its predecessor cannot be represented
    /// and is skipped.
    pub fn from_taps(taps: &[Tap]) -> Self {
        let mut pattern = Self::new();
        let mut previous: Option<u64> = None;

        for tap in taps {
            let pause = match previous {
                Some(prev) if tap.timestamp <= prev => continue,
                Some(prev) => (tap.timestamp - prev) as i64,
                None => 0,
            };
            if pattern.append_tap(tap.side, pause).is_ok() {
                previous = Some(tap.timestamp);
            }
        }

        pattern
    }

    /// Add a new tap to the end of the pattern
    ///
    /// The pause is ignored for the first tap. For every later tap the pause
    /// must be strictly positive, otherwise the pattern is left unchanged and
    /// [`PatternError::NonPositivePause`] is returned.
    pub fn append_tap(
        &mut self,
        side: Side,
        pause_before_tap: i64,
    ) -> Result<&mut Self, PatternError> {
        if !self.sides.is_empty() {
            if pause_before_tap <= 0 {
                return Err(PatternError::NonPositivePause {
                    pause: pause_before_tap,
                });
            }
            self.pauses.push(pause_before_tap as u64);
        }
        self.sides.push(side);
        Ok(self)
    }

    /// Number of taps in the pattern
    pub fn size(&self) -> usize {
        self.sides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sides.is_empty()
    }

    /// Duration of the pattern in nanoseconds (sum of all pauses)
    pub fn duration(&self) -> u64 {
        self.pauses
            .iter()
            .fold(0u64, |total, &p| total.saturating_add(p))
    }

    /// Side of the tap at index `i`
    pub fn side(&self, i: usize) -> Result<Side, PatternError> {
        self.sides
            .get(i)
            .copied()
            .ok_or(PatternError::IndexOutOfRange {
                index: i,
                size: self.size(),
            })
    }

    /// Pause before the tap at index `i`, 0 for the first tap
    pub fn pause(&self, i: usize) -> Result<u64, PatternError> {
        self.side(i)?;
        if i == 0 {
            return Ok(0);
        }
        Ok(self.pauses[i - 1])
    }

    pub fn sides(&self) -> &[Side] {
        &self.sides
    }

    /// Pauses between consecutive taps (one fewer than the number of taps)
    pub fn pauses(&self) -> &[u64] {
        &self.pauses
    }

    /// Convert to the flat wire representation
    pub fn to_wire(&self) -> WirePattern {
        WirePattern {
            sides: self.sides.iter().map(|s| s.ordinal()).collect(),
            pauses: self.pauses.clone(),
        }
    }

    /// Compare against `candidate` with timing tolerance
    ///
    /// See [`crate::matcher::matches`].
    pub fn matches(&self, candidate: &TapPattern) -> bool {
        crate::matcher::matches(self, Some(candidate))
    }
}

impl TryFrom<WirePattern> for TapPattern {
    type Error = PatternError;

    fn try_from(wire: WirePattern) -> Result<Self, Self::Error> {
        let expected_pauses = wire.sides.len().saturating_sub(1);
        if wire.pauses.len() != expected_pauses {
            return Err(PatternError::MalformedWire(format!(
                "{} sides require {} pauses, got {}",
                wire.sides.len(),
                expected_pauses,
                wire.pauses.len()
            )));
        }

        if let Some(index) = wire.pauses.iter().position(|&p| p == 0) {
            return Err(PatternError::MalformedWire(format!(
                "pause {} is zero",
                index
            )));
        }

        // Pauses are appended as i64, and the duration must fit in a u64
        if let Some(index) = wire.pauses.iter().position(|&p| p > i64::MAX as u64) {
            return Err(PatternError::MalformedWire(format!(
                "pause {} exceeds {}ns",
                index,
                i64::MAX
            )));
        }
        if wire
            .pauses
            .iter()
            .try_fold(0u64, |total, &p| total.checked_add(p))
            .is_none()
        {
            return Err(PatternError::MalformedWire(
                "total duration overflows".into(),
            ));
        }

        let sides = wire
            .sides
            .iter()
            .map(|&ordinal| {
                Side::from_ordinal(ordinal).ok_or_else(|| {
                    PatternError::MalformedWire(format!("unknown side ordinal {}", ordinal))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            sides,
            pauses: wire.pauses,
        })
    }
}

impl From<TapPattern> for WirePattern {
    fn from(pattern: TapPattern) -> Self {
        WirePattern {
            sides: pattern.sides.iter().map(|s| s.ordinal()).collect(),
            pauses: pattern.pauses,
        }
    }
}

impl std::fmt::Display for TapPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TapPattern{{")?;
        for (i, side) in self.sides.iter().enumerate() {
            let pause = if i == 0 { 0 } else { self.pauses[i - 1] };
            write!(f, " {}:{}", pause, side)?;
        }
        write!(f, " }}")
    }
}
