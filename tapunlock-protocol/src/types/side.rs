use serde::{Deserialize, Serialize};

/// Physical face of the device a tap is attributed to
///
/// The discriminants are the ordinals used on the wire. [`Side::Any`] is a
/// wildcard that only makes sense in a reference pattern; detectors never
/// produce it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Side {
    Front = 0,
    Back = 1,
    Left = 2,
    Right = 3,
    Top = 4,
    Bottom = 5,
    Any = 6,
}

impl Side {
    /// All sides in ordinal order
    pub const ALL: [Side; 7] = [
        Side::Front,
        Side::Back,
        Side::Left,
        Side::Right,
        Side::Top,
        Side::Bottom,
        Side::Any,
    ];

    /// Wire ordinal of this side
    pub fn ordinal(self) -> u32 {
        self as u32
    }

    /// Look up a side by its wire ordinal
    pub fn from_ordinal(ordinal: u32) -> Option<Side> {
        Self::ALL.get(ordinal as usize).copied()
    }

    /// Whether this side accepts `other` at the same position
    ///
    /// Symmetric: the wildcard is honoured on either side of the comparison.
    pub fn accepts(self, other: Side) -> bool {
        self == other || self == Side::Any || other == Side::Any
    }

    /// Upper case name as used in logs and pattern dumps
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Front => "FRONT",
            Side::Back => "BACK",
            Side::Left => "LEFT",
            Side::Right => "RIGHT",
            Side::Top => "TOP",
            Side::Bottom => "BOTTOM",
            Side::Any => "ANY",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|side| side.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown side '{}'", s))
    }
}
