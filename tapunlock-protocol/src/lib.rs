//! tapunlock-protocol: Tap pattern model and shared IPC definitions
//!
//! This crate defines the tap pattern value type, the tolerance based
//! matcher, and all message types exchanged between the recording client
//! and the detection daemon over Unix sockets.

pub mod codec;
pub mod matcher;
pub mod messages;
pub mod types;

// Re-export main types at crate root
pub use codec::{ClientCodec, CodecError, ServerCodec};
pub use matcher::{matches, MAX_DURATION_TOLERANCE, MAX_TAP_POSITION_TOLERANCE};
pub use messages::{ClientMessage, ErrorCode, ServerMessage};
pub use types::{PatternError, Side, Tap, TapPattern, WirePattern};

/// Current protocol version
pub const PROTOCOL_VERSION: u32 = 1;
