//! Client-server message types

use serde::{Deserialize, Serialize};

use uuid::Uuid;

use crate::types::WirePattern;

/// Messages sent from the recording client to the detection service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ClientMessage {
    /// Initial connection handshake
    Connect {
        client_id: Uuid,
        protocol_version: u32,
    },

    /// Keep every tap from `from_timestamp` on until the window is requested
    ///
    /// Replaces any subscription this client holds.
    BeginRecording { from_timestamp: u64 },

    /// Request the taps observed in `[from_timestamp, until_timestamp]`
    RequestTapsInWindow {
        from_timestamp: u64,
        until_timestamp: u64,
    },

    /// Push a [`ServerMessage::Match`] every time the taps match `pattern`
    ///
    /// Replaces any subscription this client holds. `subscription_id` is
    /// echoed back with each match so stale deliveries can be told apart.
    WatchForMatch {
        subscription_id: u64,
        pattern: WirePattern,
    },

    /// Drop whatever subscription this client holds
    Unsubscribe,

    /// Ping for keepalive
    Ping,
}

impl ClientMessage {
    /// Return the message type name for logging
    pub fn type_name(&self) -> &'static str {
        match self {
            ClientMessage::Connect { .. } => "Connect",
            ClientMessage::BeginRecording { .. } => "BeginRecording",
            ClientMessage::RequestTapsInWindow { .. } => "RequestTapsInWindow",
            ClientMessage::WatchForMatch { .. } => "WatchForMatch",
            ClientMessage::Unsubscribe => "Unsubscribe",
            ClientMessage::Ping => "Ping",
        }
    }
}

/// Messages sent from the detection service to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ServerMessage {
    /// Connection accepted
    Connected {
        server_version: String,
        protocol_version: u32,
    },

    /// Recording subscription installed
    RecordingStarted { from_timestamp: u64 },

    /// Taps observed in the requested window
    TapsInWindow { pattern: WirePattern },

    /// Watch subscription installed
    Watching { subscription_id: u64 },

    /// Pushed when recent taps matched the watched pattern
    Match {
        subscription_id: u64,
        pattern: WirePattern,
    },

    /// Subscription dropped
    Unsubscribed,

    /// Request failed
    Error { code: ErrorCode, message: String },

    /// Keepalive response
    Pong,
}

impl ServerMessage {
    /// Return the message type name for logging
    pub fn type_name(&self) -> &'static str {
        match self {
            ServerMessage::Connected { .. } => "Connected",
            ServerMessage::RecordingStarted { .. } => "RecordingStarted",
            ServerMessage::TapsInWindow { .. } => "TapsInWindow",
            ServerMessage::Watching { .. } => "Watching",
            ServerMessage::Match { .. } => "Match",
            ServerMessage::Unsubscribed => "Unsubscribed",
            ServerMessage::Error { .. } => "Error",
            ServerMessage::Pong => "Pong",
        }
    }
}

/// Error codes for protocol errors
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    ProtocolMismatch,
    /// Pattern data failed validation
    MalformedPattern,
    /// An empty pattern can never be matched by taps
    EmptyPattern,
    /// Requested window ends before it starts
    InvalidWindow,
    InternalError,
}
