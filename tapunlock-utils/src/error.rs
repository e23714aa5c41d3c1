//! Error types for tapunlock
//!
//! Provides a unified error type used across the daemon and client crates.

use std::path::PathBuf;

/// Main error type for tapunlock operations
#[derive(Debug, thiserror::Error)]
pub enum TapUnlockError {
    // === IO Errors ===

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Connection Errors ===

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Detection service not running at {path}")]
    ServerNotRunning { path: PathBuf },

    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    // === Protocol Errors ===

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Protocol version mismatch: client={client}, server={server}")]
    ProtocolMismatch { client: u32, server: u32 },

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    // === Configuration Errors ===

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    // === Sensor Errors ===

    #[error("Sensor error: {0}")]
    Sensor(String),

    // === Internal Errors ===

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TapUnlockError {
    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a sensor error
    pub fn sensor(msg: impl Into<String>) -> Self {
        Self::Sensor(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if this error is retryable
    ///
    /// Transport failures are worth a reconnect; everything else is not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::ConnectionClosed | Self::ServerNotRunning { .. }
        )
    }
}

/// Result type alias using TapUnlockError
pub type Result<T> = std::result::Result<T, TapUnlockError>;

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Display Tests ====================

    #[test]
    fn test_error_display_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = TapUnlockError::Io(io_err);
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_error_display_file_write() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied");
        let err = TapUnlockError::FileWrite {
            path: PathBuf::from("/root/pattern.json"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to write file"));
        assert!(msg.contains("/root/pattern.json"));
    }

    #[test]
    fn test_error_display_connection() {
        let err = TapUnlockError::Connection("refused".into());
        assert_eq!(err.to_string(), "Connection failed: refused");
    }

    #[test]
    fn test_error_display_server_not_running() {
        let err = TapUnlockError::ServerNotRunning {
            path: PathBuf::from("/tmp/tapunlock.sock"),
        };
        let msg = err.to_string();
        assert!(msg.contains("not running"));
        assert!(msg.contains("/tmp/tapunlock.sock"));
    }

    #[test]
    fn test_error_display_protocol_mismatch() {
        let err = TapUnlockError::ProtocolMismatch {
            client: 1,
            server: 2,
        };
        assert_eq!(
            err.to_string(),
            "Protocol version mismatch: client=1, server=2"
        );
    }

    #[test]
    fn test_error_display_config_invalid() {
        let err = TapUnlockError::ConfigInvalid {
            path: PathBuf::from("config.toml"),
            message: "bad".into(),
        };
        assert_eq!(err.to_string(), "Invalid configuration at config.toml: bad");
    }

    // ==================== Constructor Tests ====================

    #[test]
    fn test_constructors() {
        assert!(matches!(TapUnlockError::connection("x"), TapUnlockError::Connection(_)));
        assert!(matches!(TapUnlockError::protocol("x"), TapUnlockError::Protocol(_)));
        assert!(matches!(TapUnlockError::config("x"), TapUnlockError::Config(_)));
        assert!(matches!(TapUnlockError::sensor("x"), TapUnlockError::Sensor(_)));
        assert!(matches!(TapUnlockError::internal("x"), TapUnlockError::Internal(_)));
    }

    #[test]
    fn test_from_io_error() {
        fn fails() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"))?;
            Ok(())
        }
        assert!(matches!(fails(), Err(TapUnlockError::Io(_))));
    }

    // ==================== Retry Tests ====================

    #[test]
    fn test_is_retryable() {
        assert!(TapUnlockError::connection("refused").is_retryable());
        assert!(TapUnlockError::ConnectionClosed.is_retryable());
        assert!(TapUnlockError::ServerNotRunning {
            path: PathBuf::from("/tmp/x.sock")
        }
        .is_retryable());

        assert!(!TapUnlockError::config("bad").is_retryable());
        assert!(!TapUnlockError::protocol("bad").is_retryable());
        assert!(!TapUnlockError::internal("bad").is_retryable());
    }
}
