//! Client-side configuration loading
//!
//! Reads the `[recording]`, `[connection]` and `[install]` tables from the
//! shared config file. Tables the daemon uses are ignored here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use tapunlock_utils::{config_file, data_dir, millis_to_nanos, Result, TapUnlockError};

/// Client configuration (subset of the shared config file)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub recording: RecordingConfig,
    pub connection: ConnectionConfig,
    pub install: InstallConfig,
}

/// Recording settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Taps this close to `stop` are dropped; they are usually the operator
    /// reaching for the keyboard (default: 150ms)
    pub cutoff_ms: u64,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self { cutoff_ms: 150 }
    }
}

impl RecordingConfig {
    pub fn cutoff_nanos(&self) -> u64 {
        millis_to_nanos(self.cutoff_ms)
    }
}

/// Connection settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Overrides the default socket location
    pub socket_path: Option<PathBuf>,
    /// Wait between reconnect attempts (default: 1000ms)
    pub reconnect_delay_ms: u64,
    /// Give up after this many failed attempts in a row (default: 5)
    pub max_reconnect_attempts: u32,
    /// How long to wait for the handshake reply (default: 2000ms)
    pub handshake_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            socket_path: None,
            reconnect_delay_ms: 1_000,
            max_reconnect_attempts: 5,
            handshake_timeout_ms: 2_000,
        }
    }
}

impl ConnectionConfig {
    pub fn socket_path(&self) -> PathBuf {
        self.socket_path
            .clone()
            .unwrap_or_else(tapunlock_utils::socket_path)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

/// Where confirmed patterns are installed
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Defaults to `pattern.json` in the data directory
    pub path: Option<PathBuf>,
}

impl InstallConfig {
    pub fn path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| data_dir().join("pattern.json"))
    }
}

impl ClientConfig {
    /// Load from `path`, or from the default location if it exists
    ///
    /// A missing default file yields the defaults; a missing explicit file
    /// is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let path = config_file();
                if !path.exists() {
                    return Ok(Self::default());
                }
                path
            }
        };

        let content = std::fs::read_to_string(&path).map_err(|e| TapUnlockError::FileRead {
            path: path.clone(),
            source: e,
        })?;
        let config = Self::parse(&content, &path)?;
        tracing::debug!("Loaded client config from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from string
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| TapUnlockError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.connection.handshake_timeout_ms == 0 {
            return Err(TapUnlockError::ConfigInvalid {
                path: path.to_path_buf(),
                message: "connection.handshake_timeout_ms must be positive".into(),
            });
        }
        Ok(())
    }
}
