//! Configuration schema definitions

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub buffer: BufferConfig,
    pub detector: DetectorConfig,
    pub sensor: SensorConfig,
}

/// Socket settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Overrides the default socket location under the runtime directory
    pub socket_path: Option<PathBuf>,
}

impl ServerConfig {
    /// Socket the daemon listens on
    pub fn socket_path(&self) -> PathBuf {
        self.socket_path
            .clone()
            .unwrap_or_else(tapunlock_utils::socket_path)
    }
}

/// Tap buffer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Maximum number of taps kept (default: 256)
    pub capacity: usize,
    /// Age after which unpinned taps are dropped (default: 30s)
    pub retention_ms: u64,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            retention_ms: 30_000,
        }
    }
}

/// Available tap detector implementations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    /// Acceleration spike above a fixed threshold
    #[default]
    Threshold,
}

/// Tap detector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub kind: DetectorKind,
    /// Linear acceleration in m/s^2 that counts as a tap
    pub threshold: f32,
    /// Minimum time between two reported taps
    pub refractory_ms: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            kind: DetectorKind::Threshold,
            threshold: 2.5,
            refractory_ms: 120,
        }
    }
}

/// Sensor feed settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// `-` for stdin, otherwise a file or FIFO path
    pub source: String,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self { source: "-".into() }
    }
}

impl SensorConfig {
    /// Whether the feed comes from stdin
    pub fn is_stdin(&self) -> bool {
        self.source == "-"
    }
}
