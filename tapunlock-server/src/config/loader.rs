//! Configuration loader

use std::path::Path;

use tapunlock_utils::{config_file, Result, TapUnlockError};

use super::AppConfig;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from default location
    pub fn load() -> Result<AppConfig> {
        let path = config_file();
        if path.exists() {
            Self::load_from_path(&path)
        } else {
            Ok(AppConfig::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<AppConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| TapUnlockError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content, path)
    }

    /// Parse configuration from string
    pub fn parse(content: &str, path: &Path) -> Result<AppConfig> {
        toml::from_str(content).map_err(|e| TapUnlockError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Validate configuration
    pub fn validate(config: &AppConfig) -> Result<()> {
        if config.buffer.capacity == 0 || config.buffer.capacity > 65_536 {
            return Err(TapUnlockError::config(
                "buffer.capacity must be between 1 and 65536",
            ));
        }

        // A recording must survive at least a few seconds of tapping
        if config.buffer.retention_ms < 1_000 {
            return Err(TapUnlockError::config(
                "buffer.retention_ms must be at least 1000",
            ));
        }

        if !config.detector.threshold.is_finite() || config.detector.threshold <= 0.0 {
            return Err(TapUnlockError::config(
                "detector.threshold must be a positive number",
            ));
        }

        if config.detector.refractory_ms > 2_000 {
            return Err(TapUnlockError::config(
                "detector.refractory_ms must be at most 2000",
            ));
        }

        if config.sensor.source.is_empty() {
            return Err(TapUnlockError::config("sensor.source must not be empty"));
        }

        Ok(())
    }

    /// Load from an explicit path if given, else the default location, and validate
    pub fn load_and_validate(path: Option<&Path>) -> Result<AppConfig> {
        let config = match path {
            Some(path) => Self::load_from_path(path)?,
            None => Self::load()?,
        };
        Self::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectorKind;
    use tempfile::tempdir;

    #[test]
    fn test_load_from_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        std::fs::write(
            &path,
            r#"
            [buffer]
            capacity = 32

            [sensor]
            source = "/run/tapunlock/sensors.fifo"
            "#,
        )
        .unwrap();

        let config = ConfigLoader::load_from_path(&path).unwrap();
        assert_eq!(config.buffer.capacity, 32);
        assert_eq!(config.buffer.retention_ms, 30_000);
        assert_eq!(config.sensor.source, "/run/tapunlock/sensors.fifo");
        assert!(!config.sensor.is_stdin());
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let dir = tempdir().unwrap();
        let result = ConfigLoader::load_and_validate(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(TapUnlockError::FileRead { .. })));
    }

    #[test]
    fn test_parse_detector_kind() {
        let config = ConfigLoader::parse(
            "[detector]\nkind = \"threshold\"\nthreshold = 4.0\n",
            Path::new("test.toml"),
        )
        .unwrap();
        assert_eq!(config.detector.kind, DetectorKind::Threshold);
        assert_eq!(config.detector.threshold, 4.0);
    }

    #[test]
    fn test_parse_unknown_detector_kind() {
        let result = ConfigLoader::parse("[detector]\nkind = \"neural\"\n", Path::new("test.toml"));
        assert!(matches!(result, Err(TapUnlockError::ConfigInvalid { .. })));
    }

    #[test]
    fn test_parse_invalid_toml() {
        let result = ConfigLoader::parse("invalid { toml", Path::new("test.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_defaults() {
        assert!(ConfigLoader::validate(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_zero_capacity() {
        let mut config = AppConfig::default();
        config.buffer.capacity = 0;
        assert!(ConfigLoader::validate(&config).is_err());
    }

    #[test]
    fn test_validate_short_retention() {
        let mut config = AppConfig::default();
        config.buffer.retention_ms = 10;
        assert!(ConfigLoader::validate(&config).is_err());
    }

    #[test]
    fn test_validate_threshold() {
        let mut config = AppConfig::default();
        config.detector.threshold = 0.0;
        assert!(ConfigLoader::validate(&config).is_err());

        config.detector.threshold = f32::NAN;
        assert!(ConfigLoader::validate(&config).is_err());
    }

    #[test]
    fn test_socket_path_override() {
        let mut config = AppConfig::default();
        assert!(config.server.socket_path().ends_with("tapunlock.sock"));

        config.server.socket_path = Some("/tmp/custom.sock".into());
        assert_eq!(config.server.socket_path(), Path::new("/tmp/custom.sock"));
    }
}
