//! Default configuration values
//!
//! These are embedded in the binary and used when no config file exists.

/// Default configuration as TOML (for reference/documentation)
pub const DEFAULT_CONFIG_TOML: &str = r##"
# tapunlock detection service configuration

[server]
# socket_path = "/run/user/1000/tapunlock/tapunlock.sock"

[buffer]
# Maximum number of taps kept in memory
capacity = 256
# Taps older than this are dropped unless a recording still needs them
retention_ms = 30000

[detector]
kind = "threshold"
# Linear acceleration (m/s^2) that counts as a tap
threshold = 2.5
# Minimum distance between two taps
refractory_ms = 120

[sensor]
# "-" reads the sensor feed from stdin, anything else is a file or FIFO path
source = "-"
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, ConfigLoader};
    use std::path::Path;

    #[test]
    fn test_default_toml_matches_default_struct() {
        let parsed = ConfigLoader::parse(DEFAULT_CONFIG_TOML, Path::new("defaults.toml")).unwrap();
        assert_eq!(parsed, AppConfig::default());
    }
}
