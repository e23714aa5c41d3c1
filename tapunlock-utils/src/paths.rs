//! Path utilities for tapunlock
//!
//! Handles XDG Base Directory specification compliance for config,
//! state, data and runtime directories.

use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Application identifier for XDG directories
const APP_NAME: &str = "tapunlock";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME)
}

/// Get the Unix socket path for client-daemon communication
///
/// Location: `$XDG_RUNTIME_DIR/tapunlock/tapunlock.sock` or
/// `/tmp/tapunlock-$UID/tapunlock.sock`
pub fn socket_path() -> PathBuf {
    runtime_dir().join("tapunlock.sock")
}

/// Get the runtime directory
///
/// Location: `$XDG_RUNTIME_DIR/tapunlock` or `/tmp/tapunlock-$UID`
pub fn runtime_dir() -> PathBuf {
    if let Ok(xdg_runtime) = std::env::var("XDG_RUNTIME_DIR") {
        PathBuf::from(xdg_runtime).join(APP_NAME)
    } else {
        // Fallback to /tmp with UID for security
        // SAFETY: getuid() is always safe to call
        let uid = unsafe { libc::getuid() };
        PathBuf::from(format!("/tmp/{}-{}", APP_NAME, uid))
    }
}

/// Get the configuration directory
///
/// Location: `$XDG_CONFIG_HOME/tapunlock` or `~/.config/tapunlock`
pub fn config_dir() -> PathBuf {
    project_dirs()
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(fallback_config_dir)
}

/// Get the main configuration file path
///
/// Location: `$XDG_CONFIG_HOME/tapunlock/config.toml`
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Get the state directory
///
/// Location: `$XDG_STATE_HOME/tapunlock` or `~/.local/state/tapunlock`
pub fn state_dir() -> PathBuf {
    project_dirs()
        .and_then(|p| p.state_dir().map(|d| d.to_path_buf()))
        .unwrap_or_else(fallback_state_dir)
}

/// Get the data directory (the installed pattern lives here by default)
///
/// Location: `$XDG_DATA_HOME/tapunlock` or `~/.local/share/tapunlock`
pub fn data_dir() -> PathBuf {
    project_dirs()
        .map(|p| p.data_local_dir().to_path_buf())
        .unwrap_or_else(fallback_data_dir)
}

/// Get the log directory
///
/// Location: `$XDG_STATE_HOME/tapunlock/log`
pub fn log_dir() -> PathBuf {
    state_dir().join("log")
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Ensure all required directories exist
pub fn ensure_all_dirs() -> std::io::Result<()> {
    ensure_dir(&runtime_dir())?;
    ensure_dir(&config_dir())?;
    ensure_dir(&state_dir())?;
    ensure_dir(&data_dir())?;
    ensure_dir(&log_dir())?;
    Ok(())
}

// Fallback implementations when ProjectDirs is unavailable

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

fn fallback_config_dir() -> PathBuf {
    home_dir().join(".config").join(APP_NAME)
}

fn fallback_state_dir() -> PathBuf {
    home_dir().join(".local").join("state").join(APP_NAME)
}

fn fallback_data_dir() -> PathBuf {
    home_dir().join(".local").join("share").join(APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Serializes tests that modify XDG_RUNTIME_DIR
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    // ==================== Socket Path Tests ====================

    #[test]
    fn test_socket_path_has_correct_filename() {
        let path = socket_path();
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), "tapunlock.sock");
    }

    #[test]
    fn test_socket_path_is_in_runtime_dir() {
        let _guard = ENV_MUTEX.lock().unwrap();
        assert!(socket_path().starts_with(runtime_dir()));
    }

    // ==================== Runtime Dir Tests ====================

    #[test]
    fn test_runtime_dir_with_xdg_set() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let original = env::var("XDG_RUNTIME_DIR").ok();

        env::set_var("XDG_RUNTIME_DIR", "/run/user/1000");
        let path = runtime_dir();
        assert_eq!(path, PathBuf::from("/run/user/1000/tapunlock"));

        match original {
            Some(val) => env::set_var("XDG_RUNTIME_DIR", val),
            None => env::remove_var("XDG_RUNTIME_DIR"),
        }
    }

    #[test]
    fn test_runtime_dir_fallback() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let original = env::var("XDG_RUNTIME_DIR").ok();

        env::remove_var("XDG_RUNTIME_DIR");
        let path = runtime_dir();
        assert!(path.to_string_lossy().starts_with("/tmp/tapunlock-"));

        if let Some(val) = original {
            env::set_var("XDG_RUNTIME_DIR", val);
        }
    }

    // ==================== Config Tests ====================

    #[test]
    fn test_config_file_name() {
        let path = config_file();
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), "config.toml");
        assert!(path.starts_with(config_dir()));
    }

    #[test]
    fn test_dirs_contain_app_name() {
        assert!(config_dir().to_string_lossy().contains("tapunlock"));
        assert!(state_dir().to_string_lossy().contains("tapunlock"));
        assert!(data_dir().to_string_lossy().contains("tapunlock"));
    }

    #[test]
    fn test_log_dir_in_state_dir() {
        assert!(log_dir().starts_with(state_dir()));
        assert!(log_dir().ends_with("log"));
    }

    // ==================== ensure_dir Tests ====================

    #[test]
    fn test_ensure_dir_creates_nested() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");

        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());

        // Second call is a no-op
        ensure_dir(&nested).unwrap();
    }
}
