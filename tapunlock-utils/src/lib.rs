//! tapunlock-utils: Common utilities shared across tapunlock crates
//!
//! This crate provides:
//! - Unified error types ([`TapUnlockError`], [`Result`])
//! - Logging infrastructure ([`init_logging`], [`LogConfig`])
//! - XDG-compliant path utilities ([`paths`] module)
//! - The monotonic clock shared by client and daemon ([`clock`] module)

pub mod clock;
pub mod error;
pub mod logging;
pub mod paths;

// Re-export main types at crate root for convenience
pub use clock::{millis_to_nanos, monotonic_nanos};
pub use error::{Result, TapUnlockError};
pub use logging::{init_logging, init_logging_with_config, LogConfig, LogOutput};

// Re-export commonly used path functions
pub use paths::{
    config_dir, config_file, data_dir, ensure_all_dirs, log_dir, runtime_dir, socket_path,
    state_dir,
};
