//! Configuration management for the detection service
//!
//! The daemon reads `config.toml` from the XDG config directory once at
//! startup; command line flags may override individual values afterwards.

mod defaults;
mod loader;
mod schema;

pub use defaults::DEFAULT_CONFIG_TOML;
pub use loader::ConfigLoader;
pub use schema::*;
