//! Command-line argument parsing for the detection service

use clap::Parser;
use std::path::PathBuf;

use crate::config::AppConfig;

/// tapunlock-server - background tap detection service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file (defaults to the XDG config location)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Custom socket path
    ///
    /// Override the Unix socket path clients connect to.
    #[arg(long, short = 'S', env = "TAPUNLOCK_SOCKET")]
    pub socket: Option<PathBuf>,

    /// Sensor sample source: `-` for stdin, or a file/FIFO path
    #[arg(long)]
    pub sensor_source: Option<String>,

    /// Also log verbosely to stderr, next to the log file
    #[arg(long, default_value_t = false)]
    pub log_stderr: bool,
}

impl Args {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Apply command line overrides on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(socket) = &self.socket {
            config.server.socket_path = Some(socket.clone());
        }
        if let Some(source) = &self.sensor_source {
            config.sensor.source = source.clone();
        }
    }
}
