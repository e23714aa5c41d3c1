//! Command-line argument parsing for the recording client

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ClientConfig;

/// tapunlock - record and install a tap-to-unlock pattern
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file (defaults to the XDG config location)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Custom socket path
    ///
    /// Override the Unix socket path of the detection service.
    #[arg(long, short = 'S', env = "TAPUNLOCK_SOCKET", global = true)]
    pub socket: Option<PathBuf>,

    /// Where to install the confirmed pattern
    #[arg(long, global = true)]
    pub pattern_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Action>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Record, confirm and install a new pattern (default)
    Record,
    /// Check that the detection service answers
    Ping,
    /// Print the installed pattern
    Show,
}

impl Args {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn action(&self) -> Action {
        self.command.unwrap_or(Action::Record)
    }

    /// Apply command line overrides on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut ClientConfig) {
        if let Some(socket) = &self.socket {
            config.connection.socket_path = Some(socket.clone());
        }
        if let Some(path) = &self.pattern_file {
            config.install.path = Some(path.clone());
        }
    }
}
