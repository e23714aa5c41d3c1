//! tapunlock - recording client for the tap detection service
//!
//! Walks the operator through recording a tap pattern, confirming it by
//! tapping it again, and installing it.

use std::io::Write;
use std::time::Instant;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use uuid::Uuid;

use tapunlock_protocol::{ClientMessage, ServerMessage};
use tapunlock_utils::{init_logging_with_config, LogConfig, Result, TapUnlockError};

mod cli;
mod commands;
mod config;
mod connection;
mod installer;
mod recorder;

use cli::{Action, Args};
use commands::{parse_command, Command, HELP};
use config::ClientConfig;
use connection::Connection;
use installer::FileInstaller;
use recorder::Recorder;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    // The prompt owns the terminal, so logs go to a file
    init_logging_with_config(LogConfig::client())?;
    tracing::info!("tapunlock client starting");
    tracing::debug!("CLI args: {:?}", args);

    match run_app(args).await {
        Ok(()) => {
            tracing::info!("tapunlock client exiting normally");
            Ok(())
        }
        Err(e) => {
            tracing::error!("tapunlock client error: {}", e);
            eprintln!("Error: {}", e);
            Err(e)
        }
    }
}

async fn run_app(args: Args) -> Result<()> {
    let mut config = ClientConfig::load(args.config.as_deref())?;
    args.apply_overrides(&mut config);

    match args.action() {
        Action::Record => record(config).await,
        Action::Ping => ping(&config).await,
        Action::Show => show(&config),
    }
}

/// Interactive prompt driving a [`Recorder`]
async fn record(config: ClientConfig) -> Result<()> {
    let installer = FileInstaller::new(config.install.path());
    let (notice_tx, mut notices) = mpsc::channel(32);
    let (command_tx, commands) = mpsc::channel(8);

    let recorder = tokio::spawn(Recorder::new(&config, installer, notice_tx).run(commands));

    println!("{}", HELP);
    prompt();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_command(&line) {
                    Ok(Command::Quit) => break,
                    Ok(Command::Help) => println!("{}", HELP),
                    Ok(command) => {
                        if command_tx.send(command).await.is_err() {
                            break;
                        }
                    }
                    Err(commands::ParseError::Empty) => {}
                    Err(e) => println!("{}", e),
                }
                prompt();
            }

            notice = notices.recv() => match notice {
                Some(notice) => {
                    println!("\r{}", notice);
                    prompt();
                }
                None => break,
            },
        }
    }

    drop(command_tx);
    recorder
        .await
        .map_err(|e| TapUnlockError::internal(format!("recorder task failed: {}", e)))?
}

fn prompt() {
    print!("tapunlock> ");
    let _ = std::io::stdout().flush();
}

/// Handshake and measure one ping round trip
async fn ping(config: &ClientConfig) -> Result<()> {
    let mut connection = Connection::with_socket_path(config.connection.socket_path());
    let version = connection
        .connect_and_handshake(Uuid::new_v4(), config.connection.handshake_timeout())
        .await?;

    let started = Instant::now();
    connection.send(ClientMessage::Ping).await?;
    let reply = tokio::time::timeout(config.connection.handshake_timeout(), connection.recv())
        .await
        .map_err(|_| TapUnlockError::connection("ping timed out"))?;
    connection.disconnect().await;

    match reply {
        Some(ServerMessage::Pong) => {
            println!(
                "tapunlock-server {} at {}: {:.1}ms",
                version,
                connection.socket_path().display(),
                started.elapsed().as_secs_f64() * 1000.0
            );
            Ok(())
        }
        Some(other) => Err(TapUnlockError::InvalidMessage(format!(
            "expected Pong, got {}",
            other.type_name()
        ))),
        None => Err(TapUnlockError::ConnectionClosed),
    }
}

fn show(config: &ClientConfig) -> Result<()> {
    let installer = FileInstaller::new(config.install.path());
    match installer.load()? {
        Some(pattern) => println!("{}", pattern),
        None => println!("no pattern installed at {}", installer.path().display()),
    }
    Ok(())
}
