//! tapunlock server - Background tap detection daemon
//!
//! Feeds sensor samples into the tap detector, keeps recent taps and serves
//! recording and watch requests over a Unix socket.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{error, info};

use tapunlock_utils::{init_logging_with_config, LogConfig, Result, TapUnlockError};

mod buffer;
mod cli;
mod config;
mod detector;
mod feed;
mod handlers;
mod listener;
mod registry;
mod service;

use cli::Args;
use config::{AppConfig, ConfigLoader};
use detector::{build_detector, TapObserver};
use listener::{SharedState, SocketGuard};
use registry::ClientRegistry;
use service::DetectionService;

/// Run the main server daemon
async fn run_daemon(config: AppConfig) -> Result<()> {
    info!("tapunlock server starting");

    let registry = Arc::new(ClientRegistry::new());
    let service = Arc::new(DetectionService::new(&config.buffer, Arc::clone(&registry)));

    let detector = Arc::new(Mutex::new(build_detector(&config.detector)));
    detector
        .lock()
        .register_tap_observer(Arc::clone(&service) as Arc<dyn TapObserver>);
    info!("Using {:?} detector", config.detector.kind);

    let source = feed::open_source(&config.sensor)?;
    feed::spawn_feed(source, Arc::clone(&detector))?;
    info!("Reading sensor samples from {}", config.sensor.source);

    let socket_path = config.server.socket_path();
    let unix_listener = listener::bind(&socket_path)?;
    let _socket_guard = SocketGuard::new(socket_path.clone());
    info!("Listening on {}", socket_path.display());

    let shared_state = SharedState::new(service);
    let shutdown_tx = shared_state.shutdown_tx.clone();
    let accept_loop = tokio::spawn(listener::run_accept_loop(unix_listener, shared_state));

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| TapUnlockError::internal(format!("failed to wait for ctrl-c: {}", e)))?;
    info!("Interrupted, shutting down");

    let _ = shutdown_tx.send(());
    if let Err(e) = accept_loop.await {
        error!("Accept loop failed: {}", e);
    }

    info!("tapunlock server stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    let log_config = if args.log_stderr {
        LogConfig::foreground()
    } else {
        LogConfig::server()
    };
    init_logging_with_config(log_config)?;

    let mut config = ConfigLoader::load_and_validate(args.config.as_deref())?;
    args.apply_overrides(&mut config);
    ConfigLoader::validate(&config)?;

    match run_daemon(config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("tapunlock server error: {}", e);
            eprintln!("Error: {}", e);
            Err(e)
        }
    }
}
