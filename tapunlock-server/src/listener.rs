//! Unix socket listener
//!
//! Accepts client connections and runs one task per client: a reader loop
//! that routes requests through the handlers, and a writer task fed by the
//! client's outbound channel. Matches pushed by the detection service go
//! through the same channel.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixListener;
use tokio::sync::{broadcast, mpsc};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info, warn};

use tapunlock_protocol::{ServerCodec, ServerMessage};
use tapunlock_utils::{Result, TapUnlockError};

use crate::handlers::HandlerContext;
use crate::service::DetectionService;

/// Outbound messages buffered per client
const CLIENT_CHANNEL_CAPACITY: usize = 64;

/// State shared by the accept loop and every client task
#[derive(Clone)]
pub struct SharedState {
    pub service: Arc<DetectionService>,
    pub shutdown_tx: broadcast::Sender<()>,
}

impl SharedState {
    pub fn new(service: Arc<DetectionService>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            service,
            shutdown_tx,
        }
    }

    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }
}

/// Bind the daemon socket, replacing a stale socket file
pub fn bind(path: &Path) -> Result<UnixListener> {
    if let Some(parent) = path.parent() {
        tapunlock_utils::paths::ensure_dir(parent).map_err(|e| TapUnlockError::FileWrite {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    if path.exists() {
        debug!("Removing stale socket {}", path.display());
        std::fs::remove_file(path).map_err(|e| TapUnlockError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    UnixListener::bind(path).map_err(|e| {
        TapUnlockError::connection(format!("failed to bind {}: {}", path.display(), e))
    })
}

/// Run the accept loop until shutdown is signalled
pub async fn run_accept_loop(listener: UnixListener, shared_state: SharedState) {
    let mut shutdown_rx = shared_state.subscribe_shutdown();

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        debug!("New client connection");
                        let state_clone = shared_state.clone();
                        tokio::spawn(async move {
                            let (reader, writer) = stream.into_split();
                            handle_client(reader, writer, state_clone).await;
                        });
                    }
                    Err(e) => {
                        error!("Accept error: {}", e);
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Shutdown signal received, stopping accept loop");
                break;
            }
        }
    }
}

/// Serve one client until it disconnects or the daemon shuts down
pub async fn handle_client<R, W>(reader: R, writer: W, shared_state: SharedState)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(CLIENT_CHANNEL_CAPACITY);
    let registry = Arc::clone(shared_state.service.registry());
    let client_id = registry.register_client(tx.clone());
    let ctx = HandlerContext::new(Arc::clone(&shared_state.service), client_id);
    info!("{} connected", client_id);

    let mut framed_write = FramedWrite::new(writer, ServerCodec::new());
    let writer_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            debug!("Sending {} to {}", msg.type_name(), client_id);
            if let Err(e) = framed_write.send(msg).await {
                warn!("Write to {} failed: {}", client_id, e);
                break;
            }
        }
    });

    let mut framed_read = FramedRead::new(reader, ServerCodec::new());
    let mut shutdown_rx = shared_state.subscribe_shutdown();

    loop {
        tokio::select! {
            frame = framed_read.next() => {
                match frame {
                    Some(Ok(msg)) => {
                        debug!("Received {} from {}", msg.type_name(), client_id);
                        let response = ctx.route_message(msg);
                        if tx.send(response).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!("Dropping {} after read error: {}", client_id, e);
                        break;
                    }
                    None => break,
                }
            }
            _ = shutdown_rx.recv() => break,
        }
    }

    if registry.unregister_client(client_id).is_some() {
        shared_state.service.refresh_pin();
    }
    drop(ctx);
    drop(tx);
    // Let queued responses drain before the socket closes
    if let Err(e) = writer_task.await {
        warn!("Writer task for {} failed: {}", client_id, e);
    }
    info!("{} disconnected", client_id);
}

/// Removes the socket file when dropped
pub struct SocketGuard(PathBuf);

impl SocketGuard {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }
}

impl Drop for SocketGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.0) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove socket {}: {}", self.0.display(), e);
            }
        }
    }
}
