//! Connection client for the detection service

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use uuid::Uuid;

use tapunlock_protocol::{ClientCodec, ClientMessage, ErrorCode, ServerMessage, PROTOCOL_VERSION};
use tapunlock_utils::{Result, TapUnlockError};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Client connection to the detection service
pub struct Connection {
    /// Unix socket of the daemon
    socket_path: PathBuf,
    /// Current state
    state: ConnectionState,
    /// Channel for outgoing messages
    tx: mpsc::Sender<ClientMessage>,
    /// Channel for receiving messages
    rx: mpsc::Receiver<ServerMessage>,
    /// Handle to the connection task
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl Connection {
    /// Create a connection to `socket_path` (not yet connected)
    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        let (tx, _) = mpsc::channel(100);
        let (_, rx) = mpsc::channel(100);

        Self {
            socket_path,
            state: ConnectionState::Disconnected,
            tx,
            rx,
            task_handle: None,
        }
    }

    /// Get current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Connect to the server
    pub async fn connect(&mut self) -> Result<()> {
        if self.state == ConnectionState::Connected {
            return Ok(());
        }

        self.state = ConnectionState::Connecting;

        if !self.socket_path.exists() {
            self.state = ConnectionState::Disconnected;
            return Err(TapUnlockError::ServerNotRunning {
                path: self.socket_path.clone(),
            });
        }

        let stream = UnixStream::connect(&self.socket_path).await.map_err(|e| {
            self.state = ConnectionState::Disconnected;
            TapUnlockError::Connection(format!(
                "Failed to connect to {}: {}",
                self.socket_path.display(),
                e
            ))
        })?;

        // Create framed transport with codec
        let framed = Framed::new(stream, ClientCodec::new());

        // Set up channels
        let (outgoing_tx, outgoing_rx) = mpsc::channel::<ClientMessage>(100);
        let (incoming_tx, incoming_rx) = mpsc::channel::<ServerMessage>(100);

        self.tx = outgoing_tx;
        self.rx = incoming_rx;

        // Spawn connection task
        let handle = tokio::spawn(Self::connection_task(framed, outgoing_rx, incoming_tx));
        self.task_handle = Some(handle);

        self.state = ConnectionState::Connected;
        Ok(())
    }

    /// Connect and perform the protocol handshake
    ///
    /// Returns the server version. The connection is closed again if the
    /// handshake fails.
    pub async fn connect_and_handshake(
        &mut self,
        client_id: Uuid,
        timeout: Duration,
    ) -> Result<String> {
        self.connect().await?;

        let result = self.handshake(client_id, timeout).await;
        if result.is_err() {
            self.disconnect().await;
        }
        result
    }

    async fn handshake(&mut self, client_id: Uuid, timeout: Duration) -> Result<String> {
        self.send(ClientMessage::Connect {
            client_id,
            protocol_version: PROTOCOL_VERSION,
        })
        .await?;

        let reply = tokio::time::timeout(timeout, self.recv())
            .await
            .map_err(|_| TapUnlockError::connection("handshake timed out"))?;

        match reply {
            Some(ServerMessage::Connected {
                server_version,
                protocol_version,
            }) => {
                tracing::info!(
                    "Connected to tapunlock-server {} (protocol {})",
                    server_version,
                    protocol_version
                );
                Ok(server_version)
            }
            Some(ServerMessage::Error {
                code: ErrorCode::ProtocolMismatch,
                message,
            }) => Err(TapUnlockError::protocol(message)),
            Some(other) => Err(TapUnlockError::InvalidMessage(format!(
                "expected Connected, got {}",
                other.type_name()
            ))),
            None => Err(TapUnlockError::ConnectionClosed),
        }
    }

    /// Disconnect from server
    pub async fn disconnect(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
        self.state = ConnectionState::Disconnected;
    }

    /// Send a message to the server
    pub async fn send(&self, msg: ClientMessage) -> Result<()> {
        if self.state != ConnectionState::Connected {
            return Err(TapUnlockError::connection("Not connected"));
        }

        self.tx
            .send(msg)
            .await
            .map_err(|_| TapUnlockError::ConnectionClosed)?;

        Ok(())
    }

    /// Receive next message from server
    ///
    /// Returns `None` once the connection is gone.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        self.rx.recv().await
    }

    /// Background task that handles the actual socket I/O
    async fn connection_task(
        mut framed: Framed<UnixStream, ClientCodec>,
        mut outgoing: mpsc::Receiver<ClientMessage>,
        incoming: mpsc::Sender<ServerMessage>,
    ) {
        loop {
            tokio::select! {
                // Handle outgoing messages
                Some(msg) = outgoing.recv() => {
                    if let Err(e) = framed.send(msg).await {
                        tracing::error!("Failed to send message: {}", e);
                        break;
                    }
                }

                // Handle incoming messages
                result = framed.next() => {
                    match result {
                        Some(Ok(msg)) => {
                            tracing::debug!("Received {} from server", msg.type_name());
                            if incoming.send(msg).await.is_err() {
                                tracing::debug!("Incoming channel closed, receiver dropped");
                                break;
                            }
                        }
                        Some(Err(e)) => {
                            tracing::error!("Failed to receive message: {}", e);
                            break;
                        }
                        None => {
                            tracing::info!("Server closed connection");
                            break;
                        }
                    }
                }
            }
        }
    }
}
