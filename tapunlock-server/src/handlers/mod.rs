//! Message handlers for client requests
//!
//! Routes incoming `ClientMessage` values to the handler for each request and
//! answers with exactly one `ServerMessage`. Matches are pushed separately
//! by the [`DetectionService`](crate::service::DetectionService).

mod connection;
mod recording;
mod watch;

use std::sync::Arc;

use tapunlock_protocol::{ClientMessage, ErrorCode, ServerMessage};

use crate::registry::{ClientId, ClientRegistry};
use crate::service::DetectionService;

/// Context for message handlers
///
/// Provides access to the daemon state needed to handle client requests.
pub struct HandlerContext {
    /// Tap buffer and watch evaluation
    pub service: Arc<DetectionService>,
    /// Client connection registry
    pub registry: Arc<ClientRegistry>,
    /// The client making this request
    pub client_id: ClientId,
}

impl HandlerContext {
    /// Create a new handler context
    pub fn new(service: Arc<DetectionService>, client_id: ClientId) -> Self {
        let registry = Arc::clone(service.registry());
        Self {
            service,
            registry,
            client_id,
        }
    }

    /// Route a client message to the appropriate handler
    pub fn route_message(&self, msg: ClientMessage) -> ServerMessage {
        match msg {
            ClientMessage::Connect {
                client_id,
                protocol_version,
            } => self.handle_connect(client_id, protocol_version),

            ClientMessage::Ping => self.handle_ping(),

            ClientMessage::BeginRecording { from_timestamp } => {
                self.handle_begin_recording(from_timestamp)
            }

            ClientMessage::RequestTapsInWindow {
                from_timestamp,
                until_timestamp,
            } => self.handle_request_taps_in_window(from_timestamp, until_timestamp),

            ClientMessage::WatchForMatch {
                subscription_id,
                pattern,
            } => self.handle_watch_for_match(subscription_id, pattern),

            ClientMessage::Unsubscribe => self.handle_unsubscribe(),
        }
    }

    /// Create an error response
    pub fn error(code: ErrorCode, message: impl Into<String>) -> ServerMessage {
        ServerMessage::Error {
            code,
            message: message.into(),
        }
    }
}
