//! Connection-related message handlers
//!
//! Handles: Connect, Ping

use tracing::{debug, info};
use uuid::Uuid;

use tapunlock_protocol::{ErrorCode, ServerMessage, PROTOCOL_VERSION};

use super::HandlerContext;

impl HandlerContext {
    /// Handle Connect message - validate protocol version
    pub fn handle_connect(&self, client_uuid: Uuid, protocol_version: u32) -> ServerMessage {
        info!(
            "Client {} (UUID: {}) connecting with protocol version {}",
            self.client_id, client_uuid, protocol_version
        );

        if protocol_version != PROTOCOL_VERSION {
            return HandlerContext::error(
                ErrorCode::ProtocolMismatch,
                format!(
                    "Protocol version mismatch: client={}, server={}",
                    protocol_version, PROTOCOL_VERSION
                ),
            );
        }

        self.registry.set_client_uuid(self.client_id, client_uuid);

        ServerMessage::Connected {
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: PROTOCOL_VERSION,
        }
    }

    /// Handle Ping message - simple heartbeat response
    pub fn handle_ping(&self) -> ServerMessage {
        debug!("Received Ping from {}, sending Pong", self.client_id);
        ServerMessage::Pong
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::tests::create_test_context;

    #[test]
    fn test_handle_connect_success() {
        let (ctx, _rx) = create_test_context();

        match ctx.handle_connect(Uuid::new_v4(), PROTOCOL_VERSION) {
            ServerMessage::Connected {
                server_version,
                protocol_version,
            } => {
                assert_eq!(server_version, env!("CARGO_PKG_VERSION"));
                assert_eq!(protocol_version, PROTOCOL_VERSION);
            }
            other => panic!("Expected Connected, got {:?}", other),
        }
    }

    #[test]
    fn test_handle_connect_version_mismatch() {
        let (ctx, _rx) = create_test_context();

        match ctx.handle_connect(Uuid::new_v4(), PROTOCOL_VERSION + 1) {
            ServerMessage::Error { code, message } => {
                assert_eq!(code, ErrorCode::ProtocolMismatch);
                assert!(message.contains("mismatch"));
            }
            other => panic!("Expected Error, got {:?}", other),
        }
    }

    #[test]
    fn test_handle_ping() {
        let (ctx, _rx) = create_test_context();
        assert_eq!(ctx.handle_ping(), ServerMessage::Pong);
    }
}
