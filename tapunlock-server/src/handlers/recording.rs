//! Recording message handlers
//!
//! Handles: BeginRecording, RequestTapsInWindow

use tracing::{debug, info};

use tapunlock_protocol::{ErrorCode, ServerMessage};

use super::HandlerContext;
use crate::registry::Subscription;

impl HandlerContext {
    /// Handle BeginRecording - keep taps from `from_timestamp` on
    pub fn handle_begin_recording(&self, from_timestamp: u64) -> ServerMessage {
        info!("{} recording from {}", self.client_id, from_timestamp);

        self.registry
            .subscribe(self.client_id, Subscription::Recording { from_timestamp });
        self.service.refresh_pin();

        ServerMessage::RecordingStarted { from_timestamp }
    }

    /// Handle RequestTapsInWindow - hand out the recorded taps
    ///
    /// Ends the client's recording, if it has one.
    pub fn handle_request_taps_in_window(
        &self,
        from_timestamp: u64,
        until_timestamp: u64,
    ) -> ServerMessage {
        if until_timestamp < from_timestamp {
            return HandlerContext::error(
                ErrorCode::InvalidWindow,
                format!(
                    "window ends at {} before it starts at {}",
                    until_timestamp, from_timestamp
                ),
            );
        }

        let pattern = self.service.taps_in_window(from_timestamp, until_timestamp);
        if self.registry.clear_recording(self.client_id) {
            self.service.refresh_pin();
        }

        debug!("{} recorded {}", self.client_id, pattern);
        ServerMessage::TapsInWindow {
            pattern: pattern.to_wire(),
        }
    }
}
