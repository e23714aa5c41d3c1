//! Watch subscription handlers
//!
//! Handles: WatchForMatch, Unsubscribe

use tracing::{debug, info, warn};

use tapunlock_protocol::{ErrorCode, ServerMessage, TapPattern, WirePattern};
use tapunlock_utils::monotonic_nanos;

use super::HandlerContext;
use crate::registry::{Subscription, WatchSubscription};

impl HandlerContext {
    /// Handle WatchForMatch - arm a watch for taps from now on
    pub fn handle_watch_for_match(&self, subscription_id: u64, wire: WirePattern) -> ServerMessage {
        let pattern = match TapPattern::try_from(wire) {
            Ok(pattern) => pattern,
            Err(e) => {
                warn!("{} sent a malformed pattern: {}", self.client_id, e);
                return HandlerContext::error(ErrorCode::MalformedPattern, e.to_string());
            }
        };

        if pattern.is_empty() {
            return HandlerContext::error(
                ErrorCode::EmptyPattern,
                "cannot watch for an empty pattern",
            );
        }

        info!(
            "{} watching for {} (subscription {})",
            self.client_id, pattern, subscription_id
        );

        let watch = WatchSubscription::new(subscription_id, pattern, monotonic_nanos());
        let previous = self
            .registry
            .subscribe(self.client_id, Subscription::Watching(watch));

        // A replaced recording may have been pinning the buffer
        if matches!(previous, Some(Subscription::Recording { .. })) {
            self.service.refresh_pin();
        }

        ServerMessage::Watching { subscription_id }
    }

    /// Handle Unsubscribe - drop whatever the client listens for
    pub fn handle_unsubscribe(&self) -> ServerMessage {
        match self.registry.unsubscribe(self.client_id) {
            Some(Subscription::Recording { .. }) => self.service.refresh_pin(),
            Some(Subscription::Watching(watch)) => {
                debug!(
                    "{} dropped subscription {}",
                    self.client_id, watch.subscription_id
                );
            }
            None => debug!("{} had no subscription", self.client_id),
        }
        ServerMessage::Unsubscribed
    }
}
