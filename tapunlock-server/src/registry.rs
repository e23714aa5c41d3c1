//! Client Connection Registry
//!
//! Tracks connected clients, their outbound channels and the single
//! subscription each client may hold. Installing a subscription replaces the
//! previous one under the client's entry lock, so once the replacement
//! returns no match for the old subscription can be produced.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, error};
use uuid::Uuid;

use tapunlock_protocol::{ServerMessage, TapPattern};

/// Unique client identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

impl ClientId {
    /// Create a new ClientId from a raw value (mainly for testing)
    #[cfg(test)]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Client({})", self.0)
    }
}

/// A live watch for a reference pattern
#[derive(Debug, Clone, PartialEq)]
pub struct WatchSubscription {
    /// Client chosen id, echoed back in every match
    pub subscription_id: u64,
    /// Reference pattern to compare recent taps against
    pub pattern: TapPattern,
    /// Only taps after this instant are considered
    pub armed_at: u64,
    /// Timestamp of the last tap that completed a match
    pub last_match_at: Option<u64>,
}

impl WatchSubscription {
    pub fn new(subscription_id: u64, pattern: TapPattern, armed_at: u64) -> Self {
        Self {
            subscription_id,
            pattern,
            armed_at,
            last_match_at: None,
        }
    }

    /// Taps at or before this timestamp can no longer take part in a match
    pub fn consumed_until(&self) -> u64 {
        self.last_match_at
            .map_or(self.armed_at, |last| last.max(self.armed_at))
    }
}

/// What a client is currently listening for
#[derive(Debug, Clone, PartialEq)]
pub enum Subscription {
    /// Collecting taps from `from_timestamp` until the window is requested
    Recording { from_timestamp: u64 },
    /// Waiting for the taps to match a pattern
    Watching(WatchSubscription),
}

/// Entry for a connected client
pub struct ClientEntry {
    /// Channel for sending messages to this client
    pub sender: mpsc::Sender<ServerMessage>,
    /// Id announced in the handshake
    pub client_uuid: Option<Uuid>,
    /// At most one live subscription
    pub subscription: Option<Subscription>,
}

impl std::fmt::Debug for ClientEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientEntry")
            .field("client_uuid", &self.client_uuid)
            .field("subscription", &self.subscription)
            .field("sender_closed", &self.sender.is_closed())
            .finish()
    }
}

/// Registry tracking all connected clients
///
/// Thread-safe for concurrent access from client handler tasks and the
/// detector feed thread.
pub struct ClientRegistry {
    /// Client ID -> Client entry
    clients: DashMap<ClientId, ClientEntry>,
    /// Counter for generating unique client IDs
    next_client_id: AtomicU64,
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientRegistry {
    /// Create a new empty client registry
    pub fn new() -> Self {
        Self {
            clients: DashMap::new(),
            next_client_id: AtomicU64::new(1),
        }
    }

    // ==================== Client Management ====================

    /// Register a new client connection
    ///
    /// Returns the assigned ClientId for this connection.
    pub fn register_client(&self, sender: mpsc::Sender<ServerMessage>) -> ClientId {
        let id = ClientId(self.next_client_id.fetch_add(1, Ordering::SeqCst));

        let entry = ClientEntry {
            sender,
            client_uuid: None,
            subscription: None,
        };

        self.clients.insert(id, entry);
        debug!("Registered client {}", id);

        id
    }

    /// Unregister a client connection
    ///
    /// Returns the subscription the client still held, if any.
    pub fn unregister_client(&self, client_id: ClientId) -> Option<Subscription> {
        let (_, entry) = self.clients.remove(&client_id)?;
        debug!("Unregistered client {}", client_id);
        entry.subscription
    }

    /// Remember the id a client announced in its handshake
    pub fn set_client_uuid(&self, client_id: ClientId, uuid: Uuid) -> bool {
        match self.clients.get_mut(&client_id) {
            Some(mut entry) => {
                entry.client_uuid = Some(uuid);
                true
            }
            None => false,
        }
    }

    /// Get the number of connected clients
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    // ==================== Subscriptions ====================

    /// Install a subscription, replacing the previous one
    ///
    /// Returns the replaced subscription. Does nothing and returns `None`
    /// if the client is unknown.
    pub fn subscribe(&self, client_id: ClientId, subscription: Subscription) -> Option<Subscription> {
        let mut entry = self.clients.get_mut(&client_id)?;
        let previous = entry.subscription.replace(subscription);
        if previous.is_some() {
            debug!("{} replaced its subscription", client_id);
        }
        previous
    }

    /// Drop the client's subscription
    pub fn unsubscribe(&self, client_id: ClientId) -> Option<Subscription> {
        self.clients.get_mut(&client_id)?.subscription.take()
    }

    /// Drop the client's subscription only if it is a recording
    pub fn clear_recording(&self, client_id: ClientId) -> bool {
        let Some(mut entry) = self.clients.get_mut(&client_id) else {
            return false;
        };
        if matches!(entry.subscription, Some(Subscription::Recording { .. })) {
            entry.subscription = None;
            true
        } else {
            false
        }
    }

    /// Current subscription of a client
    pub fn subscription(&self, client_id: ClientId) -> Option<Subscription> {
        self.clients.get(&client_id)?.subscription.clone()
    }

    /// Start of the oldest active recording across all clients
    pub fn earliest_recording(&self) -> Option<u64> {
        self.clients
            .iter()
            .filter_map(|entry| match entry.subscription {
                Some(Subscription::Recording { from_timestamp }) => Some(from_timestamp),
                _ => None,
            })
            .min()
    }

    /// Run `evaluate` against every watch subscription and deliver the
    /// messages it produces
    ///
    /// `evaluate` returns the timestamp of the newest tap it consumed along
    /// with the message. The watch only advances past that tap once the
    /// message is queued, so a client with a full channel gets another
    /// chance on the next tap.
    ///
    /// Each entry stays locked while it is evaluated, so a concurrent
    /// [`subscribe`](Self::subscribe) either happens before the evaluation or
    /// after the match was delivered. Returns the number of messages sent.
    pub fn evaluate_watches<F>(&self, mut evaluate: F) -> usize
    where
        F: FnMut(&WatchSubscription) -> Option<(u64, ServerMessage)>,
    {
        let mut delivered = 0;
        for mut entry in self.clients.iter_mut() {
            let client_id = *entry.key();
            let entry = entry.value_mut();
            let Some(Subscription::Watching(watch)) = entry.subscription.as_mut() else {
                continue;
            };
            let Some((matched_at, message)) = evaluate(watch) else {
                continue;
            };
            match entry.sender.try_send(message) {
                Ok(()) => {
                    watch.last_match_at = Some(matched_at);
                    delivered += 1;
                }
                Err(e) => error!(
                    "Failed to deliver match for subscription {} to {}: {}",
                    watch.subscription_id, client_id, e
                ),
            }
        }
        delivered
    }
}
