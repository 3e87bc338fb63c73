//! Subscriber registry and fan-out.
//!
//! The registry mutation (subscribe/unsubscribe) and the delivery iteration
//! are deliberately separated: `broadcast` snapshots the subscriber set
//! under the lock, then delivers with the lock released, so a slow send can
//! never stall registration or other components. Removal is idempotent and
//! keyed by subscriber id -- the write side (failed send) and the read side
//! (connection's own read loop observing a close) race safely to the same
//! removed-exactly-once outcome.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Per-subscriber delivery buffer, in events.
///
/// A subscriber that leaves this many events unread is considered dead or
/// hopelessly behind and is evicted on the next broadcast.
pub const SUBSCRIBER_BUFFER: usize = 32;

/// A typed event envelope pushed to subscribers.
///
/// Serializes as `{"type": ..., "data": ...}`. The payload schema belongs
/// to the producer; the hub treats it as opaque.
#[derive(Debug, Clone, Serialize)]
pub struct WsEvent {
    /// Payload shape tag ("stats", "logs", "allowed_ips").
    #[serde(rename = "type")]
    pub kind: String,
    /// Opaque structured payload.
    pub data: Value,
}

impl WsEvent {
    /// Build an envelope from any serializable payload.
    ///
    /// Returns `None` if the payload does not serialize -- producers only
    /// hand in plain data structs, so this is effectively infallible.
    pub fn new(kind: &str, payload: &impl Serialize) -> Option<Self> {
        match serde_json::to_value(payload) {
            Ok(data) => Some(Self {
                kind: kind.to_string(),
                data,
            }),
            Err(e) => {
                warn!("Dropping unserializable '{}' event: {}", kind, e);
                None
            }
        }
    }
}

/// A registered subscriber's receiving end.
///
/// Dropping the handle (or its receiver) makes the next broadcast evict
/// the subscriber; calling [`BroadcastHub::unsubscribe`] removes it
/// immediately.
pub struct SubscriberHandle {
    /// Identity of this subscriber in the hub.
    pub id: Uuid,
    /// Stream of broadcast events, in emission order.
    pub rx: mpsc::Receiver<Arc<WsEvent>>,
}

/// Fan-out hub over a set of live subscribers.
pub struct BroadcastHub {
    subscribers: Mutex<HashMap<Uuid, mpsc::Sender<Arc<WsEvent>>>>,
}

impl BroadcastHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    /// Register a new subscriber. Safe to call concurrently with broadcasts.
    pub fn subscribe(&self) -> SubscriberHandle {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        self.subscribers.lock().unwrap().insert(id, tx);
        debug!("Subscriber {} registered", id);
        SubscriberHandle { id, rx }
    }

    /// Remove a subscriber. Idempotent; returns whether it was present.
    pub fn unsubscribe(&self, id: Uuid) -> bool {
        let removed = self.subscribers.lock().unwrap().remove(&id).is_some();
        if removed {
            debug!("Subscriber {} removed", id);
        }
        removed
    }

    /// Deliver `event` to every currently registered subscriber.
    ///
    /// Failures to individual subscribers (full buffer, dropped receiver)
    /// never abort delivery to the rest; the failing subscribers are
    /// evicted. Returns the number of successful deliveries.
    pub fn broadcast(&self, event: WsEvent) -> usize {
        let event = Arc::new(event);

        // Snapshot under the lock, deliver outside it.
        let targets: Vec<(Uuid, mpsc::Sender<Arc<WsEvent>>)> = self
            .subscribers
            .lock()
            .unwrap()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut delivered = 0;
        let mut dead = Vec::new();
        for (id, tx) in targets {
            match tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    debug!("Evicting subscriber {}: {}", id, e);
                    dead.push(id);
                }
            }
        }

        for id in dead {
            self.unsubscribe(id);
        }
        delivered
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}
