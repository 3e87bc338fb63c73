//! Real-time broadcast hub.
//!
//! The hub owns the set of live subscribers and fans typed state envelopes
//! out to all of them. Delivery is best-effort and at-most-once per
//! connected subscriber per broadcast: a subscriber that falls behind (full
//! buffer) or disconnects is evicted and simply misses everything after.
//!
//! [`broadcast::BroadcastHub`] is transport-agnostic; [`ws`] adapts
//! subscribers to WebSocket connections.

pub mod broadcast;
pub mod ws;

pub use broadcast::{BroadcastHub, SubscriberHandle, WsEvent};
pub use ws::WsListener;
