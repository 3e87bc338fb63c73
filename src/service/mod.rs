//! Control-plane façade.
//!
//! The HTTP layer (out of scope here) translates requests into calls on
//! [`ControlPlaneService`], which owns the locally-tracked tunnel run state
//! and cached configuration, delegates key lifecycle to the key store, and
//! pushes command verbs through the bridge. Cached configuration is updated
//! only after the bridge reports success, so a dead tunnel never corrupts
//! what the panel believes.

mod error;
mod facade;
mod state;

pub use error::ServiceError;
pub use facade::ControlPlaneService;
pub use state::{Chain, ChainNode, FirewallRules, RunState, TunnelConfig};
