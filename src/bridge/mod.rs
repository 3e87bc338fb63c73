//! Command bridge to the external tunnel process.
//!
//! The panel never links against the tunnel -- it talks to it over a
//! well-known Unix socket using a line-oriented text protocol. Each control
//! action is one short-lived connection: connect, write a single command
//! line, read one bounded response, close. A crashed tunnel therefore
//! self-heals the bridge on its next start; there is nothing to reconnect.

mod command;
mod error;

pub use command::{CommandBridge, DEFAULT_TIMEOUT, MAX_RESPONSE_BYTES};
pub use error::BridgeError;
