//! Bridge error types.

use thiserror::Error;

/// Errors from a bridge command exchange.
///
/// All variants mean the same thing to callers: the command did not
/// observably take effect, and no local state should be updated.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Connecting to the tunnel socket failed (process down, socket absent).
    #[error("tunnel transport unavailable: {0}")]
    TransportUnavailable(#[source] std::io::Error),

    /// Writing the command line failed mid-exchange.
    #[error("failed to write command: {0}")]
    WriteFailed(#[source] std::io::Error),

    /// Reading the response failed mid-exchange.
    #[error("failed to read response: {0}")]
    ReadFailed(#[source] std::io::Error),

    /// The whole exchange exceeded the configured timeout.
    #[error("command timed out after {0:?}")]
    Timeout(std::time::Duration),
}
