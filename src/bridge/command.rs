//! One-shot command/response exchange over the tunnel's Unix socket.
//!
//! # Protocol
//!
//! A single text line (verb plus space-separated arguments) is written to a
//! freshly opened connection; the tunnel answers with a short status string
//! and the connection is dropped. There is no framing or length prefix --
//! the response is one best-effort read into a fixed buffer, so anything
//! past [`MAX_RESPONSE_BYTES`] is truncated. The tunnel's responses are
//! short status strings in practice; we keep the wire contract as-is rather
//! than invent framing the peer does not speak.
//!
//! # Degraded mode
//!
//! On platforms without Unix sockets the bridge cannot reach a tunnel at
//! all. Rather than fail every control action, [`CommandBridge::send_command`]
//! returns a deterministic stub response tagged as simulated and records the
//! suppressed call in the journal, keeping the panel operable for demos.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::journal::Journal;

use super::error::BridgeError;

/// Upper bound on a single response read.
///
/// Responses longer than this are silently truncated; the protocol has no
/// framing and the observed peer never answers with more than a short
/// status line.
pub const MAX_RESPONSE_BYTES: usize = 256;

/// Default bound on the whole connect/write/read exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Response returned for every stubbed call on non-Unix platforms.
#[cfg(not(unix))]
const STUB_RESPONSE: &str = "ipc-disabled (simulated)";

/// Bridge to the external tunnel process.
///
/// Verb-agnostic: callers hand it a complete command line. Verb construction
/// and validation live in the control-plane service.
pub struct CommandBridge {
    socket_path: PathBuf,
    timeout: Duration,
    journal: Arc<Journal>,
}

impl CommandBridge {
    /// Create a bridge targeting the tunnel socket at `socket_path`.
    pub fn new(socket_path: impl AsRef<Path>, journal: Arc<Journal>) -> Self {
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
            timeout: DEFAULT_TIMEOUT,
            journal,
        }
    }

    /// Override the exchange timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Path of the tunnel socket this bridge targets.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Send one command line and return the tunnel's response text.
    ///
    /// The entire exchange is bounded by the configured timeout; the call
    /// never blocks past it.
    ///
    /// # Errors
    ///
    /// See [`BridgeError`]. Any error means the command must be treated as
    /// not applied.
    #[cfg(unix)]
    pub async fn send_command(&self, line: &str) -> Result<String, BridgeError> {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::UnixStream;

        debug!("Bridge command: {}", line);

        let exchange = async {
            let mut stream = UnixStream::connect(&self.socket_path)
                .await
                .map_err(BridgeError::TransportUnavailable)?;

            stream
                .write_all(line.as_bytes())
                .await
                .map_err(BridgeError::WriteFailed)?;

            let mut buf = [0u8; MAX_RESPONSE_BYTES];
            let n = stream.read(&mut buf).await.map_err(BridgeError::ReadFailed)?;
            Ok(String::from_utf8_lossy(&buf[..n]).into_owned())
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => {
                if let Ok(ref response) = result {
                    debug!("Bridge response: {}", response);
                }
                result
            }
            Err(_) => Err(BridgeError::Timeout(self.timeout)),
        }
    }

    /// Send one command line and return the tunnel's response text.
    ///
    /// This platform has no Unix-socket transport, so the call succeeds with
    /// a stub response and the suppressed command is journaled for
    /// visibility.
    #[cfg(not(unix))]
    pub async fn send_command(&self, line: &str) -> Result<String, BridgeError> {
        self.journal
            .info("bridge", format!("[ipc:noop] {}", line));
        debug!("Bridge command stubbed (no unix sockets): {}", line);
        Ok(STUB_RESPONSE.to_string())
    }
}

#[cfg(unix)]
impl CommandBridge {
    /// Send a command, journaling any failure before returning it.
    pub async fn send_command_logged(&self, line: &str) -> Result<String, BridgeError> {
        match self.send_command(line).await {
            Ok(response) => Ok(response),
            Err(err) => {
                self.journal
                    .error("bridge", format!("command '{}' failed: {}", line, err));
                Err(err)
            }
        }
    }
}

#[cfg(not(unix))]
impl CommandBridge {
    /// Send a command, journaling any failure before returning it.
    ///
    /// On this platform all commands are stubbed, so this never fails.
    pub async fn send_command_logged(&self, line: &str) -> Result<String, BridgeError> {
        self.send_command(line).await
    }
}
