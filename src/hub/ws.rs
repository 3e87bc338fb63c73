//! WebSocket transport for hub subscribers.
//!
//! Each accepted connection becomes one hub subscriber. The connection task
//! splits into a write path (hub events serialized as JSON text frames) and
//! a read path (inbound frames are used only for liveness -- a close frame
//! or read error is the read-side trigger for removal). Whichever side
//! fails first wins; removal is idempotent so the race is harmless.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::broadcast::BroadcastHub;

/// WebSocket listener feeding the broadcast hub with subscribers.
pub struct WsListener {
    listener: TcpListener,
    local_addr: SocketAddr,
    hub: Arc<BroadcastHub>,
}

impl WsListener {
    /// Bind the listener. Use port 0 to let the OS pick one.
    pub async fn bind(addr: SocketAddr, hub: Arc<BroadcastHub>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Realtime WebSocket listening on {}", local_addr);
        Ok(Self {
            listener,
            local_addr,
            hub,
        })
    }

    /// The bound address (useful when binding to port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept subscriber connections until the shutdown signal fires.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!("WebSocket connection from {}", peer);
                            let hub = self.hub.clone();
                            let conn_shutdown = shutdown_rx.clone();
                            tokio::spawn(async move {
                                handle_subscriber(stream, hub, conn_shutdown).await;
                            });
                        }
                        Err(e) => {
                            warn!("WebSocket accept failed: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("WebSocket listener shutting down");
                        break;
                    }
                }
            }
        }
    }
}

/// Serve one subscriber connection until it closes, errors, or shutdown.
async fn handle_subscriber(
    stream: TcpStream,
    hub: Arc<BroadcastHub>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            debug!("WebSocket handshake failed: {}", e);
            return;
        }
    };

    let mut handle = hub.subscribe();
    let id = handle.id;
    let (mut sink, mut source) = ws.split();

    loop {
        tokio::select! {
            // Write path: forward broadcast events as JSON text frames.
            event = handle.rx.recv() => {
                let Some(event) = event else {
                    // Hub evicted us (slow consumer); tell the client and stop.
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                };
                let text = match serde_json::to_string(event.as_ref()) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Failed to serialize event for {}: {}", id, e);
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(text)).await {
                    debug!("Subscriber {} write failed: {}", id, e);
                    break;
                }
            }
            // Read path: inbound frames are liveness only.
            frame = source.next() => {
                match frame {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("Subscriber {} closed", id);
                        break;
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = sink.send(Message::Pong(payload)).await;
                    }
                    Some(Ok(_)) => {
                        // No client->server message schema; ignore.
                    }
                    Some(Err(e)) => {
                        debug!("Subscriber {} read error: {}", id, e);
                        break;
                    }
                }
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    }

    hub.unsubscribe(id);
}
