//! Component wiring and process lifecycle.
//!
//! Constructs the panel's components once at startup (no ambient globals),
//! spawns the two long-lived tasks (WebSocket listener, snapshot
//! aggregator) on a multi-threaded runtime, and tears everything down on
//! ctrl-c via a shared watch channel. In-flight bridge calls are not
//! cancelled; each is already bounded by its own timeout.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{error, info};

use crate::bridge::CommandBridge;
use crate::cli::Cli;
use crate::config::PanelConfig;
use crate::hub::{BroadcastHub, WsListener};
use crate::journal::Journal;
use crate::keys::KeyStore;
use crate::service::ControlPlaneService;
use crate::snapshot::{MetricsFile, SnapshotAggregator, UpstreamRoster};

/// All constructed components, handed to the embedding layer.
///
/// The HTTP layer (out of scope for this crate) takes `service` and `hub`
/// and maps its routes onto them.
pub struct Panel {
    /// The control-plane façade.
    pub service: Arc<ControlPlaneService>,
    /// The realtime broadcast hub.
    pub hub: Arc<BroadcastHub>,
    /// The operational journal.
    pub journal: Arc<Journal>,
}

impl Panel {
    /// Construct all components from a config, with no tasks started.
    pub fn build(config: &PanelConfig) -> Self {
        let journal = Arc::new(Journal::new(config.journal_capacity));
        let keys = Arc::new(KeyStore::new());
        let bridge = Arc::new(
            CommandBridge::new(&config.tunnel_socket, journal.clone())
                .with_timeout(Duration::from_secs(config.bridge_timeout_secs)),
        );
        let service = Arc::new(ControlPlaneService::new(keys, bridge, journal.clone()));
        let hub = Arc::new(BroadcastHub::new());

        journal.info("system", "panel initialized");
        Self {
            service,
            hub,
            journal,
        }
    }
}

/// Run the panel daemon until ctrl-c.
pub fn run(cli: &Cli, mut config: PanelConfig) -> Result<()> {
    if let Some(listen) = cli.listen {
        config.listen_addr = listen;
    }
    if let Some(ref socket) = cli.tunnel_socket {
        config.tunnel_socket = socket.clone();
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    rt.block_on(async {
        let panel = Panel::build(&config);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let listener = WsListener::bind(config.listen_addr, panel.hub.clone())
            .await
            .with_context(|| format!("Failed to bind WebSocket listener on {}", config.listen_addr))?;
        info!("Panel realtime endpoint: ws://{}", listener.local_addr());

        let aggregator = SnapshotAggregator::new(
            panel.hub.clone(),
            panel.journal.clone(),
            MetricsFile::new(
                config
                    .metrics_path
                    .clone()
                    .unwrap_or_else(|| "data/tunnel_metrics.json".into()),
            ),
            UpstreamRoster::new(&config.upstream_pairs(), config.upstream_probe_path.clone()),
        )
        .with_tick(Duration::from_secs(config.tick_secs));

        let ws_handle = tokio::spawn(listener.run(shutdown_rx.clone()));
        let agg_handle = tokio::spawn(aggregator.run(shutdown_rx.clone()));

        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for ctrl-c")?;
        info!("Shutdown requested");
        panel.journal.info("system", "panel shutting down");

        if shutdown_tx.send(true).is_err() {
            error!("All shutdown receivers dropped before signal");
        }
        let _ = tokio::time::timeout(Duration::from_secs(2), ws_handle).await;
        let _ = tokio::time::timeout(Duration::from_secs(2), agg_handle).await;

        Ok(())
    })
}
