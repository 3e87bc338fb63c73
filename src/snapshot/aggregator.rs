//! The periodic aggregation loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::hub::{BroadcastHub, WsEvent};
use crate::journal::Journal;

use super::sources::{MetricsFile, UpstreamRoster};

/// Default broadcast cadence.
pub const DEFAULT_TICK: Duration = Duration::from_secs(2);

/// How many journal entries ride along in each `logs` event.
const LOG_TAIL: usize = 100;

/// Managed background task that feeds the broadcast hub.
///
/// Runs until the shutdown signal fires. Every tick performs only bounded
/// work (two optional file reads, in-memory snapshots), so the cadence
/// holds even when the tunnel process is down.
pub struct SnapshotAggregator {
    hub: Arc<BroadcastHub>,
    journal: Arc<Journal>,
    metrics: MetricsFile,
    upstreams: UpstreamRoster,
    tick: Duration,
}

impl SnapshotAggregator {
    /// Create an aggregator over the given sources.
    pub fn new(
        hub: Arc<BroadcastHub>,
        journal: Arc<Journal>,
        metrics: MetricsFile,
        upstreams: UpstreamRoster,
    ) -> Self {
        Self {
            hub,
            journal,
            metrics,
            upstreams,
            tick: DEFAULT_TICK,
        }
    }

    /// Override the broadcast cadence.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Run the aggregation loop until shutdown is signaled.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!("Snapshot aggregator started (tick {:?})", self.tick);
        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.emit_tick();
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Snapshot aggregator stopping");
                        break;
                    }
                }
            }
        }
    }

    /// Gather one round of state and broadcast it.
    fn emit_tick(&self) {
        let stats = self.metrics.collect();
        let upstreams = self.upstreams.collect();
        let logs = self.journal.tail(LOG_TAIL);

        let mut delivered = 0;
        if let Some(event) = WsEvent::new("stats", &stats) {
            delivered += self.hub.broadcast(event);
        }
        if let Some(event) = WsEvent::new("allowed_ips", &upstreams) {
            delivered += self.hub.broadcast(event);
        }
        if let Some(event) = WsEvent::new("logs", &logs) {
            delivered += self.hub.broadcast(event);
        }
        debug!(
            "Aggregator tick: {} deliveries to {} subscribers",
            delivered,
            self.hub.subscriber_count()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::sources::StatsOrigin;

    fn test_aggregator(hub: Arc<BroadcastHub>, journal: Arc<Journal>) -> SnapshotAggregator {
        SnapshotAggregator::new(
            hub,
            journal,
            MetricsFile::new("/nonexistent/metrics.json"),
            UpstreamRoster::new(&[("VK".to_string(), "87.240.190.72".to_string())], None),
        )
        .with_tick(Duration::from_millis(20))
    }

    #[tokio::test]
    async fn test_tick_emits_all_event_kinds() {
        let hub = Arc::new(BroadcastHub::new());
        let journal = Arc::new(Journal::default());
        journal.info("test", "hello");
        let mut handle = hub.subscribe();

        test_aggregator(hub.clone(), journal).emit_tick();

        let kinds: Vec<String> = vec![
            handle.rx.recv().await.unwrap().kind.clone(),
            handle.rx.recv().await.unwrap().kind.clone(),
            handle.rx.recv().await.unwrap().kind.clone(),
        ];
        assert_eq!(kinds, vec!["stats", "allowed_ips", "logs"]);
    }

    #[tokio::test]
    async fn test_degraded_stats_are_labeled() {
        let hub = Arc::new(BroadcastHub::new());
        let journal = Arc::new(Journal::default());
        let mut handle = hub.subscribe();

        test_aggregator(hub.clone(), journal).emit_tick();

        let stats_event = handle.rx.recv().await.unwrap();
        assert_eq!(stats_event.kind, "stats");
        let origin: StatsOrigin =
            serde_json::from_value(stats_event.data["origin"].clone()).unwrap();
        assert_eq!(origin, StatsOrigin::Synthetic);
    }

    #[tokio::test]
    async fn test_loop_keeps_cadence_and_stops_on_shutdown() {
        let hub = Arc::new(BroadcastHub::new());
        let journal = Arc::new(Journal::default());
        let mut handle = hub.subscribe();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(test_aggregator(hub.clone(), journal).run(shutdown_rx));

        // At 20ms cadence we should see several events well within a second
        let mut seen = 0;
        for _ in 0..6 {
            let event = tokio::time::timeout(Duration::from_secs(1), handle.rx.recv())
                .await
                .expect("aggregator stalled")
                .unwrap();
            assert!(["stats", "allowed_ips", "logs"].contains(&event.kind.as_str()));
            seen += 1;
        }
        assert_eq!(seen, 6);

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("aggregator did not stop")
            .unwrap();
    }
}
