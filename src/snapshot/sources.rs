//! Data sources the aggregator polls each tick.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Where a stats snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsOrigin {
    /// Read from the tunnel's metrics file.
    Live,
    /// Placeholder emitted because no live metrics were available.
    Synthetic,
}

/// Point-in-time tunnel counters, as rendered by the panel's stats view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TunnelStats {
    /// Total packets the tunnel has processed.
    pub processed_packets: u64,
    /// Packets that went through masking.
    pub masked_packets: u64,
    /// Currently active tunnel connections.
    pub active_connections: u32,
    /// Number of loaded masking signatures.
    pub signature_count: u32,
    /// VLESS-protocol packet count.
    pub vless_packets: u64,
    /// REALITY-protocol packet count.
    pub reality_packets: u64,
    /// Total traffic in bytes.
    pub total_traffic: u64,
    /// Count of allowed upstream addresses.
    pub allowed_ips: u32,
    /// When this snapshot was taken.
    pub last_update: DateTime<Utc>,
    /// Whether this snapshot is live or a degraded-mode placeholder.
    #[serde(default = "synthetic_origin")]
    pub origin: StatsOrigin,
}

fn synthetic_origin() -> StatsOrigin {
    StatsOrigin::Synthetic
}

impl TunnelStats {
    /// All-zero snapshot tagged synthetic, for degraded mode.
    pub fn placeholder() -> Self {
        Self {
            processed_packets: 0,
            masked_packets: 0,
            active_connections: 0,
            signature_count: 0,
            vless_packets: 0,
            reality_packets: 0,
            total_traffic: 0,
            allowed_ips: 0,
            last_update: Utc::now(),
            origin: StatsOrigin::Synthetic,
        }
    }
}

/// Stats source backed by a JSON metrics file the tunnel process writes.
///
/// The read is a single bounded filesystem operation, so a collect can
/// never stall the aggregator tick.
pub struct MetricsFile {
    path: PathBuf,
}

impl MetricsFile {
    /// Create a source reading from `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Read the current stats, falling back to a tagged placeholder when
    /// the file is missing or unparsable.
    pub fn collect(&self) -> TunnelStats {
        match std::fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice::<TunnelStats>(&bytes) {
                Ok(mut stats) => {
                    stats.origin = StatsOrigin::Live;
                    stats.last_update = Utc::now();
                    stats
                }
                Err(e) => {
                    debug!("Metrics file {:?} unparsable ({}), degrading", self.path, e);
                    TunnelStats::placeholder()
                }
            },
            Err(_) => TunnelStats::placeholder(),
        }
    }
}

/// Health of one upstream service the tunnel fronts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamStatus {
    /// Display name ("Yandex DNS", ...).
    pub name: String,
    /// Address or domain of the upstream.
    pub address: String,
    /// Reported status ("online", "unknown", ...).
    pub status: String,
    /// Last probe round trip, if one happened.
    #[serde(default)]
    pub response_ms: Option<u32>,
}

/// The roster of upstream services reported under the `allowed_ips` event.
///
/// Probe results come from an optional JSON file written by an external
/// prober; without it the configured roster is reported with status
/// `"unknown"` so subscribers still see the full list.
pub struct UpstreamRoster {
    probe_path: Option<PathBuf>,
    configured: Vec<UpstreamStatus>,
}

impl UpstreamRoster {
    /// Build a roster from configured (name, address) pairs and an optional
    /// probe results file.
    pub fn new(seeds: &[(String, String)], probe_path: Option<PathBuf>) -> Self {
        let configured = seeds
            .iter()
            .map(|(name, address)| UpstreamStatus {
                name: name.clone(),
                address: address.clone(),
                status: "unknown".to_string(),
                response_ms: None,
            })
            .collect();
        Self {
            probe_path,
            configured,
        }
    }

    /// Current roster: probe file contents when present, configured
    /// fallback otherwise.
    pub fn collect(&self) -> Vec<UpstreamStatus> {
        if let Some(ref path) = self.probe_path {
            if let Ok(bytes) = std::fs::read(path) {
                if let Ok(probed) = serde_json::from_slice::<Vec<UpstreamStatus>>(&bytes) {
                    return probed;
                }
                debug!("Probe file {:?} unparsable, using configured roster", path);
            }
        }
        self.configured.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_placeholder_is_tagged_synthetic() {
        let stats = TunnelStats::placeholder();
        assert_eq!(stats.origin, StatsOrigin::Synthetic);

        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"origin\":\"synthetic\""));
    }

    #[test]
    fn test_missing_metrics_file_degrades() {
        let source = MetricsFile::new("/nonexistent/metrics.json");
        assert_eq!(source.collect().origin, StatsOrigin::Synthetic);
    }

    #[test]
    fn test_metrics_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");

        let mut stats = TunnelStats::placeholder();
        stats.processed_packets = 1250;
        stats.masked_packets = 1180;
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(serde_json::to_string(&stats).unwrap().as_bytes())
            .unwrap();

        let source = MetricsFile::new(&path);
        let read = source.collect();
        assert_eq!(read.processed_packets, 1250);
        assert_eq!(read.origin, StatsOrigin::Live);
    }

    #[test]
    fn test_corrupt_metrics_file_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let source = MetricsFile::new(&path);
        assert_eq!(source.collect().origin, StatsOrigin::Synthetic);
    }

    #[test]
    fn test_roster_falls_back_to_configured() {
        let seeds = vec![
            ("Yandex".to_string(), "77.88.8.8".to_string()),
            ("VK".to_string(), "87.240.190.72".to_string()),
        ];
        let roster = UpstreamRoster::new(&seeds, None);

        let collected = roster.collect();
        assert_eq!(collected.len(), 2);
        assert!(collected.iter().all(|u| u.status == "unknown"));
    }

    #[test]
    fn test_roster_prefers_probe_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.json");
        let probed = vec![UpstreamStatus {
            name: "Yandex".to_string(),
            address: "77.88.8.8".to_string(),
            status: "online".to_string(),
            response_ms: Some(12),
        }];
        std::fs::write(&path, serde_json::to_string(&probed).unwrap()).unwrap();

        let seeds = vec![("VK".to_string(), "87.240.190.72".to_string())];
        let roster = UpstreamRoster::new(&seeds, Some(path));

        let collected = roster.collect();
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].status, "online");
    }
}
