//! Periodic state aggregation for real-time subscribers.
//!
//! The aggregator wakes on a fixed cadence, gathers the current observable
//! state (tunnel stats, upstream roster, journal tail) and pushes typed
//! envelopes into the broadcast hub. It degrades rather than stalls: a
//! missing metrics file yields a synthetic snapshot explicitly tagged as
//! such, so subscribers see a steady event cadence either way.

mod aggregator;
mod sources;

pub use aggregator::{SnapshotAggregator, DEFAULT_TICK};
pub use sources::{MetricsFile, StatsOrigin, TunnelStats, UpstreamRoster, UpstreamStatus};
