//! Bounded operational log for the panel.
//!
//! Every state-changing action (key issued/revoked, tunnel started/stopped,
//! config pushed, stubbed bridge call) appends a structured entry here. The
//! journal is what the web panel renders in its log view and what the
//! aggregator ships to subscribers each tick, so it is capacity-bounded:
//! once `capacity` entries exist, the oldest are evicted.
//!
//! This is a separate concern from `tracing` debug logging -- entries here
//! are part of the panel's observable state, not developer output.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

/// Default maximum number of retained entries.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Severity of a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Informational message.
    Info,
    /// Warning message.
    Warn,
    /// Error message.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// A single structured journal entry.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    /// When the entry was recorded.
    pub timestamp: DateTime<Utc>,
    /// Severity level.
    pub level: LogLevel,
    /// Human-readable message.
    pub message: String,
    /// Component that produced the entry ("keys", "tunnel", "bridge", ...).
    pub source: String,
}

/// Capacity-bounded, concurrency-safe log sink.
pub struct Journal {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
}

impl Journal {
    /// Create a journal retaining at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest if over capacity.
    pub fn record(&self, level: LogLevel, source: &str, message: impl Into<String>) {
        let entry = LogEntry {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            source: source.to_string(),
        };
        debug!("[journal] {} {}: {}", entry.level, entry.source, entry.message);

        let mut entries = self.entries.lock().unwrap();
        entries.push_back(entry);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    /// Append an INFO entry.
    pub fn info(&self, source: &str, message: impl Into<String>) {
        self.record(LogLevel::Info, source, message);
    }

    /// Append a WARN entry.
    pub fn warn(&self, source: &str, message: impl Into<String>) {
        self.record(LogLevel::Warn, source, message);
    }

    /// Append an ERROR entry.
    pub fn error(&self, source: &str, message: impl Into<String>) {
        self.record(LogLevel::Error, source, message);
    }

    /// Snapshot of all retained entries, oldest first.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().iter().cloned().collect()
    }

    /// Snapshot of the most recent `n` entries, oldest first.
    pub fn tail(&self, n: usize) -> Vec<LogEntry> {
        let entries = self.entries.lock().unwrap();
        let skip = entries.len().saturating_sub(n);
        entries.iter().skip(skip).cloned().collect()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Whether the journal is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all entries, then record that the journal was cleared.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
        self.info("system", "journal cleared");
    }
}

impl Default for Journal {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_snapshot() {
        let journal = Journal::new(10);
        journal.info("keys", "issued key");
        journal.warn("bridge", "slow response");

        let entries = journal.snapshot();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].source, "keys");
        assert_eq!(entries[0].level, LogLevel::Info);
        assert_eq!(entries[1].level, LogLevel::Warn);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let journal = Journal::new(3);
        for i in 0..5 {
            journal.info("test", format!("entry {}", i));
        }

        let entries = journal.snapshot();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].message, "entry 2");
        assert_eq!(entries[2].message, "entry 4");
    }

    #[test]
    fn test_tail() {
        let journal = Journal::new(100);
        for i in 0..10 {
            journal.info("test", format!("entry {}", i));
        }

        let tail = journal.tail(3);
        assert_eq!(tail.len(), 3);
        assert_eq!(tail[0].message, "entry 7");
        assert_eq!(tail[2].message, "entry 9");

        // Asking for more than retained returns everything
        assert_eq!(journal.tail(50).len(), 10);
    }

    #[test]
    fn test_clear_leaves_marker_entry() {
        let journal = Journal::new(10);
        journal.info("test", "before clear");
        journal.clear();

        let entries = journal.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "journal cleared");
        assert_eq!(entries[0].source, "system");
    }

    #[test]
    fn test_level_display() {
        assert_eq!(format!("{}", LogLevel::Info), "INFO");
        assert_eq!(format!("{}", LogLevel::Warn), "WARN");
        assert_eq!(format!("{}", LogLevel::Error), "ERROR");
    }

    #[test]
    fn test_entry_serialization() {
        let journal = Journal::new(10);
        journal.error("tunnel", "start failed");

        let json = serde_json::to_string(&journal.snapshot()[0]).unwrap();
        assert!(json.contains("\"level\":\"ERROR\""));
        assert!(json.contains("\"source\":\"tunnel\""));
        assert!(json.contains("\"timestamp\""));
    }
}
