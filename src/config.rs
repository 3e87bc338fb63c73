//! Panel configuration.
//!
//! A single TOML file with defaults for every field, so the daemon runs
//! with no config at all. CLI flags override the file.
//!
//! ```toml
//! listen_addr = "127.0.0.1:8081"
//! tunnel_socket = "/tmp/neural_tunnel.sock"
//! tick_secs = 2
//! journal_capacity = 1000
//! metrics_path = "data/tunnel_metrics.json"
//!
//! [[upstreams]]
//! name = "Yandex DNS"
//! address = "77.88.8.8"
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path to the unreadable file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the configuration file.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Path to the unparsable file.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid config value for {field}: {message}")]
    InvalidValue {
        /// Field with the invalid value.
        field: String,
        /// Why it is invalid.
        message: String,
    },
}

/// An upstream service seeded into the roster report.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct UpstreamSeed {
    /// Display name.
    pub name: String,
    /// Address or domain.
    pub address: String,
}

/// Top-level panel configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PanelConfig {
    /// Address the realtime WebSocket listener binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Path of the tunnel process control socket.
    #[serde(default = "default_tunnel_socket")]
    pub tunnel_socket: PathBuf,

    /// Broadcast cadence in seconds.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,

    /// Bridge exchange timeout in seconds.
    #[serde(default = "default_bridge_timeout_secs")]
    pub bridge_timeout_secs: u64,

    /// Journal capacity in entries.
    #[serde(default = "default_journal_capacity")]
    pub journal_capacity: usize,

    /// Optional JSON metrics file written by the tunnel process.
    #[serde(default)]
    pub metrics_path: Option<PathBuf>,

    /// Optional JSON probe-results file for the upstream roster.
    #[serde(default)]
    pub upstream_probe_path: Option<PathBuf>,

    /// Upstream services reported under `allowed_ips`.
    #[serde(default)]
    pub upstreams: Vec<UpstreamSeed>,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8081))
}

fn default_tunnel_socket() -> PathBuf {
    PathBuf::from("/tmp/neural_tunnel.sock")
}

fn default_tick_secs() -> u64 {
    2
}

fn default_bridge_timeout_secs() -> u64 {
    3
}

fn default_journal_capacity() -> usize {
    crate::journal::DEFAULT_CAPACITY
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            tunnel_socket: default_tunnel_socket(),
            tick_secs: default_tick_secs(),
            bridge_timeout_secs: default_bridge_timeout_secs(),
            journal_capacity: default_journal_capacity(),
            metrics_path: None,
            upstream_probe_path: None,
            upstreams: Vec::new(),
        }
    }
}

impl PanelConfig {
    /// Load from `path`, or return defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            debug!("No config file given, using defaults");
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tick_secs".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.journal_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "journal_capacity".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Upstream seeds as (name, address) pairs for the roster.
    pub fn upstream_pairs(&self) -> Vec<(String, String)> {
        self.upstreams
            .iter()
            .map(|u| (u.name.clone(), u.address.clone()))
            .collect()
    }
}
