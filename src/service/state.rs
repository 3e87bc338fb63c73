//! Locally-tracked tunnel state and configuration types.

use serde::{Deserialize, Serialize};

/// Run state of the supervised tunnel process, tracked locally.
///
/// The panel never queries the process for this; the state machine advances
/// only on successful start/stop commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// Tunnel is (believed) stopped.
    Stopped,
    /// Tunnel is (believed) running.
    Running,
}

/// Firewall rules pushed to the tunnel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallRules {
    /// Explicitly allowed peer addresses/CIDRs.
    pub allowed: Vec<String>,
    /// Explicitly blocked peer addresses/CIDRs.
    pub blocked: Vec<String>,
}

/// One hop in a VPS/CDN forwarding chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainNode {
    /// Node identifier.
    pub id: String,
    /// Node kind ("vps" or "cdn").
    #[serde(rename = "type")]
    pub kind: String,
    /// Node address.
    pub address: String,
    /// Country code or name.
    pub country: String,
    /// Reported node status.
    pub status: String,
}

/// A forwarding chain applied to the tunnel via `set_chain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    /// Chain identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Ordered hops.
    pub nodes: Vec<ChainNode>,
    /// Subscription tier the chain is available to.
    pub subscription: String,
}

/// Cached tunnel configuration, mirrored from successful bridge commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TunnelConfig {
    /// Listening ports.
    pub ports: Vec<u16>,
    /// Whether BBR congestion control is enabled.
    pub bbr: bool,
    /// fail2ban ban threshold.
    pub fail2ban_threshold: u32,
    /// Current firewall rules.
    pub firewall: FirewallRules,
    /// Applied forwarding chain, if any.
    pub chain: Option<Chain>,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            ports: vec![443, 8443],
            bbr: false,
            fail2ban_threshold: 3,
            firewall: FirewallRules::default(),
            chain: None,
        }
    }
}
