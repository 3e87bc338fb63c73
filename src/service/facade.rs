//! The [`ControlPlaneService`] implementation.

use std::fmt::Write as _;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::bridge::CommandBridge;
use crate::journal::Journal;
use crate::keys::{KeyStore, LicenseKey, Validation};

use super::error::ServiceError;
use super::state::{Chain, FirewallRules, RunState, TunnelConfig};

/// Tunnel state guarded as one unit so run-state transitions and config
/// pushes serialize against each other.
struct TunnelState {
    run_state: RunState,
    config: TunnelConfig,
}

/// Façade translating validated operator intents into key-store, bridge,
/// and journal operations.
pub struct ControlPlaneService {
    keys: Arc<KeyStore>,
    bridge: Arc<CommandBridge>,
    journal: Arc<Journal>,
    tunnel: Mutex<TunnelState>,
}

impl ControlPlaneService {
    /// Create the façade over its collaborators.
    pub fn new(keys: Arc<KeyStore>, bridge: Arc<CommandBridge>, journal: Arc<Journal>) -> Self {
        Self {
            keys,
            bridge,
            journal,
            tunnel: Mutex::new(TunnelState {
                run_state: RunState::Stopped,
                config: TunnelConfig::default(),
            }),
        }
    }

    // ── Tunnel lifecycle ────────────────────────────────────────────

    /// Start the tunnel. Fails with [`ServiceError::AlreadyRunning`] (and
    /// sends no command) if it is already running.
    pub async fn start_tunnel(&self) -> Result<String, ServiceError> {
        let mut tunnel = self.tunnel.lock().await;
        if tunnel.run_state == RunState::Running {
            return Err(ServiceError::AlreadyRunning);
        }
        let response = self.bridge.send_command_logged("start").await?;
        tunnel.run_state = RunState::Running;
        self.journal.info("tunnel", "tunnel started");
        info!("Tunnel started");
        Ok(response)
    }

    /// Stop the tunnel. Fails with [`ServiceError::NotRunning`] (and sends
    /// no command) if it is not running.
    pub async fn stop_tunnel(&self) -> Result<String, ServiceError> {
        let mut tunnel = self.tunnel.lock().await;
        if tunnel.run_state == RunState::Stopped {
            return Err(ServiceError::NotRunning);
        }
        let response = self.bridge.send_command_logged("stop").await?;
        tunnel.run_state = RunState::Stopped;
        self.journal.info("tunnel", "tunnel stopped");
        info!("Tunnel stopped");
        Ok(response)
    }

    /// The locally-tracked run state.
    pub async fn run_state(&self) -> RunState {
        self.tunnel.lock().await.run_state
    }

    /// Snapshot of the cached tunnel configuration.
    pub async fn tunnel_config(&self) -> TunnelConfig {
        self.tunnel.lock().await.config.clone()
    }

    // ── Configuration pushes ────────────────────────────────────────
    //
    // Allowed in either run state. The cached config only changes after
    // the bridge call succeeds.

    /// Push a new listening port set.
    pub async fn set_ports(&self, ports: Vec<u16>) -> Result<String, ServiceError> {
        if ports.is_empty() {
            return Err(ServiceError::InvalidRequest("ports list is empty".into()));
        }
        let mut tunnel = self.tunnel.lock().await;

        let mut line = String::from("set_ports ");
        for (i, port) in ports.iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            let _ = write!(line, "{}", port);
        }

        let response = self.bridge.send_command_logged(&line).await?;
        tunnel.config.ports = ports;
        self.journal
            .info("tunnel", format!("ports updated: {:?}", tunnel.config.ports));
        Ok(response)
    }

    /// Push new firewall rules.
    pub async fn set_firewall(&self, rules: FirewallRules) -> Result<String, ServiceError> {
        let mut tunnel = self.tunnel.lock().await;

        let line = format!(
            "set_firewall allow:{} block:{}",
            rules.allowed.join(","),
            rules.blocked.join(",")
        );

        let response = self.bridge.send_command_logged(&line).await?;
        self.journal.info(
            "tunnel",
            format!(
                "firewall updated: {} allowed, {} blocked",
                rules.allowed.len(),
                rules.blocked.len()
            ),
        );
        tunnel.config.firewall = rules;
        Ok(response)
    }

    /// Toggle BBR congestion control.
    pub async fn set_bbr(&self, enabled: bool) -> Result<String, ServiceError> {
        let mut tunnel = self.tunnel.lock().await;

        let line = if enabled { "set_bbr on" } else { "set_bbr off" };
        let response = self.bridge.send_command_logged(line).await?;
        tunnel.config.bbr = enabled;
        self.journal
            .info("tunnel", format!("bbr set to {}", enabled));
        Ok(response)
    }

    /// Set the fail2ban ban threshold.
    pub async fn set_fail2ban(&self, threshold: u32) -> Result<String, ServiceError> {
        let mut tunnel = self.tunnel.lock().await;

        let line = format!("set_fail2ban {}", threshold);
        let response = self.bridge.send_command_logged(&line).await?;
        tunnel.config.fail2ban_threshold = threshold;
        self.journal
            .info("tunnel", format!("fail2ban threshold set to {}", threshold));
        Ok(response)
    }

    /// Apply a forwarding chain.
    pub async fn apply_chain(&self, chain: Chain) -> Result<String, ServiceError> {
        let mut tunnel = self.tunnel.lock().await;

        let payload = serde_json::to_string(&chain)
            .map_err(|e| ServiceError::InvalidRequest(format!("chain not serializable: {}", e)))?;
        let line = format!("set_chain {}", payload);

        let response = self.bridge.send_command_logged(&line).await?;
        self.journal
            .info("chains", format!("chain applied: {}", chain.name));
        tunnel.config.chain = Some(chain);
        Ok(response)
    }

    // ── Key lifecycle ───────────────────────────────────────────────

    /// Issue a new license key.
    pub fn issue_key(&self, subscription: &str, usage_limit: u64, comment: &str) -> LicenseKey {
        let key = self.keys.issue(subscription, usage_limit, comment);
        self.journal.info(
            "keys",
            format!("issued {} key {} (limit {})", subscription, key.id, usage_limit),
        );
        key
    }

    /// Revoke a key. Idempotent.
    pub fn revoke_key(&self, id: &str) {
        if self.keys.revoke(id) {
            self.journal.info("keys", format!("revoked key {}", id));
        }
    }

    /// Validate a key, consuming one use on success.
    pub fn validate_key(&self, id: &str) -> Result<Validation, ServiceError> {
        Ok(self.keys.validate(id)?)
    }

    /// Snapshot of all key records.
    pub fn list_keys(&self) -> Vec<LicenseKey> {
        self.keys.list()
    }

    // ── Journal pass-through ────────────────────────────────────────

    /// Snapshot of the journal for the panel's log view.
    pub fn logs(&self) -> Vec<crate::journal::LogEntry> {
        self.journal.snapshot()
    }

    /// Clear the journal.
    pub fn clear_logs(&self) {
        self.journal.clear();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::keys::KeyError;
    use crate::service::ChainNode;
    use std::path::Path;
    use tempfile::tempdir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::UnixListener;

    /// Fake tunnel answering every command with "ok".
    async fn spawn_fake_tunnel(path: &Path) {
        let listener = UnixListener::bind(path).unwrap();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await;
                let _ = stream.write_all(b"ok").await;
            }
        });
    }

    fn service_at(sock: &Path) -> ControlPlaneService {
        let journal = Arc::new(Journal::default());
        ControlPlaneService::new(
            Arc::new(KeyStore::new()),
            Arc::new(CommandBridge::new(sock, journal.clone())),
            journal,
        )
    }

    #[tokio::test]
    async fn test_start_stop_state_machine() {
        let dir = tempdir().unwrap();
        let sock = dir.path().join("tunnel.sock");
        spawn_fake_tunnel(&sock).await;
        let service = service_at(&sock);

        assert_eq!(service.run_state().await, RunState::Stopped);

        service.start_tunnel().await.unwrap();
        assert_eq!(service.run_state().await, RunState::Running);

        // Second start refused without a command being sent
        assert!(matches!(
            service.start_tunnel().await,
            Err(ServiceError::AlreadyRunning)
        ));

        service.stop_tunnel().await.unwrap();
        assert_eq!(service.run_state().await, RunState::Stopped);

        assert!(matches!(
            service.stop_tunnel().await,
            Err(ServiceError::NotRunning)
        ));
    }

    #[tokio::test]
    async fn test_start_with_dead_bridge_stays_stopped() {
        let dir = tempdir().unwrap();
        let service = service_at(&dir.path().join("absent.sock"));

        let err = service.start_tunnel().await.unwrap_err();
        assert_eq!(err.http_status(), 502);
        assert_eq!(service.run_state().await, RunState::Stopped);
    }

    #[tokio::test]
    async fn test_set_ports_updates_cache_on_success() {
        let dir = tempdir().unwrap();
        let sock = dir.path().join("tunnel.sock");
        spawn_fake_tunnel(&sock).await;
        let service = service_at(&sock);

        service.set_ports(vec![443, 9443]).await.unwrap();
        assert_eq!(service.tunnel_config().await.ports, vec![443, 9443]);
    }

    #[tokio::test]
    async fn test_set_ports_dead_bridge_leaves_cache_unchanged() {
        let dir = tempdir().unwrap();
        let service = service_at(&dir.path().join("absent.sock"));
        let before = service.tunnel_config().await;

        let err = service.set_ports(vec![1080]).await.unwrap_err();
        assert!(matches!(err, ServiceError::Bridge(_)));
        assert_eq!(service.tunnel_config().await, before);
    }

    #[tokio::test]
    async fn test_set_ports_rejects_empty_list() {
        let dir = tempdir().unwrap();
        let service = service_at(&dir.path().join("unused.sock"));

        let err = service.set_ports(vec![]).await.unwrap_err();
        assert_eq!(err.http_status(), 400);
    }

    #[tokio::test]
    async fn test_config_mutations_allowed_while_running() {
        let dir = tempdir().unwrap();
        let sock = dir.path().join("tunnel.sock");
        spawn_fake_tunnel(&sock).await;
        let service = service_at(&sock);

        service.start_tunnel().await.unwrap();
        service.set_bbr(true).await.unwrap();
        service.set_fail2ban(5).await.unwrap();

        let config = service.tunnel_config().await;
        assert!(config.bbr);
        assert_eq!(config.fail2ban_threshold, 5);
        assert_eq!(service.run_state().await, RunState::Running);
    }

    #[tokio::test]
    async fn test_apply_chain() {
        let dir = tempdir().unwrap();
        let sock = dir.path().join("tunnel.sock");
        spawn_fake_tunnel(&sock).await;
        let service = service_at(&sock);

        let chain = Chain {
            id: "1".to_string(),
            name: "eu-route".to_string(),
            nodes: vec![ChainNode {
                id: "n1".to_string(),
                kind: "vps".to_string(),
                address: "10.0.0.1".to_string(),
                country: "NL".to_string(),
                status: "up".to_string(),
            }],
            subscription: "premium".to_string(),
        };
        service.apply_chain(chain.clone()).await.unwrap();
        assert_eq!(service.tunnel_config().await.chain, Some(chain));
    }

    #[tokio::test]
    async fn test_key_lifecycle_via_facade() {
        let dir = tempdir().unwrap();
        let service = service_at(&dir.path().join("unused.sock"));

        let key = service.issue_key("premium", 2, "trial");
        service.validate_key(&key.id).unwrap();
        service.validate_key(&key.id).unwrap();

        let err = service.validate_key(&key.id).unwrap_err();
        assert!(matches!(err, ServiceError::Key(KeyError::LimitExceeded)));
        assert_eq!(err.http_status(), 403);

        service.revoke_key(&key.id);
        let err = service.validate_key(&key.id).unwrap_err();
        assert!(matches!(err, ServiceError::Key(KeyError::Revoked)));

        assert_eq!(service.list_keys().len(), 1);
    }

    #[tokio::test]
    async fn test_actions_are_journaled() {
        let dir = tempdir().unwrap();
        let sock = dir.path().join("tunnel.sock");
        spawn_fake_tunnel(&sock).await;
        let service = service_at(&sock);

        let key = service.issue_key("basic", 0, "");
        service.revoke_key(&key.id);
        service.start_tunnel().await.unwrap();

        let sources: Vec<String> = service.logs().iter().map(|e| e.source.clone()).collect();
        assert!(sources.contains(&"keys".to_string()));
        assert!(sources.contains(&"tunnel".to_string()));

        service.clear_logs();
        assert_eq!(service.logs().len(), 1); // the "journal cleared" marker
    }
}
