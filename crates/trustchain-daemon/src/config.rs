// crates/trustchain-daemon/src/config.rs
//
// Runtime configuration for the Trustchain daemon.
// Loaded from a TOML file or populated with defaults. The `[ledger]` table
// carries the engine parameters verbatim.

use serde::Deserialize;
use std::fs;

use trustchain_core::LedgerParams;

/// Runtime configuration for the daemon.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// Log level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Peer base URLs (e.g., ["http://10.0.0.2:8080"]). A peer must serve
    /// its chain at `<url>/blocks`.
    #[serde(default)]
    pub peers: Vec<String>,

    /// This node's own public URL; never synced from, even if listed.
    #[serde(default)]
    pub self_url: Option<String>,

    /// Seconds between peer synchronization rounds.
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,

    /// Per-request timeout for peer fetches.
    #[serde(default = "default_peer_timeout_secs")]
    pub peer_timeout_secs: u64,

    /// If set, seal whatever is pending this often instead of waiting for
    /// the mempool to fill.
    #[serde(default)]
    pub seal_interval_secs: Option<u64>,

    /// Re-derive ledger state from the chain after adopting a peer chain.
    #[serde(default)]
    pub rebuild_state_on_adopt: bool,

    /// Engine parameters.
    #[serde(default)]
    pub ledger: LedgerParams,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_sync_interval_secs() -> u64 {
    30
}

fn default_peer_timeout_secs() -> u64 {
    10
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            peers: Vec::new(),
            self_url: None,
            sync_interval_secs: default_sync_interval_secs(),
            peer_timeout_secs: default_peer_timeout_secs(),
            seal_interval_secs: None,
            rebuild_state_on_adopt: false,
            ledger: LedgerParams::default(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from a TOML file at the given path.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: DaemonConfig = toml::from_str(contents)?;
        config.ledger.validate()?;
        Ok(config)
    }
}
