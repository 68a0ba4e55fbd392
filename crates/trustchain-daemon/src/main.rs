// crates/trustchain-daemon/src/main.rs
//
// Binary entrypoint for the Trustchain ledger daemon.
//
// Loads configuration, initializes tracing, mines genesis, runs one
// synchronization round against the configured peers, then keeps syncing
// (and optionally sealing on a timer) until Ctrl-C.

mod config;
mod peers;
mod shared;
mod state;
mod sync_loop;

use std::sync::Arc;

use clap::Parser;
use config::DaemonConfig;
use peers::PeerRegistry;
use shared::LedgerHandle;
use state::{NodeState, NodeStateMachine};

use trustchain_consensus::LedgerEngine;

/// Trustchain daemon: hosts one ledger engine and keeps it in sync with peers.
#[derive(Parser, Debug)]
#[command(name = "trustchain-daemon", version = "0.1.0", about = "Trustchain ledger node daemon")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "~/.trustchain/config.toml")]
    config: String,

    /// Extra peer base URL; may be repeated. Added after configured peers.
    #[arg(long = "peer")]
    peers: Vec<String>,

    /// Override `[ledger] difficulty_bits`.
    #[arg(long)]
    difficulty_bits: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Configuration decides the fallback log level, so load it first and
    // report the outcome once tracing is up.
    let config_path = expand_tilde(&args.config);
    let loaded = DaemonConfig::load(&config_path);
    let mut daemon_config = match &loaded {
        Ok(cfg) => cfg.clone(),
        Err(_) => DaemonConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&daemon_config.log_level)),
        )
        .init();

    match loaded {
        Ok(_) => tracing::info!("Loaded configuration from {}", config_path),
        Err(e) => tracing::warn!(
            "Could not load config from {}: {}. Using defaults.",
            config_path,
            e
        ),
    }

    if let Some(bits) = args.difficulty_bits {
        daemon_config.ledger.difficulty_bits = bits;
    }
    daemon_config.peers.extend(args.peers.iter().cloned());

    let mut node_state = NodeStateMachine::new();

    tracing::info!("Trustchain Daemon v0.1.0");
    tracing::info!("Difficulty bits: {}", daemon_config.ledger.difficulty_bits);
    tracing::info!("Mempool capacity: {}", daemon_config.ledger.mempool_capacity);
    tracing::info!("Path count mode: {:?}", daemon_config.ledger.path_count);
    tracing::info!("Root policy: {:?}", daemon_config.ledger.root_policy);
    tracing::info!("Sync interval: {}s", daemon_config.sync_interval_secs);

    // ---------------------------------------------------------------
    // Engine: genesis mining is CPU-bound, keep it off the runtime.
    // ---------------------------------------------------------------
    let params = daemon_config.ledger.clone();
    let engine = tokio::task::spawn_blocking(move || LedgerEngine::new(params)).await??;
    let ledger = LedgerHandle::new(engine);
    let status = ledger.status().await;
    tracing::info!("Genesis block: {}", status.tip);

    // ---------------------------------------------------------------
    // Peers and initial sync.
    // ---------------------------------------------------------------
    let registry = Arc::new(PeerRegistry::new(
        daemon_config.self_url.clone(),
        daemon_config.peer_timeout_secs,
    ));
    for url in &daemon_config.peers {
        registry.add_peer(url).await;
    }

    node_state.transition(NodeState::Syncing)?;
    let report =
        sync_loop::sync_once(&registry, &ledger, daemon_config.rebuild_state_on_adopt).await;
    tracing::info!(
        "Initial sync: {} peer(s) tried, {} chain(s) adopted",
        report.outcomes.len(),
        report.adopted()
    );
    node_state.transition(NodeState::Ready)?;

    // ---------------------------------------------------------------
    // Background loops.
    // ---------------------------------------------------------------
    let sync_handle = tokio::spawn(sync_loop::run_sync_loop(
        Arc::clone(&registry),
        ledger.clone(),
        daemon_config.sync_interval_secs,
        daemon_config.rebuild_state_on_adopt,
    ));

    let seal_handle = daemon_config.seal_interval_secs.map(|secs| {
        tracing::info!("Timed sealing every {}s", secs);
        tokio::spawn(sync_loop::run_seal_loop(ledger.clone(), secs))
    });

    tokio::signal::ctrl_c().await?;

    node_state.transition(NodeState::ShuttingDown)?;
    ledger.cancel_mining();
    sync_handle.abort();
    if let Some(handle) = seal_handle {
        handle.abort();
    }

    let status = ledger.status().await;
    let peers = registry.peers().await;
    tracing::info!(
        "Stopped at height {} with {} pending record(s) after {}s ({}/{} peers alive)",
        status.height,
        status.pending,
        status.uptime_secs,
        peers.iter().filter(|p| p.alive).count(),
        peers.len()
    );
    Ok(())
}

/// Expand `~` at the start of a path to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}/{}", home.display(), rest);
        }
    }
    path.to_string()
}
