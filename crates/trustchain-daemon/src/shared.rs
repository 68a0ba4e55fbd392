// crates/trustchain-daemon/src/shared.rs
//
// LedgerHandle: the daemon's shared handle on the one LedgerEngine.
//
// The engine sits behind a single tokio RwLock. Anything that may mine or
// replay runs on a blocking thread holding an owned write guard, so the
// async workers never stall and readers queue behind the write.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::RwLock;

use trustchain_consensus::{FlushOutcome, LedgerEngine, MiningControl};
use trustchain_core::TrustchainError;

/// Point-in-time view of the node for logs.
#[derive(Debug, Clone, Serialize)]
pub struct NodeStatus {
    pub height: usize,
    pub tip: String,
    pub pending: usize,
    pub addresses: usize,
    pub uptime_secs: u64,
}

/// Cloneable handle shared by every daemon task.
#[derive(Clone)]
pub struct LedgerHandle {
    engine: Arc<RwLock<LedgerEngine>>,
    /// Shares the engine's cancellation flag without taking the lock.
    control: MiningControl,
    /// Daemon start time for uptime calculation.
    pub start_time: Instant,
}

impl LedgerHandle {
    pub fn new(engine: LedgerEngine) -> Self {
        let control = engine.mining_control();
        Self {
            engine: Arc::new(RwLock::new(engine)),
            control,
            start_time: Instant::now(),
        }
    }

    /// The locked engine, for callers that drive it directly (peer sync).
    pub fn engine(&self) -> &Arc<RwLock<LedgerEngine>> {
        &self.engine
    }

    /// Stop any in-flight nonce search. Later sealing attempts fail until
    /// the flag is reset.
    pub fn cancel_mining(&self) {
        self.control.cancel();
    }

    /// Seal the pending batch now.
    pub async fn flush(&self) -> Result<FlushOutcome, TrustchainError> {
        self.write_blocking(|engine| engine.flush()).await
    }

    /// Replace ledger state with a replay of the current chain.
    pub async fn rebuild_state(&self) -> Result<(), TrustchainError> {
        self.write_blocking(|engine| engine.rebuild_state_from_chain())
            .await
    }

    pub async fn status(&self) -> NodeStatus {
        let engine = self.engine.read().await;
        NodeStatus {
            height: engine.chain().len().saturating_sub(1),
            tip: engine
                .chain()
                .tip()
                .map(|block| block.hash_hex())
                .unwrap_or_default(),
            pending: engine.mempool().len(),
            addresses: engine.state().roster().len(),
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }

    /// Run `f` on a blocking thread with exclusive access to the engine.
    async fn write_blocking<F, T>(&self, f: F) -> Result<T, TrustchainError>
    where
        F: FnOnce(&mut LedgerEngine) -> Result<T, TrustchainError> + Send + 'static,
        T: Send + 'static,
    {
        let mut guard = Arc::clone(&self.engine).write_owned().await;
        tokio::task::spawn_blocking(move || f(&mut guard))
            .await
            .map_err(|e| TrustchainError::Storage(format!("engine task failed: {}", e)))?
    }
}
