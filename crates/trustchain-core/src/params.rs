// crates/trustchain-core/src/params.rs
//
// Ledger parameters shared by the engine, the miner, and the propagation
// algorithm. Loaded from the `[ledger]` table of the daemon config; every
// field has a default.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the neighbor count `m` is accumulated in the propagation formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PathCountMode {
    /// Count each positive-trust neighbor twice, once per pass, so `m` is
    /// double the neighbor count.
    #[default]
    Reference,
    /// Count each positive-trust neighbor once.
    Single,
}

/// Whether embedded state roots are re-verified when adopting a peer chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RootPolicy {
    /// Roots are trusted commitments; only hashes and linkage are checked.
    #[default]
    Trusted,
    /// Candidate chains are replayed from their records and each block's
    /// roots must match the replayed state.
    Replay,
}

/// Tunable parameters of the ledger engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerParams {
    /// Required leading zero bits of a block hash.
    #[serde(default = "default_difficulty_bits")]
    pub difficulty_bits: u32,

    /// Number of pending records that triggers a flush.
    #[serde(default = "default_mempool_capacity")]
    pub mempool_capacity: usize,

    /// Maximum distance (seconds) between a submission timestamp and local time.
    #[serde(default = "default_timestamp_window_secs")]
    pub timestamp_window_secs: i64,

    /// Smoothing constant `c` in `mu = m / (m + c)`.
    #[serde(default = "default_smoothing_constant")]
    pub smoothing_constant: f64,

    /// Neighbor-count accumulation mode.
    #[serde(default)]
    pub path_count: PathCountMode,

    /// Embedded-root verification policy for peer chains.
    #[serde(default)]
    pub root_policy: RootPolicy,

    /// Optional wall-clock bound on one block-sealing attempt.
    #[serde(default)]
    pub mining_timeout_secs: Option<u64>,
}

fn default_difficulty_bits() -> u32 {
    20
}

fn default_mempool_capacity() -> usize {
    30001
}

fn default_timestamp_window_secs() -> i64 {
    40
}

fn default_smoothing_constant() -> f64 {
    1.0
}

impl Default for LedgerParams {
    fn default() -> Self {
        Self {
            difficulty_bits: default_difficulty_bits(),
            mempool_capacity: default_mempool_capacity(),
            timestamp_window_secs: default_timestamp_window_secs(),
            smoothing_constant: default_smoothing_constant(),
            path_count: PathCountMode::default(),
            root_policy: RootPolicy::default(),
            mining_timeout_secs: None,
        }
    }
}

impl LedgerParams {
    /// The mining timeout as a `Duration`, if configured.
    pub fn mining_timeout(&self) -> Option<Duration> {
        self.mining_timeout_secs.map(Duration::from_secs)
    }

    /// Check that the parameters are usable.
    pub fn validate(&self) -> Result<(), crate::TrustchainError> {
        if self.difficulty_bits > 255 {
            return Err(crate::TrustchainError::Validation(format!(
                "difficulty_bits must be below 256, got {}",
                self.difficulty_bits
            )));
        }
        if self.mempool_capacity == 0 {
            return Err(crate::TrustchainError::Validation(
                "mempool_capacity must be at least 1".to_string(),
            ));
        }
        if self.smoothing_constant <= 0.0 || !self.smoothing_constant.is_finite() {
            return Err(crate::TrustchainError::Validation(format!(
                "smoothing_constant must be positive, got {}",
                self.smoothing_constant
            )));
        }
        if self.timestamp_window_secs < 0 {
            return Err(crate::TrustchainError::Validation(
                "timestamp_window_secs must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}
