// crates/trustchain-consensus/src/engine.rs
//
// LedgerEngine: the single owner of ledger state, chain, and mempool.
//
// Every mutating call takes `&mut self`, so callers serialize writes by
// construction (the daemon wraps the engine in one RwLock). A write that
// fills the mempool runs the whole flush inline: bulk trust recomputation,
// mining over the batch and the current roots, append, clear.
//
// Ledger state is the current-tip state. Replacing the chain with a peer's
// does not touch it; `rebuild_state_from_chain` is the explicit way to
// re-derive it from the adopted chain's records.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use trustchain_core::{
    Block, Digest, LedgerParams, LedgerRecord, RootPolicy, TrustSubmission, TrustchainError,
};
use trustchain_reputation::{admit_submission, calculate_all_comp_trust, comp_trust, PropagationParams};
use trustchain_store::LedgerState;

use crate::chain::Blockchain;
use crate::mempool::Mempool;
use crate::pow::MiningControl;
use crate::replay::{apply_record, replay_chain, replay_records};

/// What happened to the mempool after a write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FlushOutcome {
    /// The record was queued; the batch is not sealed yet.
    Queued { pending: usize },
    /// The batch was sealed into a new block.
    Sealed {
        height: usize,
        #[serde(with = "trustchain_core::block::hex_digest")]
        hash: Digest,
    },
    /// The record was accepted and queued, but sealing the full batch
    /// stopped (cancelled or timed out). The next write or flush retries.
    SealDeferred { pending: usize, reason: String },
}

/// Current Unix time in seconds.
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

#[derive(Debug)]
pub struct LedgerEngine {
    params: LedgerParams,
    state: LedgerState,
    chain: Blockchain,
    mempool: Mempool,
    control: MiningControl,
}

impl LedgerEngine {
    /// Create an engine over an empty in-memory state, mining genesis now.
    pub fn new(params: LedgerParams) -> Result<Self, TrustchainError> {
        Self::with_state(params, LedgerState::new())
    }

    /// Create an engine over a caller-built state (e.g. custom stores).
    pub fn with_state(params: LedgerParams, state: LedgerState) -> Result<Self, TrustchainError> {
        params.validate()?;
        let control = MiningControl::new();
        let chain = Blockchain::genesis(
            params.difficulty_bits,
            unix_now(),
            &control.with_timeout(params.mining_timeout()),
        )?;
        let mempool = Mempool::new(params.mempool_capacity);
        Ok(Self {
            params,
            state,
            chain,
            mempool,
            control,
        })
    }

    pub fn params(&self) -> &LedgerParams {
        &self.params
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn chain(&self) -> &Blockchain {
        &self.chain
    }

    pub fn mempool(&self) -> &Mempool {
        &self.mempool
    }

    /// A handle sharing the engine's cancellation flag.
    ///
    /// Take it before handing the engine to a blocking thread; cancelling
    /// it stops any in-flight nonce search at its next check.
    pub fn mining_control(&self) -> MiningControl {
        self.control.clone()
    }

    // --- writes -----------------------------------------------------------

    /// Admit a signed direct-trust submission against the local clock.
    pub fn submit_trust(&mut self, submission: &TrustSubmission) -> Result<FlushOutcome, TrustchainError> {
        self.submit_trust_at(submission, unix_now())
    }

    /// Admit a signed direct-trust submission against an explicit `now`.
    ///
    /// On success the submission's TRUST record is queued.
    pub fn submit_trust_at(
        &mut self,
        submission: &TrustSubmission,
        now: i64,
    ) -> Result<FlushOutcome, TrustchainError> {
        let record = submission.to_record();
        record.check_fields()?;
        let record = record.to_string();
        LedgerRecord::check_raw(&record)?;
        admit_submission(
            &mut self.state,
            submission,
            now,
            self.params.timestamp_window_secs,
        )?;
        self.enqueue(record)
    }

    /// Queue a raw record with no ledger-state effect.
    pub fn submit_record(&mut self, record: String) -> Result<FlushOutcome, TrustchainError> {
        LedgerRecord::check_raw(&record)?;
        self.enqueue(record)
    }

    /// Apply an identity record produced by a registration workflow and
    /// queue it.
    pub fn apply_identity_record(&mut self, record: LedgerRecord) -> Result<FlushOutcome, TrustchainError> {
        if !matches!(
            record,
            LedgerRecord::Register { .. } | LedgerRecord::Update { .. } | LedgerRecord::Revoke { .. }
        ) {
            return Err(TrustchainError::Validation(format!(
                "not an identity record: {}",
                record
            )));
        }
        record.check_fields()?;
        let raw = record.to_string();
        LedgerRecord::check_raw(&raw)?;
        apply_record(&mut self.state, &record)?;
        self.enqueue(raw)
    }

    /// Seal whatever is pending now, without waiting for capacity.
    ///
    /// An empty mempool is left alone.
    pub fn flush(&mut self) -> Result<FlushOutcome, TrustchainError> {
        if self.mempool.is_empty() {
            return Ok(FlushOutcome::Queued { pending: 0 });
        }
        self.seal_pending()
    }

    /// Queue an accepted record and seal if the batch is full.
    ///
    /// Once the record is queued the write has succeeded: a sealing failure
    /// is reported as `SealDeferred`, never as an error.
    fn enqueue(&mut self, record: String) -> Result<FlushOutcome, TrustchainError> {
        if !self.mempool.push(record)? {
            return Ok(FlushOutcome::Queued {
                pending: self.mempool.len(),
            });
        }
        match self.seal_pending() {
            Ok(outcome) => Ok(outcome),
            Err(e) => Ok(FlushOutcome::SealDeferred {
                pending: self.mempool.len(),
                reason: e.to_string(),
            }),
        }
    }

    /// Recompute computed trust, mine the pending batch, append, clear.
    ///
    /// If mining is cancelled or times out the batch stays queued and the
    /// next write retries the flush.
    fn seal_pending(&mut self) -> Result<FlushOutcome, TrustchainError> {
        let propagation = PropagationParams::from(&self.params);
        let pairs = calculate_all_comp_trust(&mut self.state, &propagation).map_err(|e| {
            warn!(error = %e, pending = self.mempool.len(), "Trust recomputation failed; batch kept");
            e
        })?;

        let roots = self.state.roots();
        let control = self.control.with_timeout(self.params.mining_timeout());
        let records = self.mempool.pending().to_vec();
        let count = records.len();

        let hash = match self.chain.append(records, roots, unix_now(), &control) {
            Ok(block) => block.hash,
            Err(e) => {
                warn!(error = %e, pending = count, "Block sealing stopped; batch kept");
                return Err(e);
            }
        };
        let height = self.chain.len() - 1;

        self.mempool.drain();
        info!(records = count, pairs, height, "Batch sealed");
        Ok(FlushOutcome::Sealed { height, hash })
    }

    // --- reads ------------------------------------------------------------

    /// Live computed trust C(i, j) from the current graph.
    pub fn comp_trust(&self, address_i: &str, address_j: &str) -> f64 {
        comp_trust(
            self.state.graph(),
            address_i,
            address_j,
            &PropagationParams::from(&self.params),
        )
    }

    /// The stored direct-trust string for (i, j).
    pub fn query_direct(&self, address_i: &str, address_j: &str) -> Result<Option<String>, TrustchainError> {
        self.state.direct_trust_value(address_i, address_j)
    }

    /// The last bulk-computed trust string for (i, j).
    pub fn query_comp(&self, address_i: &str, address_j: &str) -> Result<Option<String>, TrustchainError> {
        self.state.comp_trust_value(address_i, address_j)
    }

    /// The hex-encoded public key registered for an address.
    pub fn query_identity(&self, address: &str) -> Result<Option<String>, TrustchainError> {
        Ok(self.state.identity().get(address)?.map(hex::encode))
    }

    pub fn blocks(&self) -> &[Block] {
        self.chain.blocks()
    }

    /// The full chain as the JSON array served to peers.
    pub fn export_chain(&self) -> Result<Vec<u8>, TrustchainError> {
        Block::encode_chain(self.chain.blocks())
    }

    // --- peer chains ------------------------------------------------------

    /// Adopt `candidate` if it is strictly longer and valid.
    ///
    /// Under `RootPolicy::Replay` the candidate must also replay to its own
    /// embedded roots. Ledger state is not changed either way.
    pub fn replace_chain(&mut self, candidate: Vec<Block>) -> Result<(), TrustchainError> {
        if self.params.root_policy == RootPolicy::Replay {
            if candidate.len() <= self.chain.len() {
                return Err(TrustchainError::SyncRejected(format!(
                    "candidate length {} is not longer than local length {}",
                    candidate.len(),
                    self.chain.len()
                )));
            }
            replay_chain(&candidate, &self.params)
                .map_err(|e| TrustchainError::SyncRejected(e.to_string()))?;
        }
        self.chain.replace(candidate)
    }

    /// Replace ledger state with a replay of the local chain's records,
    /// then re-apply the still-pending records on top.
    ///
    /// Identity entries that never went through a record are dropped.
    pub fn rebuild_state_from_chain(&mut self) -> Result<(), TrustchainError> {
        let mut state = replay_records(self.chain.blocks(), &self.params)?;
        for raw in self.mempool.pending() {
            apply_record(&mut state, &LedgerRecord::parse(raw))?;
        }
        self.state = state;
        info!(
            height = self.chain.len() - 1,
            addresses = self.state.roster().len(),
            "Ledger state rebuilt from chain"
        );
        Ok(())
    }
}
