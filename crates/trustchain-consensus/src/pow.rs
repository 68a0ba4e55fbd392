// crates/trustchain-consensus/src/pow.rs
//
// Proof-of-work over block templates.
//
// Hash preimage:
//   prev_hash || join(records, ";") || be_i64(timestamp)
//     || be_i64(difficulty_bits) || be_i64(nonce)
//
// A hash satisfies the target when, read as a big-endian unsigned integer,
// it is below 2^(256 - difficulty_bits), i.e. it has at least
// `difficulty_bits` leading zero bits.
//
// The nonce search is split into bounded work units so a caller can stop
// it between units (cancellation flag or deadline) and resume it later.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use tracing::warn;

use trustchain_core::block::RECORD_SEPARATOR;
use trustchain_core::{Block, Digest, StateRoots, TrustchainError};

/// Nonces tried between two checks of the mining control.
pub const WORK_UNIT: u64 = 1 << 16;

/// Exclusive upper bound of the nonce search (nonces are non-negative i64).
pub const MAX_NONCE: u64 = i64::MAX as u64;

/// Everything a block commits to except its nonce and hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTemplate {
    pub timestamp: i64,
    pub records: Vec<String>,
    pub prev_block_hash: Vec<u8>,
    pub roots: StateRoots,
}

impl BlockTemplate {
    /// The preimage bytes that precede the nonce.
    fn prefix(&self, difficulty_bits: u32) -> Vec<u8> {
        let joined = self.records.join(&RECORD_SEPARATOR.to_string());
        let mut data = Vec::with_capacity(self.prev_block_hash.len() + joined.len() + 16);
        data.extend_from_slice(&self.prev_block_hash);
        data.extend_from_slice(joined.as_bytes());
        data.extend_from_slice(&self.timestamp.to_be_bytes());
        data.extend_from_slice(&i64::from(difficulty_bits).to_be_bytes());
        data
    }
}

/// Full hash preimage for a block's fields at a given nonce.
pub fn block_preimage(
    prev_block_hash: &[u8],
    records: &[String],
    timestamp: i64,
    difficulty_bits: u32,
    nonce: u64,
) -> Vec<u8> {
    let template = BlockTemplate {
        timestamp,
        records: records.to_vec(),
        prev_block_hash: prev_block_hash.to_vec(),
        roots: StateRoots::zero(),
    };
    let mut data = template.prefix(difficulty_bits);
    data.extend_from_slice(&nonce.to_be_bytes());
    data
}

/// Recompute the hash of a block from its own stored fields.
pub fn compute_block_hash(block: &Block, difficulty_bits: u32) -> Digest {
    let preimage = block_preimage(
        &block.prev_block_hash,
        &block.records,
        block.timestamp,
        difficulty_bits,
        block.nonce,
    );
    finalize(Sha256::new_with_prefix(&preimage))
}

fn finalize(hasher: Sha256) -> Digest {
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Number of leading zero bits of a digest.
pub fn leading_zero_bits(hash: &Digest) -> u32 {
    let mut count = 0;
    for byte in hash {
        if *byte == 0 {
            count += 8;
        } else {
            count += byte.leading_zeros();
            break;
        }
    }
    count
}

/// Whether `hash < 2^(256 - difficulty_bits)`.
pub fn meets_difficulty(hash: &Digest, difficulty_bits: u32) -> bool {
    leading_zero_bits(hash) >= difficulty_bits
}

/// Check a block's stored hash against its fields and the PoW target.
///
/// Embedded state roots are not examined.
pub fn verify_block(block: &Block, difficulty_bits: u32) -> bool {
    block.nonce < MAX_NONCE
        && compute_block_hash(block, difficulty_bits) == block.hash
        && meets_difficulty(&block.hash, difficulty_bits)
}

/// Outcome of one bounded unit of nonce search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiningStep {
    /// A nonce satisfying the target was found.
    Found(Block),
    /// The unit finished without a solution; call `step` again to continue.
    Pending,
}

/// A resumable nonce search over one block template.
#[derive(Debug, Clone)]
pub struct MiningJob {
    template: BlockTemplate,
    difficulty_bits: u32,
    next_nonce: u64,
    hasher: Sha256,
}

impl MiningJob {
    /// Start a search at nonce 0.
    pub fn new(template: BlockTemplate, difficulty_bits: u32) -> Self {
        let hasher = Sha256::new_with_prefix(template.prefix(difficulty_bits));
        Self {
            template,
            difficulty_bits,
            next_nonce: 0,
            hasher,
        }
    }

    /// Resume a search from an arbitrary nonce.
    pub fn starting_at(mut self, nonce: u64) -> Self {
        self.next_nonce = nonce;
        self
    }

    /// The template being mined.
    pub fn template(&self) -> &BlockTemplate {
        &self.template
    }

    /// The next nonce `step` will try.
    pub fn next_nonce(&self) -> u64 {
        self.next_nonce
    }

    /// Try at most `max_nonces` nonces.
    ///
    /// Returns `NonceSpaceExhausted` once every nonce below `MAX_NONCE` has
    /// been tried for this template.
    pub fn step(&mut self, max_nonces: u64) -> Result<MiningStep, TrustchainError> {
        if self.next_nonce >= MAX_NONCE {
            return Err(TrustchainError::NonceSpaceExhausted(self.template.timestamp));
        }

        let end = self.next_nonce.saturating_add(max_nonces).min(MAX_NONCE);
        while self.next_nonce < end {
            let nonce = self.next_nonce;
            self.next_nonce += 1;

            let mut hasher = self.hasher.clone();
            hasher.update(nonce.to_be_bytes());
            let hash = finalize(hasher);

            if meets_difficulty(&hash, self.difficulty_bits) {
                return Ok(MiningStep::Found(self.seal(nonce, hash)));
            }
        }

        if self.next_nonce >= MAX_NONCE {
            return Err(TrustchainError::NonceSpaceExhausted(self.template.timestamp));
        }
        Ok(MiningStep::Pending)
    }

    /// Drive the search in work units until a block is found or `control`
    /// says to stop.
    pub fn run(&mut self, control: &MiningControl) -> Result<Block, TrustchainError> {
        loop {
            control.check()?;
            if let MiningStep::Found(block) = self.step(WORK_UNIT)? {
                return Ok(block);
            }
        }
    }

    fn seal(&self, nonce: u64, hash: Digest) -> Block {
        Block {
            timestamp: self.template.timestamp,
            records: self.template.records.clone(),
            prev_block_hash: self.template.prev_block_hash.clone(),
            hash,
            nonce,
            roots: self.template.roots,
        }
    }
}

/// Mine a template to completion.
///
/// When the whole nonce space fails for one timestamp, the timestamp is
/// rolled forward one second and the search restarts from nonce 0.
pub fn mine(
    mut template: BlockTemplate,
    difficulty_bits: u32,
    control: &MiningControl,
) -> Result<Block, TrustchainError> {
    loop {
        match MiningJob::new(template.clone(), difficulty_bits).run(control) {
            Err(TrustchainError::NonceSpaceExhausted(timestamp)) => {
                warn!(timestamp, "Nonce space exhausted, rolling block timestamp");
                template.timestamp = timestamp.saturating_add(1);
            }
            other => return other,
        }
    }
}

/// External stop signals for a nonce search.
///
/// Clones share the cancellation flag, so a handle taken before mining
/// starts can stop it from another thread.
#[derive(Debug, Clone, Default)]
pub struct MiningControl {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl MiningControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy sharing this control's flag, bounded by `timeout` from now.
    pub fn with_timeout(&self, timeout: Option<Duration>) -> Self {
        Self {
            cancelled: Arc::clone(&self.cancelled),
            deadline: timeout.map(|t| Instant::now() + t),
        }
    }

    /// Request that any search using this flag stop at its next check.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Clear a previous cancellation request.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Error out if cancelled or past the deadline.
    pub fn check(&self) -> Result<(), TrustchainError> {
        if self.is_cancelled() {
            return Err(TrustchainError::MiningCancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(TrustchainError::MiningTimedOut);
            }
        }
        Ok(())
    }
}
