// crates/trustchain-consensus/src/chain.rs
//
// Chain manager: owns the ordered block list, extends it with newly mined
// blocks, and swaps it for a strictly longer valid candidate.
//
// Validation checks, for every block after genesis, that the stored hash
// re-derives from the block's fields and meets the PoW target, and that
// `prev_block_hash` equals the predecessor's hash. Genesis blocks are never
// compared, so two nodes whose genesis blocks were mined at different times
// still accept each other's chains. Embedded state roots are not examined.

use tracing::info;

use trustchain_core::block::GENESIS_RECORD;
use trustchain_core::{Block, StateRoots, TrustchainError};

use crate::pow::{self, BlockTemplate, MiningControl};

/// The local chain plus the difficulty it is mined and validated at.
#[derive(Debug, Clone)]
pub struct Blockchain {
    blocks: Vec<Block>,
    difficulty_bits: u32,
}

impl Blockchain {
    /// Mine a fresh genesis block at `timestamp` and start a chain with it.
    pub fn genesis(
        difficulty_bits: u32,
        timestamp: i64,
        control: &MiningControl,
    ) -> Result<Self, TrustchainError> {
        let template = BlockTemplate {
            timestamp,
            records: vec![GENESIS_RECORD.to_string()],
            prev_block_hash: Vec::new(),
            roots: StateRoots::zero(),
        };
        let block = pow::mine(template, difficulty_bits, control)?;
        info!(hash = %block.hash_hex(), "Genesis block mined");
        Ok(Self {
            blocks: vec![block],
            difficulty_bits,
        })
    }

    /// Adopt an existing block list after validating it.
    pub fn from_blocks(blocks: Vec<Block>, difficulty_bits: u32) -> Result<Self, TrustchainError> {
        validate(&blocks, difficulty_bits)?;
        Ok(Self {
            blocks,
            difficulty_bits,
        })
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Number of blocks, genesis included.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Never true for a constructed chain; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn difficulty_bits(&self) -> u32 {
        self.difficulty_bits
    }

    /// The last block.
    pub fn tip(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Template for the next block: links to the tip and commits `roots`.
    pub fn next_template(&self, records: Vec<String>, roots: StateRoots, timestamp: i64) -> BlockTemplate {
        BlockTemplate {
            timestamp,
            records,
            prev_block_hash: self
                .tip()
                .map(|tip| tip.hash.to_vec())
                .unwrap_or_default(),
            roots,
        }
    }

    /// Mine a block over `records` and `roots` and extend the chain with it.
    pub fn append(
        &mut self,
        records: Vec<String>,
        roots: StateRoots,
        timestamp: i64,
        control: &MiningControl,
    ) -> Result<&Block, TrustchainError> {
        let template = self.next_template(records, roots, timestamp);
        let block = pow::mine(template, self.difficulty_bits, control)?;
        self.push_block(block)
    }

    /// Extend the chain with an already mined block, checking it first.
    pub fn push_block(&mut self, block: Block) -> Result<&Block, TrustchainError> {
        let height = self.blocks.len();
        if let Some(tip) = self.blocks.last() {
            check_link(height, tip, &block, self.difficulty_bits)?;
        }
        info!(
            height,
            records = block.records.len(),
            hash = %block.hash_hex(),
            "Block appended"
        );
        self.blocks.push(block);
        Ok(&self.blocks[height])
    }

    /// Whether `candidate` is a valid chain at this chain's difficulty.
    pub fn is_valid(&self, candidate: &[Block]) -> bool {
        validate(candidate, self.difficulty_bits).is_ok()
    }

    /// Swap in `candidate` iff it is strictly longer and valid.
    ///
    /// On rejection the local chain is untouched.
    pub fn replace(&mut self, candidate: Vec<Block>) -> Result<(), TrustchainError> {
        if candidate.len() <= self.blocks.len() {
            return Err(TrustchainError::SyncRejected(format!(
                "candidate length {} is not longer than local length {}",
                candidate.len(),
                self.blocks.len()
            )));
        }
        validate(&candidate, self.difficulty_bits)
            .map_err(|e| TrustchainError::SyncRejected(e.to_string()))?;

        info!(
            from = self.blocks.len(),
            to = candidate.len(),
            "Local chain replaced by longer valid chain"
        );
        self.blocks = candidate;
        Ok(())
    }
}

/// Validate a block list: hashes, PoW, and linkage from index 1 on.
///
/// Returns the first mismatch as `ChainValidation`.
pub fn validate(blocks: &[Block], difficulty_bits: u32) -> Result<(), TrustchainError> {
    if blocks.is_empty() {
        return Err(TrustchainError::ChainValidation {
            height: 0,
            reason: "chain is empty".to_string(),
        });
    }
    for (height, pair) in blocks.windows(2).enumerate() {
        check_link(height + 1, &pair[0], &pair[1], difficulty_bits)?;
    }
    Ok(())
}

fn check_link(height: usize, prev: &Block, block: &Block, difficulty_bits: u32) -> Result<(), TrustchainError> {
    if !pow::verify_block(block, difficulty_bits) {
        return Err(TrustchainError::ChainValidation {
            height,
            reason: "hash does not match contents or difficulty".to_string(),
        });
    }
    if block.prev_block_hash.as_slice() != prev.hash.as_slice() {
        return Err(TrustchainError::ChainValidation {
            height,
            reason: format!(
                "previous hash {} does not match predecessor {}",
                hex::encode(&block.prev_block_hash),
                prev.hash_hex()
            ),
        });
    }
    Ok(())
}
