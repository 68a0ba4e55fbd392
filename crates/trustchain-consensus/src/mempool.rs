// crates/trustchain-consensus/src/mempool.rs
//
// FIFO buffer of pending record strings awaiting the next block.
// No priority and no eviction: the only way out is a full flush.

use trustchain_core::{LedgerRecord, TrustchainError};

/// Pending records in arrival order, with a flush threshold.
#[derive(Debug, Clone)]
pub struct Mempool {
    records: Vec<String>,
    capacity: usize,
}

impl Mempool {
    /// Create an empty mempool that reports full at `capacity` records.
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Vec::new(),
            capacity,
        }
    }

    /// Append a record. Returns `true` when the queue has reached capacity.
    pub fn push(&mut self, record: String) -> Result<bool, TrustchainError> {
        LedgerRecord::check_raw(&record)?;
        self.records.push(record);
        Ok(self.is_full())
    }

    /// Whether the queue length has reached the flush threshold.
    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    /// Pending records, oldest first.
    pub fn pending(&self) -> &[String] {
        &self.records
    }

    /// Remove and return every pending record.
    pub fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
