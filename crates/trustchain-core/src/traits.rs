// crates/trustchain-core/src/traits.rs

use async_trait::async_trait;

use crate::block::{Block, Digest};
use crate::error::TrustchainError;

/// A keyed map whose root deterministically summarizes its contents.
///
/// The root must depend only on the current key/value set, never on the
/// order of updates. Implemented in memory by trustchain-store
/// (`MerkleMap`); a caller may back it with disk.
pub trait CommitmentMap: Send + Sync {
    /// Insert or overwrite a value.
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), TrustchainError>;

    /// Read a value.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TrustchainError>;

    /// Remove a key. Removing an absent key is a no-op.
    fn delete(&mut self, key: &[u8]) -> Result<(), TrustchainError>;

    /// The 32-byte commitment over the current contents.
    fn root(&self) -> Digest;

    /// Number of entries.
    fn len(&self) -> usize;

    /// Whether the map holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The identity registry: address -> public key bytes.
///
/// Registration workflows live outside the ledger core; the core reads
/// the registry for membership checks and commits to its root.
pub trait IdentityRegistry: Send + Sync {
    /// Look up the public key registered for an address.
    fn get(&self, address: &str) -> Result<Option<Vec<u8>>, TrustchainError>;

    /// Register (or overwrite) an address's public key.
    fn put(&mut self, address: &str, public_key: &[u8]) -> Result<(), TrustchainError>;

    /// Remove an address.
    fn delete(&mut self, address: &str) -> Result<(), TrustchainError>;

    /// The commitment root over all registrations.
    fn root(&self) -> Digest;

    /// Whether an address is registered.
    fn contains(&self, address: &str) -> Result<bool, TrustchainError> {
        Ok(self.get(address)?.is_some())
    }
}

/// A peer that can hand over its full ordered block list.
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// A human-readable identifier for logs (e.g. the peer URL).
    fn name(&self) -> &str;

    /// Fetch the peer's full chain, genesis first.
    async fn fetch_blocks(&self) -> Result<Vec<Block>, TrustchainError>;
}
