// crates/trustchain-store/src/identity.rs
//
// In-memory identity registry: address -> public key bytes, committed
// through a MerkleMap so its root can be anchored in blocks.

use trustchain_core::{CommitmentMap, Digest, IdentityRegistry, TrustchainError};

use crate::merkle::MerkleMap;

/// Identity registry backed by a `MerkleMap` keyed by address bytes.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityRegistry {
    map: MerkleMap,
}

impl InMemoryIdentityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered addresses.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no address is registered.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl IdentityRegistry for InMemoryIdentityRegistry {
    fn get(&self, address: &str) -> Result<Option<Vec<u8>>, TrustchainError> {
        self.map.get(address.as_bytes())
    }

    fn put(&mut self, address: &str, public_key: &[u8]) -> Result<(), TrustchainError> {
        self.map.put(address.as_bytes(), public_key)
    }

    fn delete(&mut self, address: &str) -> Result<(), TrustchainError> {
        self.map.delete(address.as_bytes())
    }

    fn root(&self) -> Digest {
        self.map.root()
    }
}
