// crates/trustchain-store/src/merkle.rs
//
// MerkleMap: an in-memory authenticated map.
//
// Entries live in a sorted map, so the leaf sequence is a function of the
// key set alone. The root is a binary Merkle tree over that sequence:
//
//   leaf = sha256(0x00 || be_u32(len(key)) || key || value)
//   node = sha256(0x01 || left || right)
//
// An odd node at the end of a level is promoted unchanged. The empty map
// has the all-zero root. The root is cached until the next mutation.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use trustchain_core::crypto::hash_bytes;
use trustchain_core::{CommitmentMap, Digest, TrustchainError, ZERO_DIGEST};

/// Domain separation prefixes: leaves and internal nodes never collide.
const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;

/// Order-independent commitment map over byte keys and values.
#[derive(Debug, Clone, Default)]
pub struct MerkleMap {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
    cached_root: OnceLock<Digest>,
}

impl MerkleMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.entries.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    fn invalidate(&mut self) {
        self.cached_root = OnceLock::new();
    }

    fn compute_root(&self) -> Digest {
        if self.entries.is_empty() {
            return ZERO_DIGEST;
        }

        let mut level: Vec<Digest> = self
            .entries
            .iter()
            .map(|(k, v)| hash_leaf(k, v))
            .collect();

        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len().div_ceil(2));
            for pair in level.chunks(2) {
                let node = match pair {
                    [left, right] => hash_nodes(left, right),
                    _ => pair[0],
                };
                next.push(node);
            }
            level = next;
        }

        level[0]
    }
}

/// Hash a leaf entry with domain separation and a key-length prefix.
pub fn hash_leaf(key: &[u8], value: &[u8]) -> Digest {
    let mut input = Vec::with_capacity(1 + 4 + key.len() + value.len());
    input.push(LEAF_PREFIX);
    input.extend_from_slice(&(key.len() as u32).to_be_bytes());
    input.extend_from_slice(key);
    input.extend_from_slice(value);
    hash_bytes(&input)
}

/// Hash two child nodes into a parent node with domain separation.
pub fn hash_nodes(left: &Digest, right: &Digest) -> Digest {
    let mut input = Vec::with_capacity(1 + 32 + 32);
    input.push(NODE_PREFIX);
    input.extend_from_slice(left);
    input.extend_from_slice(right);
    hash_bytes(&input)
}

impl CommitmentMap for MerkleMap {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), TrustchainError> {
        self.entries.insert(key.to_vec(), value.to_vec());
        self.invalidate();
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TrustchainError> {
        Ok(self.entries.get(key).cloned())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), TrustchainError> {
        if self.entries.remove(key).is_some() {
            self.invalidate();
        }
        Ok(())
    }

    fn root(&self) -> Digest {
        *self.cached_root.get_or_init(|| self.compute_root())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
