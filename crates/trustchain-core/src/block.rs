// crates/trustchain-core/src/block.rs
//
// Block and state-root types, plus their wire encoding.
//
// A block is a commitment: it carries the three state-store roots as they
// stood when it was mined. Nothing recomputes those roots during ordinary
// validation; auditors replay records to check them independently.
//
// Wire encoding (peer chain transfer):
//   { "timestamp": i64, "records": [str], "prevBlockHash": hex, "hash": hex,
//     "nonce": u64, "pkiRootHash": hex, "directTrustRootHash": hex,
//     "compTrustRootHash": hex }

use serde::{Deserialize, Serialize};

/// A 32-byte digest (block hash or commitment root).
pub type Digest = [u8; 32];

/// The all-zero digest: root of an empty store and of the genesis block.
pub const ZERO_DIGEST: Digest = [0u8; 32];

/// The only record carried by the genesis block.
pub const GENESIS_RECORD: &str = "Genesis Block";

/// Separator used when joining a block's records for hashing.
pub const RECORD_SEPARATOR: char = ';';

/// The three state-store roots committed by a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StateRoots {
    /// Root of the identity registry.
    #[serde(rename = "pkiRootHash", with = "hex_digest")]
    pub pki: Digest,
    /// Root of the direct-trust store.
    #[serde(rename = "directTrustRootHash", with = "hex_digest")]
    pub direct_trust: Digest,
    /// Root of the computed-trust store.
    #[serde(rename = "compTrustRootHash", with = "hex_digest")]
    pub comp_trust: Digest,
}

impl StateRoots {
    /// All-zero roots, as committed by the genesis block.
    pub fn zero() -> Self {
        Self::default()
    }
}

/// An immutable, mined block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Unix timestamp (seconds) of the mining template.
    pub timestamp: i64,
    /// Ordered record batch.
    pub records: Vec<String>,
    /// Hash of the predecessor; empty for genesis.
    #[serde(with = "hex_bytes")]
    pub prev_block_hash: Vec<u8>,
    /// Own hash, as found by the nonce search.
    #[serde(with = "hex_digest")]
    pub hash: Digest,
    /// Winning nonce.
    pub nonce: u64,
    /// State roots at mining time.
    #[serde(flatten)]
    pub roots: StateRoots,
}

impl Block {
    /// Whether this block is shaped like a genesis block.
    pub fn is_genesis(&self) -> bool {
        self.prev_block_hash.is_empty()
            && self.records.len() == 1
            && self.records[0] == GENESIS_RECORD
    }

    /// Lowercase hex of the block hash.
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    /// Encode a block list as the JSON array exchanged between peers.
    pub fn encode_chain(blocks: &[Block]) -> Result<Vec<u8>, crate::TrustchainError> {
        Ok(serde_json::to_vec(blocks)?)
    }

    /// Decode a peer's JSON block list.
    pub fn decode_chain(bytes: &[u8]) -> Result<Vec<Block>, crate::TrustchainError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Strip an optional `0x` prefix before hex-decoding.
fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x").unwrap_or(s)
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        hex::decode(super::strip_hex_prefix(&encoded)).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for a `Digest` as lowercase hex (an `0x` prefix is
/// accepted on input).
pub mod hex_digest {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Digest;

    pub fn serialize<S>(value: &Digest, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Digest, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let bytes =
            hex::decode(super::strip_hex_prefix(&encoded)).map_err(serde::de::Error::custom)?;
        if bytes.len() != 32 {
            return Err(serde::de::Error::custom(format!(
                "expected 32 bytes, found {}",
                bytes.len()
            )));
        }
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&bytes);
        Ok(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> Block {
        Block {
            timestamp: 1_700_000_000,
            records: vec!["a".to_string(), "b".to_string()],
            prev_block_hash: vec![0xab; 32],
            hash: [0x01; 32],
            nonce: 42,
            roots: StateRoots {
                pki: [0x02; 32],
                direct_trust: [0x03; 32],
                comp_trust: [0x04; 32],
            },
        }
    }

    #[test]
    fn test_wire_field_names() {
        let json = serde_json::to_value(sample_block()).unwrap();
        for field in [
            "timestamp",
            "records",
            "prevBlockHash",
            "hash",
            "nonce",
            "pkiRootHash",
            "directTrustRootHash",
            "compTrustRootHash",
        ] {
            assert!(json.get(field).is_some(), "missing field {}", field);
        }
        assert_eq!(json["hash"], hex::encode([0x01u8; 32]));
    }

    #[test]
    fn test_decode_accepts_0x_prefixed_roots() {
        let mut json = serde_json::to_value(sample_block()).unwrap();
        json["pkiRootHash"] = serde_json::Value::String(format!("0x{}", hex::encode([0x02u8; 32])));
        let decoded: Block = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, sample_block());
    }

    #[test]
    fn test_decode_rejects_short_digest() {
        let mut json = serde_json::to_value(sample_block()).unwrap();
        json["hash"] = serde_json::Value::String("abcd".to_string());
        assert!(serde_json::from_value::<Block>(json).is_err());
    }

    #[test]
    fn test_genesis_prev_hash_encodes_empty() {
        let genesis = Block {
            timestamp: 0,
            records: vec![GENESIS_RECORD.to_string()],
            prev_block_hash: Vec::new(),
            hash: ZERO_DIGEST,
            nonce: 0,
            roots: StateRoots::zero(),
        };
        assert!(genesis.is_genesis());
        let json = serde_json::to_value(&genesis).unwrap();
        assert_eq!(json["prevBlockHash"], "");
        let chain = Block::decode_chain(&Block::encode_chain(&[genesis.clone()]).unwrap()).unwrap();
        assert_eq!(chain, vec![genesis]);
    }
}
