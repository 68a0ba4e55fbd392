// crates/trustchain-core/src/crypto.rs

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use sha2::Sha256;
use sha3::{Digest, Keccak256};

use crate::error::TrustchainError;

/// Length of a recoverable signature on the wire: r (32) || s (32) || v (1).
pub const RECOVERABLE_SIGNATURE_LEN: usize = 65;

/// A secp256k1 keypair producing recoverable signatures.
///
/// The public identity of a keypair is its Ethereum-style address, so a
/// verifier holding only a signature and the signed message can recover
/// who signed it.
pub struct Keypair {
    pub signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random secp256k1 keypair.
    pub fn generate() -> Self {
        Keypair {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// Rebuild a keypair from 32 secret-scalar bytes.
    pub fn from_secret_bytes(secret: &[u8]) -> Result<Self, TrustchainError> {
        let signing_key = SigningKey::from_slice(secret)
            .map_err(|e| TrustchainError::Crypto(format!("Invalid secret key: {}", e)))?;
        Ok(Keypair { signing_key })
    }

    /// Uncompressed SEC1 public key bytes (65 bytes, leading 0x04).
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.signing_key
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }

    /// The `0x`-prefixed lowercase address derived from the public key.
    pub fn address(&self) -> String {
        address_from_verifying_key(self.signing_key.verifying_key())
    }

    /// Sign keccak256(message) and return the 65-byte `r || s || v` signature.
    pub fn sign_recoverable(&self, message: &[u8]) -> Result<Vec<u8>, TrustchainError> {
        let prehash = keccak256(message);
        let (signature, recovery_id) = self.signing_key.sign_prehash_recoverable(&prehash)?;
        let mut out = Vec::with_capacity(RECOVERABLE_SIGNATURE_LEN);
        out.extend_from_slice(&signature.to_bytes());
        out.push(recovery_id.to_byte());
        Ok(out)
    }

    /// Sign a message and return the signature base64-encoded, as transported.
    pub fn sign_base64(&self, message: &[u8]) -> Result<String, TrustchainError> {
        Ok(BASE64.encode(self.sign_recoverable(message)?))
    }
}

/// Derive the address for a public key: `0x` + hex of the last 20 bytes of
/// keccak256 over the uncompressed point without its 0x04 prefix.
pub fn address_from_verifying_key(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}

/// Derive the address for uncompressed (or compressed) SEC1 public key bytes.
pub fn address_from_public_key(public_key: &[u8]) -> Result<String, TrustchainError> {
    let key = VerifyingKey::from_sec1_bytes(public_key)
        .map_err(|e| TrustchainError::Crypto(format!("Invalid public key: {}", e)))?;
    Ok(address_from_verifying_key(&key))
}

/// Recover the signer's address from keccak256(message) and a 65-byte signature.
///
/// The recovery byte may be 0/1 or the legacy 27/28 form.
pub fn recover_address(message: &[u8], signature: &[u8]) -> Result<String, TrustchainError> {
    if signature.len() != RECOVERABLE_SIGNATURE_LEN {
        return Err(TrustchainError::Authentication(format!(
            "signature must be {} bytes, got {}",
            RECOVERABLE_SIGNATURE_LEN,
            signature.len()
        )));
    }

    let sig = Signature::from_slice(&signature[..64])
        .map_err(|e| TrustchainError::Authentication(format!("malformed signature: {}", e)))?;
    let v = match signature[64] {
        27 | 28 => signature[64] - 27,
        other => other,
    };
    let recovery_id = RecoveryId::from_byte(v).ok_or_else(|| {
        TrustchainError::Authentication(format!("invalid recovery id {}", signature[64]))
    })?;

    let prehash = keccak256(message);
    let key = VerifyingKey::recover_from_prehash(&prehash, &sig, recovery_id)
        .map_err(|_| TrustchainError::Authentication("unable to recover address".to_string()))?;
    Ok(address_from_verifying_key(&key))
}

/// Recover the signer's address from a base64-encoded signature.
pub fn recover_address_base64(message: &[u8], signature_b64: &str) -> Result<String, TrustchainError> {
    let signature = BASE64.decode(signature_b64)?;
    recover_address(message, &signature)
}

/// Compute SHA-256 hash of the given bytes.
///
/// Returns a 32-byte hash.
pub fn hash_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Compute keccak256 of the given bytes.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut output = [0u8; 32];
    output.copy_from_slice(&Keccak256::digest(data));
    output
}
