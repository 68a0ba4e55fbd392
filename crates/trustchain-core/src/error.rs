use thiserror::Error;

/// Ledger-wide error types for Trustchain.
///
/// Every rejection is local and synchronous: nothing in the engine retries
/// on the caller's behalf.
#[derive(Debug, Error)]
pub enum TrustchainError {
    /// A submitted value is outside its domain (e.g. trust not in [-1, 1]).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Submission timestamp is outside the accepted window around local time.
    #[error("Timestamp error: timestamp {timestamp} is more than {window_secs}s from local time {now}")]
    Timestamp {
        timestamp: i64,
        now: i64,
        window_secs: i64,
    },

    /// Signature does not recover to the claimed address.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Truster address is absent from the identity registry.
    #[error("Address {0} is not registered")]
    NotRegistered(String),

    /// Hash or linkage mismatch while validating a chain.
    #[error("Chain validation error at height {height}: {reason}")]
    ChainValidation { height: usize, reason: String },

    /// A peer chain was not adopted (not strictly longer, or invalid).
    #[error("Sync rejected: {0}")]
    SyncRejected(String),

    /// Mining was stopped through its cancellation flag.
    #[error("Mining cancelled")]
    MiningCancelled,

    /// Mining hit its wall-clock deadline.
    #[error("Mining timed out")]
    MiningTimedOut,

    /// Every nonce was tried without meeting the target.
    #[error("Nonce space exhausted for block template at timestamp {0}")]
    NonceSpaceExhausted(i64),

    /// Commitment store error (only reachable with disk-backed stores).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Cryptographic error (malformed key or signature bytes).
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Peer transport error.
    #[error("Network error: {0}")]
    Network(String),
}

impl From<serde_json::Error> for TrustchainError {
    fn from(e: serde_json::Error) -> Self {
        TrustchainError::Serialization(e.to_string())
    }
}

impl From<hex::FromHexError> for TrustchainError {
    fn from(e: hex::FromHexError) -> Self {
        TrustchainError::Serialization(format!("invalid hex: {}", e))
    }
}

impl From<base64::DecodeError> for TrustchainError {
    fn from(e: base64::DecodeError) -> Self {
        TrustchainError::Authentication(format!("invalid signature encoding: {}", e))
    }
}

impl From<k256::ecdsa::Error> for TrustchainError {
    fn from(e: k256::ecdsa::Error) -> Self {
        TrustchainError::Crypto(e.to_string())
    }
}
