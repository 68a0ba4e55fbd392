// crates/trustchain-core/src/submission.rs
//
// Direct-trust submissions: the signed assertion "I trusts J with value v".

use serde::{Deserialize, Serialize};

use crate::crypto::Keypair;
use crate::error::TrustchainError;
use crate::record::LedgerRecord;

/// A signed direct-trust submission as received from a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustSubmission {
    /// Truster address (must match the signature).
    #[serde(rename = "addressI")]
    pub address_i: String,
    /// Trustee address.
    #[serde(rename = "addressJ")]
    pub address_j: String,
    /// Asserted trust in [-1, 1].
    #[serde(rename = "trustValue")]
    pub trust_value: f64,
    /// Unix timestamp (seconds) chosen by the signer.
    pub timestamp: i64,
    /// Base64 of the 65-byte recoverable signature.
    pub signature: String,
}

impl TrustSubmission {
    /// Build the canonical message that the truster signs:
    /// `"submit" + i + "." + j + "." + value(6 decimals) + "." + timestamp`.
    pub fn signing_message(address_i: &str, address_j: &str, trust_value: f64, timestamp: i64) -> String {
        format!(
            "submit{}.{}.{:.6}.{}",
            address_i, address_j, trust_value, timestamp
        )
    }

    /// The canonical message for this submission's own fields.
    pub fn message(&self) -> String {
        Self::signing_message(&self.address_i, &self.address_j, self.trust_value, self.timestamp)
    }

    /// Create a submission signed by `keypair`, with `address_i` set to the
    /// keypair's address.
    pub fn signed(
        keypair: &Keypair,
        address_j: &str,
        trust_value: f64,
        timestamp: i64,
    ) -> Result<Self, TrustchainError> {
        let address_i = keypair.address();
        let message = Self::signing_message(&address_i, address_j, trust_value, timestamp);
        let signature = keypair.sign_base64(message.as_bytes())?;
        Ok(Self {
            address_i,
            address_j: address_j.to_string(),
            trust_value,
            timestamp,
            signature,
        })
    }

    /// The ledger record emitted once this submission is accepted.
    pub fn to_record(&self) -> LedgerRecord {
        LedgerRecord::Trust {
            address_i: self.address_i.clone(),
            address_j: self.address_j.clone(),
            trust_value: self.trust_value,
            timestamp: self.timestamp,
        }
    }
}
