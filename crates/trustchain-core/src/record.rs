// crates/trustchain-core/src/record.rs
//
// Ledger record strings carried in block batches.
//
// Formats:
//   PKI:Register:PublicKey:{hex}:Address:{address}
//   PKI:Update:PublicKey:{hex}:Address:{address}
//   PKI:Revoke:PublicKey:{hex}:Address:{address}
//   TRUST:Submit:AddressI:{i}:AddressJ:{j}:Value:{v}:Timestamp:{t}
// Anything else is an opaque record and is carried verbatim. Structured
// fields must not contain the `:` field separator, or the record would not
// parse back to itself.

use std::fmt;

use crate::block::RECORD_SEPARATOR;
use crate::error::TrustchainError;

/// Separator between the fields of a structured record.
pub const FIELD_SEPARATOR: char = ':';

/// A parsed ledger record.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerRecord {
    /// An identity was registered.
    Register { public_key: String, address: String },
    /// An identity's public key was rotated.
    Update { public_key: String, address: String },
    /// An identity was revoked.
    Revoke { public_key: String, address: String },
    /// A direct-trust submission was accepted.
    Trust {
        address_i: String,
        address_j: String,
        trust_value: f64,
        timestamp: i64,
    },
    /// Free-form record with no ledger-state meaning.
    Opaque(String),
}

impl LedgerRecord {
    /// Parse a record string. Unrecognized shapes become `Opaque`.
    pub fn parse(raw: &str) -> Self {
        let parts: Vec<&str> = raw.split(':').collect();
        match parts.as_slice() {
            ["PKI", action, "PublicKey", key, "Address", address] => {
                let public_key = key.to_string();
                let address = address.to_string();
                match *action {
                    "Register" => LedgerRecord::Register { public_key, address },
                    "Update" => LedgerRecord::Update { public_key, address },
                    "Revoke" => LedgerRecord::Revoke { public_key, address },
                    _ => LedgerRecord::Opaque(raw.to_string()),
                }
            }
            ["TRUST", "Submit", "AddressI", i, "AddressJ", j, "Value", v, "Timestamp", t] => {
                match (v.parse::<f64>(), t.parse::<i64>()) {
                    (Ok(trust_value), Ok(timestamp)) => LedgerRecord::Trust {
                        address_i: i.to_string(),
                        address_j: j.to_string(),
                        trust_value,
                        timestamp,
                    },
                    _ => LedgerRecord::Opaque(raw.to_string()),
                }
            }
            _ => LedgerRecord::Opaque(raw.to_string()),
        }
    }

    /// Check that every structured field survives a display/parse cycle.
    pub fn check_fields(&self) -> Result<(), TrustchainError> {
        let fields: Vec<(&str, &str)> = match self {
            LedgerRecord::Register { public_key, address }
            | LedgerRecord::Update { public_key, address }
            | LedgerRecord::Revoke { public_key, address } => {
                vec![("public key", public_key.as_str()), ("address", address.as_str())]
            }
            LedgerRecord::Trust {
                address_i,
                address_j,
                ..
            } => vec![
                ("truster address", address_i.as_str()),
                ("trustee address", address_j.as_str()),
            ],
            LedgerRecord::Opaque(_) => Vec::new(),
        };
        for (name, value) in fields {
            if value.is_empty() || value.contains(FIELD_SEPARATOR) {
                return Err(TrustchainError::Validation(format!(
                    "{} {:?} must be non-empty and free of '{}'",
                    name, value, FIELD_SEPARATOR
                )));
            }
        }
        Ok(())
    }

    /// Check that a raw record can be carried in a block batch.
    pub fn check_raw(raw: &str) -> Result<(), TrustchainError> {
        if raw.is_empty() {
            return Err(TrustchainError::Validation("record must not be empty".to_string()));
        }
        if raw.contains(RECORD_SEPARATOR) {
            return Err(TrustchainError::Validation(format!(
                "record must not contain '{}'",
                RECORD_SEPARATOR
            )));
        }
        Ok(())
    }
}

impl fmt::Display for LedgerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerRecord::Register { public_key, address } => {
                write!(f, "PKI:Register:PublicKey:{}:Address:{}", public_key, address)
            }
            LedgerRecord::Update { public_key, address } => {
                write!(f, "PKI:Update:PublicKey:{}:Address:{}", public_key, address)
            }
            LedgerRecord::Revoke { public_key, address } => {
                write!(f, "PKI:Revoke:PublicKey:{}:Address:{}", public_key, address)
            }
            LedgerRecord::Trust {
                address_i,
                address_j,
                trust_value,
                timestamp,
            } => write!(
                f,
                "TRUST:Submit:AddressI:{}:AddressJ:{}:Value:{}:Timestamp:{}",
                address_i, address_j, trust_value, timestamp
            ),
            LedgerRecord::Opaque(raw) => f.write_str(raw),
        }
    }
}
