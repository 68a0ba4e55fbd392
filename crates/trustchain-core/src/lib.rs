// crates/trustchain-core/src/lib.rs
//
// trustchain-core: Core types, traits, and crypto primitives for the Trustchain ledger.
//
// This is the leaf crate that all other crates in the workspace depend on.
// It defines the block and record encodings, the error taxonomy, ledger
// parameters, hashing/signature helpers, and the trait seams behind which
// the state stores and peer transports live.

pub mod block;
pub mod crypto;
pub mod error;
pub mod params;
pub mod record;
pub mod submission;
pub mod traits;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use trustchain_core::Block;`

// Block types
pub use block::{Block, Digest, StateRoots, ZERO_DIGEST};

// Record and submission types
pub use record::LedgerRecord;
pub use submission::TrustSubmission;

// Parameters
pub use params::{LedgerParams, PathCountMode, RootPolicy};

// Error type
pub use error::TrustchainError;

// Traits
pub use traits::{ChainSource, CommitmentMap, IdentityRegistry};
