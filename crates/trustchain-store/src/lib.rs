// crates/trustchain-store/src/lib.rs
//
// trustchain-store: State storage for the Trustchain ledger.
//
// Provides the Merkle-ized commitment map backing the identity,
// direct-trust, and computed-trust stores, an in-memory identity registry,
// the trust adjacency graph, the insertion-ordered address roster, and
// `LedgerState`, which bundles all of them into one explicitly owned value.

pub mod graph;
pub mod identity;
pub mod ledger;
pub mod merkle;
pub mod roster;

// Re-export key types for ergonomic access from downstream crates.
pub use graph::TrustGraph;
pub use identity::InMemoryIdentityRegistry;
pub use ledger::LedgerState;
pub use merkle::MerkleMap;
pub use roster::AddressRoster;
