// crates/trustchain-sync/src/lib.rs
//
// trustchain-sync: Peer chain synchronization for the Trustchain ledger.
//
// Peers are reached through the `ChainSource` seam. A sync round fetches
// each peer's full block list outside the engine lock, then offers it to
// the engine's longest-valid-chain rule. Unreachable peers and rejected
// chains are logged and skipped; nothing is retried within a round.

pub mod reconcile;
pub mod source;

pub use reconcile::{sync_round, PeerOutcome, SyncReport};
pub use source::StaticChainSource;
