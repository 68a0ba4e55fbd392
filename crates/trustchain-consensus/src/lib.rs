// crates/trustchain-consensus/src/lib.rs
//
// trustchain-consensus: Proof-of-work, chain management, batching, and the
// ledger engine for Trustchain.
//
// The engine owns the ledger state, the chain, and the mempool. Accepted
// submissions and raw records are queued; when the queue reaches capacity
// the engine recomputes all computed trust, mines a block over the batch
// and the current state roots, and appends it. Peer chains replace the
// local chain under the longest-valid-chain rule.

pub mod chain;
pub mod engine;
pub mod mempool;
pub mod pow;
pub mod replay;

pub use chain::Blockchain;
pub use engine::{FlushOutcome, LedgerEngine};
pub use mempool::Mempool;
pub use pow::{BlockTemplate, MiningControl, MiningJob, MiningStep};
pub use replay::{apply_record, replay_chain, replay_records};
