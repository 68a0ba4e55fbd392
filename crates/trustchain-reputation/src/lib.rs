// crates/trustchain-reputation/src/lib.rs
//
// trustchain-reputation: Direct-trust admission and trust propagation
// for the Trustchain ledger.
//
// Admission authenticates signed direct-trust submissions and writes them
// into the ledger state. Propagation blends each direct assertion with the
// transitive evidence of the truster's positive-trust neighbors, either on
// demand for one pair or in bulk for every roster pair before a batch is
// sealed into a block.

pub mod admission;
pub mod propagation;

pub use admission::admit_submission;
pub use propagation::{calculate_all_comp_trust, comp_trust, PropagationParams};
