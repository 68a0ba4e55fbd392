// crates/trustchain-consensus/src/replay.rs
//
// Chain replay: rebuild ledger state from block records.
//
// Identity records write the identity registry, trust records write the
// graph, direct-trust store and roster (no re-authentication: the records
// were authenticated when first admitted), opaque records are skipped.
// Computed trust is recomputed at the end of every block, mirroring the
// recomputation the miner ran just before sealing it.

use tracing::debug;

use trustchain_core::{Block, LedgerParams, LedgerRecord, StateRoots, TrustchainError};
use trustchain_reputation::admission::check_trust_value;
use trustchain_reputation::{calculate_all_comp_trust, PropagationParams};
use trustchain_store::LedgerState;

/// Apply one parsed record to the ledger state.
pub fn apply_record(state: &mut LedgerState, record: &LedgerRecord) -> Result<(), TrustchainError> {
    match record {
        LedgerRecord::Register {
            public_key,
            address,
        }
        | LedgerRecord::Update {
            public_key,
            address,
        } => {
            let key = hex::decode(public_key)?;
            state.identity_mut().put(address, &key)
        }
        LedgerRecord::Revoke { address, .. } => state.identity_mut().delete(address),
        LedgerRecord::Trust {
            address_i,
            address_j,
            trust_value,
            ..
        } => {
            check_trust_value(*trust_value)?;
            state.record_direct_trust(address_i, address_j, *trust_value)
        }
        LedgerRecord::Opaque(_) => Ok(()),
    }
}

/// Rebuild state from every non-genesis block without checking roots.
pub fn replay_records(blocks: &[Block], params: &LedgerParams) -> Result<LedgerState, TrustchainError> {
    replay(blocks, params, false)
}

/// Rebuild state from a chain and require every block's embedded roots to
/// match the replayed state after that block.
pub fn replay_chain(blocks: &[Block], params: &LedgerParams) -> Result<LedgerState, TrustchainError> {
    replay(blocks, params, true)
}

fn replay(blocks: &[Block], params: &LedgerParams, verify_roots: bool) -> Result<LedgerState, TrustchainError> {
    let propagation = PropagationParams::from(params);
    let mut state = LedgerState::new();

    for (height, block) in blocks.iter().enumerate().skip(1) {
        for raw in &block.records {
            apply_record(&mut state, &LedgerRecord::parse(raw)).map_err(|e| {
                TrustchainError::ChainValidation {
                    height,
                    reason: format!("record {:?} cannot be applied: {}", raw, e),
                }
            })?;
        }
        calculate_all_comp_trust(&mut state, &propagation)?;

        if verify_roots {
            let replayed = state.roots();
            if replayed != block.roots {
                return Err(TrustchainError::ChainValidation {
                    height,
                    reason: root_mismatch(block, &replayed),
                });
            }
        }
    }

    debug!(
        blocks = blocks.len(),
        addresses = state.roster().len(),
        verify_roots,
        "Chain replayed"
    );
    Ok(state)
}

fn root_mismatch(block: &Block, replayed: &StateRoots) -> String {
    let mut stores = Vec::new();
    if block.roots.pki != replayed.pki {
        stores.push("pki");
    }
    if block.roots.direct_trust != replayed.direct_trust {
        stores.push("direct-trust");
    }
    if block.roots.comp_trust != replayed.comp_trust {
        stores.push("computed-trust");
    }
    format!("embedded roots differ from replay: {}", stores.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Blockchain;
    use crate::pow::MiningControl;

    const BITS: u32 = 4;

    fn params() -> LedgerParams {
        LedgerParams {
            difficulty_bits: BITS,
            ..LedgerParams::default()
        }
    }

    fn trust(i: &str, j: &str, v: f64) -> String {
        LedgerRecord::Trust {
            address_i: i.to_string(),
            address_j: j.to_string(),
            trust_value: v,
            timestamp: 1_700_000_000,
        }
        .to_string()
    }

    /// Build a chain the honest way: apply, recompute, commit roots.
    fn honest_chain(batches: &[Vec<String>]) -> Blockchain {
        let control = MiningControl::new();
        let mut chain = Blockchain::genesis(BITS, 1_700_000_000, &control).unwrap();
        let mut state = LedgerState::new();
        for (n, batch) in batches.iter().enumerate() {
            for raw in batch {
                apply_record(&mut state, &LedgerRecord::parse(raw)).unwrap();
            }
            calculate_all_comp_trust(&mut state, &PropagationParams::default()).unwrap();
            chain
                .append(batch.clone(), state.roots(), 1_700_000_001 + n as i64, &control)
                .unwrap();
        }
        chain
    }

    #[test]
    fn test_apply_identity_records() {
        let mut state = LedgerState::new();
        let register = LedgerRecord::parse("PKI:Register:PublicKey:04aabb:Address:0xaa");
        apply_record(&mut state, &register).unwrap();
        assert_eq!(state.identity().get("0xaa").unwrap(), Some(vec![0x04, 0xaa, 0xbb]));

        let update = LedgerRecord::parse("PKI:Update:PublicKey:04ccdd:Address:0xaa");
        apply_record(&mut state, &update).unwrap();
        assert_eq!(state.identity().get("0xaa").unwrap(), Some(vec![0x04, 0xcc, 0xdd]));

        let revoke = LedgerRecord::parse("PKI:Revoke:PublicKey:04ccdd:Address:0xaa");
        apply_record(&mut state, &revoke).unwrap();
        assert_eq!(state.identity().get("0xaa").unwrap(), None);
    }

    #[test]
    fn test_apply_rejects_bad_records() {
        let mut state = LedgerState::new();
        let bad_key = LedgerRecord::parse("PKI:Register:PublicKey:zz:Address:0xaa");
        assert!(apply_record(&mut state, &bad_key).is_err());

        let out_of_range = LedgerRecord::parse(&trust("a", "b", 2.0));
        assert!(matches!(
            apply_record(&mut state, &out_of_range),
            Err(TrustchainError::Validation(_))
        ));
        assert_eq!(state.roots(), StateRoots::zero());

        apply_record(&mut state, &LedgerRecord::parse("hello world")).unwrap();
        assert_eq!(state.roots(), StateRoots::zero());
    }

    #[test]
    fn test_honest_chain_replays_to_matching_roots() {
        let chain = honest_chain(&[
            vec![
                "PKI:Register:PublicKey:04aa:Address:A".to_string(),
                trust("A", "B", 0.5),
                trust("A", "C", 0.2),
            ],
            vec![trust("B", "C", 0.8), "note".to_string()],
        ]);

        let state = replay_chain(chain.blocks(), &params()).unwrap();
        assert_eq!(state.roots(), chain.tip().unwrap().roots);
        assert_eq!(state.comp_trust_value("A", "C").unwrap().unwrap(), "0.450000");
        assert_eq!(state.roster().addresses(), &["A", "B", "C"]);
    }

    #[test]
    fn test_forged_roots_fail_audit_but_not_plain_replay() {
        let control = MiningControl::new();
        let mut chain = Blockchain::genesis(BITS, 1_700_000_000, &control).unwrap();
        chain
            .append(vec![trust("A", "B", 0.5)], StateRoots::zero(), 1_700_000_001, &control)
            .unwrap();

        let err = replay_chain(chain.blocks(), &params()).unwrap_err();
        match err {
            TrustchainError::ChainValidation { height, reason } => {
                assert_eq!(height, 1);
                assert!(reason.contains("direct-trust"));
                assert!(!reason.contains("pki"));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let state = replay_records(chain.blocks(), &params()).unwrap();
        assert_eq!(state.graph().get_trust("A", "B"), Some(0.5));
    }

    #[test]
    fn test_genesis_only_chain_replays_to_zero_roots() {
        let chain = Blockchain::genesis(BITS, 1_700_000_000, &MiningControl::new()).unwrap();
        let state = replay_chain(chain.blocks(), &params()).unwrap();
        assert_eq!(state.roots(), StateRoots::zero());
    }
}
