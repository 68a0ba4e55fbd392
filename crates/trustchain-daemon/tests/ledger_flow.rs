// crates/trustchain-daemon/tests/ledger_flow.rs
//
// End-to-end ledger flow across two nodes.
//
// One engine registers identities, admits signed trust submissions and
// seals them into a block; a second engine, configured to replay peer
// chains, adopts that chain through a sync round and rebuilds its state
// from it.
//
// These tests use the public APIs of the underlying library crates directly
// (trustchain-consensus, trustchain-sync, trustchain-core) since the daemon
// is a binary crate with no lib.rs.

use std::sync::Arc;

use tokio::sync::RwLock;

use trustchain_consensus::{FlushOutcome, LedgerEngine};
use trustchain_core::crypto::Keypair;
use trustchain_core::{Block, ChainSource, LedgerParams, LedgerRecord, RootPolicy, TrustSubmission, TrustchainError};
use trustchain_sync::{sync_round, PeerOutcome, StaticChainSource};

const NOW: i64 = 1_700_000_000;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn params(capacity: usize, root_policy: RootPolicy) -> LedgerParams {
    LedgerParams {
        difficulty_bits: 4,
        mempool_capacity: capacity,
        root_policy,
        ..LedgerParams::default()
    }
}

fn register(engine: &mut LedgerEngine, keypair: &Keypair) -> FlushOutcome {
    engine
        .apply_identity_record(LedgerRecord::Register {
            public_key: hex::encode(keypair.public_key_bytes()),
            address: keypair.address(),
        })
        .unwrap()
}

fn trust(engine: &mut LedgerEngine, from: &Keypair, to: &str, value: f64) -> FlushOutcome {
    let submission = TrustSubmission::signed(from, to, value, NOW).unwrap();
    engine.submit_trust_at(&submission, NOW + 5).unwrap()
}

struct Network {
    a: Keypair,
    b: Keypair,
    c: Keypair,
    origin: LedgerEngine,
}

/// A -> B 0.5, A -> C 0.2, B -> C 0.8, all sealed in one block.
fn sealed_network() -> Network {
    let a = Keypair::generate();
    let b = Keypair::generate();
    let c = Keypair::generate();
    let mut origin = LedgerEngine::new(params(5, RootPolicy::Trusted)).unwrap();

    register(&mut origin, &a);
    register(&mut origin, &b);
    trust(&mut origin, &a, &b.address(), 0.5);
    trust(&mut origin, &a, &c.address(), 0.2);
    let outcome = trust(&mut origin, &b, &c.address(), 0.8);
    assert!(matches!(outcome, FlushOutcome::Sealed { height: 1, .. }));

    Network { a, b, c, origin }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_sealed_block_commits_trust_and_identity() {
    let net = sealed_network();
    let tip = net.origin.chain().tip().unwrap();

    assert_eq!(tip.records.len(), 5);
    assert_eq!(tip.roots, net.origin.state().roots());
    assert_eq!(
        net.origin
            .query_comp(&net.a.address(), &net.c.address())
            .unwrap()
            .as_deref(),
        Some("0.450000")
    );
    assert_eq!(
        net.origin
            .query_direct(&net.b.address(), &net.c.address())
            .unwrap()
            .as_deref(),
        Some("0.8")
    );
    assert_eq!(
        net.origin.query_identity(&net.b.address()).unwrap(),
        Some(hex::encode(net.b.public_key_bytes()))
    );
}

#[test]
fn test_unregistered_truster_is_rejected() {
    let mut net = sealed_network();
    let submission = TrustSubmission::signed(&net.c, &net.a.address(), 0.9, NOW).unwrap();
    let err = net.origin.submit_trust_at(&submission, NOW).unwrap_err();
    assert!(matches!(err, TrustchainError::NotRegistered(_)));
    assert!(net.origin.mempool().is_empty());
}

#[tokio::test]
async fn test_replaying_node_adopts_and_rebuilds() {
    let net = sealed_network();
    let exported = net.origin.export_chain().unwrap();
    let blocks = Block::decode_chain(&exported).unwrap();

    let follower = Arc::new(RwLock::new(LedgerEngine::new(params(5, RootPolicy::Replay)).unwrap()));
    let sources: Vec<Arc<dyn ChainSource>> = vec![Arc::new(StaticChainSource::new("origin", blocks))];

    let report = sync_round(&follower, &sources).await;
    assert!(matches!(
        report.outcomes[0],
        PeerOutcome::Adopted {
            from_len: 1,
            to_len: 2,
            ..
        }
    ));

    let mut follower = match Arc::try_unwrap(follower) {
        Ok(lock) => lock.into_inner(),
        Err(_) => panic!("engine still shared after sync"),
    };
    // Adoption alone leaves the follower's own (empty) state in place.
    assert_eq!(follower.query_comp(&net.a.address(), &net.c.address()).unwrap(), None);

    follower.rebuild_state_from_chain().unwrap();
    assert_eq!(follower.state().roots(), net.origin.state().roots());
    assert_eq!(
        follower
            .query_comp(&net.a.address(), &net.c.address())
            .unwrap()
            .as_deref(),
        Some("0.450000")
    );
    assert_eq!(
        follower.query_identity(&net.a.address()).unwrap(),
        Some(hex::encode(net.a.public_key_bytes()))
    );
}

#[tokio::test]
async fn test_replaying_node_rejects_tampered_roots() {
    let net = sealed_network();
    let mut blocks = net.origin.blocks().to_vec();
    // Roots are not part of the block hash, so PoW still verifies.
    blocks[1].roots.comp_trust = [7u8; 32];

    let follower = Arc::new(RwLock::new(LedgerEngine::new(params(5, RootPolicy::Replay)).unwrap()));
    let sources: Vec<Arc<dyn ChainSource>> = vec![Arc::new(StaticChainSource::new("origin", blocks.clone()))];

    let report = sync_round(&follower, &sources).await;
    match &report.outcomes[0] {
        PeerOutcome::Rejected { reason, .. } => assert!(reason.contains("computed-trust")),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(follower.read().await.blocks().len(), 1);

    // A node that trusts embedded roots takes the same chain.
    let trusting = Arc::new(RwLock::new(LedgerEngine::new(params(5, RootPolicy::Trusted)).unwrap()));
    let sources: Vec<Arc<dyn ChainSource>> = vec![Arc::new(StaticChainSource::new("origin", blocks))];
    assert_eq!(sync_round(&trusting, &sources).await.adopted(), 1);
}
