// crates/trustchain-sync/src/reconcile.rs
//
// One synchronization round against a list of peers.
//
// Peers are tried in order. A fetched chain that is not longer than the
// local one is dropped after a read-locked length check, so the write lock
// is only taken for candidates that could win. Validation (and, under the
// replay root policy, a full chain replay) runs on a blocking thread that
// owns the write guard.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use trustchain_consensus::LedgerEngine;
use trustchain_core::{Block, ChainSource, TrustchainError};

/// What happened with one peer during a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PeerOutcome {
    /// The peer's chain replaced the local chain.
    Adopted {
        peer: String,
        from_len: usize,
        to_len: usize,
    },
    /// The peer answered but its chain was not adopted.
    Rejected { peer: String, reason: String },
    /// The peer could not be reached or its answer could not be decoded.
    Unreachable { peer: String, reason: String },
}

/// Per-peer outcomes of a round, in the order peers were tried.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub outcomes: Vec<PeerOutcome>,
}

impl SyncReport {
    /// Number of peers whose chain was adopted.
    pub fn adopted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, PeerOutcome::Adopted { .. }))
            .count()
    }
}

/// Offer every peer's chain to the engine once.
pub async fn sync_round(engine: &Arc<RwLock<LedgerEngine>>, sources: &[Arc<dyn ChainSource>]) -> SyncReport {
    let mut report = SyncReport::default();

    for source in sources {
        let peer = source.name().to_string();

        let blocks = match source.fetch_blocks().await {
            Ok(blocks) => blocks,
            Err(e) => {
                warn!(peer = %peer, error = %e, "Peer unreachable, skipping");
                report.outcomes.push(PeerOutcome::Unreachable {
                    peer,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let local_len = engine.read().await.chain().len();
        if blocks.len() <= local_len {
            debug!(
                peer = %peer,
                remote = blocks.len(),
                local = local_len,
                "Peer chain not longer than local"
            );
            report.outcomes.push(PeerOutcome::Rejected {
                peer,
                reason: format!(
                    "candidate length {} is not longer than local length {}",
                    blocks.len(),
                    local_len
                ),
            });
            continue;
        }

        let to_len = blocks.len();
        match adopt(engine, blocks).await {
            Ok(from_len) => {
                info!(peer = %peer, from_len, to_len, "Adopted peer chain");
                report.outcomes.push(PeerOutcome::Adopted {
                    peer,
                    from_len,
                    to_len,
                });
            }
            Err(e) => {
                warn!(peer = %peer, error = %e, "Peer chain rejected");
                report.outcomes.push(PeerOutcome::Rejected {
                    peer,
                    reason: e.to_string(),
                });
            }
        }
    }

    report
}

/// Offer `blocks` to the engine off the async workers.
///
/// Returns the local length before adoption.
async fn adopt(engine: &Arc<RwLock<LedgerEngine>>, blocks: Vec<Block>) -> Result<usize, TrustchainError> {
    let mut guard = Arc::clone(engine).write_owned().await;
    tokio::task::spawn_blocking(move || {
        let from_len = guard.chain().len();
        guard.replace_chain(blocks).map(|()| from_len)
    })
    .await
    .map_err(|e| TrustchainError::SyncRejected(format!("adoption task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use trustchain_core::LedgerParams;

    use crate::source::StaticChainSource;

    struct DownPeer;

    #[async_trait]
    impl ChainSource for DownPeer {
        fn name(&self) -> &str {
            "down"
        }

        async fn fetch_blocks(&self) -> Result<Vec<Block>, TrustchainError> {
            Err(TrustchainError::Network("connection refused".to_string()))
        }
    }

    fn engine_with_blocks(extra: usize) -> LedgerEngine {
        let mut engine = LedgerEngine::new(LedgerParams {
            difficulty_bits: 4,
            mempool_capacity: 1,
            ..LedgerParams::default()
        })
        .unwrap();
        for n in 0..extra {
            engine.submit_record(format!("r{}", n)).unwrap();
        }
        engine
    }

    #[tokio::test]
    async fn test_adopts_longer_chain() {
        let local = Arc::new(RwLock::new(engine_with_blocks(0)));
        let remote = engine_with_blocks(2);
        let sources: Vec<Arc<dyn ChainSource>> = vec![Arc::new(StaticChainSource::new(
            "remote",
            remote.blocks().to_vec(),
        ))];

        let report = sync_round(&local, &sources).await;
        assert_eq!(report.adopted(), 1);
        assert_eq!(
            report.outcomes[0],
            PeerOutcome::Adopted {
                peer: "remote".to_string(),
                from_len: 1,
                to_len: 3
            }
        );
        assert_eq!(local.read().await.blocks(), remote.blocks());
    }

    #[tokio::test]
    async fn test_skips_unreachable_and_short_peers() {
        let local = Arc::new(RwLock::new(engine_with_blocks(2)));
        let before = local.read().await.blocks().to_vec();
        let short = engine_with_blocks(1);
        let sources: Vec<Arc<dyn ChainSource>> = vec![
            Arc::new(DownPeer),
            Arc::new(StaticChainSource::new("short", short.blocks().to_vec())),
        ];

        let report = sync_round(&local, &sources).await;
        assert_eq!(report.adopted(), 0);
        assert!(matches!(report.outcomes[0], PeerOutcome::Unreachable { .. }));
        assert!(matches!(report.outcomes[1], PeerOutcome::Rejected { .. }));
        assert_eq!(local.read().await.blocks(), before.as_slice());
    }

    #[tokio::test]
    async fn test_rejects_invalid_longer_chain() {
        let local = Arc::new(RwLock::new(engine_with_blocks(0)));
        let mut forged = engine_with_blocks(3).blocks().to_vec();
        forged[2].records.push("smuggled".to_string());
        let sources: Vec<Arc<dyn ChainSource>> =
            vec![Arc::new(StaticChainSource::new("forger", forged))];

        let report = sync_round(&local, &sources).await;
        match &report.outcomes[0] {
            PeerOutcome::Rejected { peer, reason } => {
                assert_eq!(peer, "forger");
                assert!(reason.contains("height 2"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(local.read().await.blocks().len(), 1);
    }

    #[tokio::test]
    async fn test_later_peer_must_beat_adopted_chain() {
        let local = Arc::new(RwLock::new(engine_with_blocks(0)));
        let long = engine_with_blocks(3);
        let longer = engine_with_blocks(4);
        let source = Arc::new(StaticChainSource::new("a", long.blocks().to_vec()));
        let shared: Arc<dyn ChainSource> = source.clone();
        let sources: Vec<Arc<dyn ChainSource>> = vec![
            shared,
            Arc::new(StaticChainSource::new("b", long.blocks().to_vec())),
        ];

        let report = sync_round(&local, &sources).await;
        assert_eq!(report.adopted(), 1);
        assert!(matches!(report.outcomes[1], PeerOutcome::Rejected { .. }));

        source.set_blocks(longer.blocks().to_vec()).await;
        let report = sync_round(&local, &sources).await;
        assert_eq!(report.adopted(), 1);
        assert_eq!(local.read().await.blocks().len(), 5);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_adoption_leaves_runtime_free() {
        use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

        let local = Arc::new(RwLock::new(
            LedgerEngine::new(LedgerParams {
                difficulty_bits: 4,
                mempool_capacity: 1,
                root_policy: trustchain_core::RootPolicy::Replay,
                ..LedgerParams::default()
            })
            .unwrap(),
        ));
        let remote = engine_with_blocks(3);
        let sources: Vec<Arc<dyn ChainSource>> = vec![Arc::new(StaticChainSource::new(
            "remote",
            remote.blocks().to_vec(),
        ))];

        let beats = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicBool::new(false));
        let heartbeat = {
            let (beats, done) = (Arc::clone(&beats), Arc::clone(&done));
            tokio::spawn(async move {
                while !done.load(Ordering::SeqCst) {
                    beats.fetch_add(1, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                }
            })
        };

        let report = sync_round(&local, &sources).await;
        let observed = beats.load(Ordering::SeqCst);
        done.store(true, Ordering::SeqCst);
        heartbeat.await.unwrap();

        assert_eq!(report.adopted(), 1);
        // The single runtime thread kept running other tasks while the
        // candidate was validated and replayed.
        assert!(observed > 0);
        assert_eq!(local.read().await.blocks(), remote.blocks());
    }
}
