// crates/trustchain-daemon/src/sync_loop.rs
//
// Background loops: periodic peer chain sync and the optional timed seal.

use std::sync::Arc;
use std::time::Duration;

use trustchain_consensus::FlushOutcome;
use trustchain_sync::{sync_round, PeerOutcome, SyncReport};

use crate::peers::PeerRegistry;
use crate::shared::LedgerHandle;

/// Run a sync round every `interval_secs`, forever.
pub async fn run_sync_loop(
    registry: Arc<PeerRegistry>,
    ledger: LedgerHandle,
    interval_secs: u64,
    rebuild_on_adopt: bool,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    // The first tick fires immediately; startup already ran a round.
    interval.tick().await;

    loop {
        interval.tick().await;
        sync_once(&registry, &ledger, rebuild_on_adopt).await;
    }
}

/// One round against every known peer, updating peer liveness.
pub async fn sync_once(registry: &PeerRegistry, ledger: &LedgerHandle, rebuild_on_adopt: bool) -> SyncReport {
    let sources = registry.chain_sources().await;
    if sources.is_empty() {
        return SyncReport::default();
    }

    let report = sync_round(ledger.engine(), &sources).await;

    for outcome in &report.outcomes {
        match outcome {
            PeerOutcome::Unreachable { peer, .. } => registry.mark_peer(peer, false).await,
            PeerOutcome::Adopted { peer, .. } | PeerOutcome::Rejected { peer, .. } => {
                registry.mark_peer(peer, true).await
            }
        }
    }

    if report.adopted() > 0 && rebuild_on_adopt {
        if let Err(e) = ledger.rebuild_state().await {
            tracing::warn!("State rebuild after chain adoption failed: {}", e);
        }
    }

    match serde_json::to_string(&report) {
        Ok(json) => tracing::debug!(report = %json, "Sync round finished"),
        Err(e) => tracing::debug!("Sync report not serializable: {}", e),
    }
    report
}

/// Seal the pending batch every `interval_secs`, whatever its size.
pub async fn run_seal_loop(ledger: LedgerHandle, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    interval.tick().await;

    loop {
        interval.tick().await;
        match ledger.flush().await {
            Ok(FlushOutcome::Sealed { height, .. }) => {
                tracing::info!(height, "Timed seal produced a block")
            }
            Ok(FlushOutcome::SealDeferred { pending, reason }) => {
                tracing::warn!(pending, "Timed seal deferred: {}", reason)
            }
            Ok(FlushOutcome::Queued { .. }) => {}
            Err(e) => tracing::warn!("Timed seal failed: {}", e),
        }
    }
}
