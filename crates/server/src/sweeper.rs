//! Retention sweeper.
//!
//! Purges transfers whose retention window has passed and removes orphaned
//! chunk scratch areas left behind by crashed or abandoned uploads. Runs
//! once at startup and then on a fixed interval.

use std::collections::HashSet;

use time::OffsetDateTime;

use freight_core::TransferId;
use freight_metadata::repos::TransferRepo;
use freight_storage::{keys, ObjectStore};

use crate::handlers::purge_transfer_objects;
use crate::state::AppState;

/// Counters for one sweep run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Expired transfers purged.
    pub expired_purged: u64,
    /// Orphaned chunk scratch prefixes removed.
    pub orphans_removed: u64,
    /// Transfers or prefixes that failed to purge.
    pub errors: u64,
}

/// Run one retention sweep. A single transfer's failure is logged and the
/// sweep continues.
pub async fn run_sweep(state: &AppState) -> SweepStats {
    let mut stats = SweepStats::default();

    let now = OffsetDateTime::now_utc();
    match state.metadata.list_expired(now).await {
        Ok(expired) => {
            for transfer in expired {
                match purge_expired(state, &transfer.transfer_id).await {
                    Ok(()) => stats.expired_purged += 1,
                    Err(e) => {
                        stats.errors += 1;
                        tracing::warn!(
                            transfer_id = %transfer.transfer_id,
                            error = %e,
                            "Failed to purge expired transfer"
                        );
                    }
                }
            }
        }
        Err(e) => {
            stats.errors += 1;
            tracing::error!(error = %e, "Failed to list expired transfers");
        }
    }

    sweep_orphan_chunks(state, &mut stats).await;

    tracing::info!(
        expired_purged = stats.expired_purged,
        orphans_removed = stats.orphans_removed,
        errors = stats.errors,
        "Retention sweep finished"
    );
    stats
}

async fn purge_expired(state: &AppState, transfer_id: &str) -> crate::error::ApiResult<()> {
    let id = TransferId::parse(transfer_id)?;
    purge_transfer_objects(state, &id).await;
    state.metadata.delete_transfer(transfer_id).await?;
    Ok(())
}

/// Remove chunk scratch prefixes whose transfer id has neither a live
/// record nor an artifact. Covers uploads that died before finalize and
/// records lost to a partial delete.
async fn sweep_orphan_chunks(state: &AppState, stats: &mut SweepStats) {
    let chunk_keys = match state.storage.list(keys::CHUNKS_ROOT).await {
        Ok(keys) => keys,
        Err(e) => {
            stats.errors += 1;
            tracing::error!(error = %e, "Failed to list chunk scratch areas");
            return;
        }
    };

    let mut seen: HashSet<String> = HashSet::new();
    for key in &chunk_keys {
        if let Some(transfer_id) = keys::transfer_id_of_chunk_key(key) {
            seen.insert(transfer_id.to_string());
        }
    }

    for transfer_id in seen {
        let id = match TransferId::parse(&transfer_id) {
            Ok(id) => id,
            // Unparseable directory names are junk; remove them too.
            Err(_) => {
                let prefix = format!("{}/{}", keys::CHUNKS_ROOT, transfer_id);
                if state.storage.delete_prefix(&prefix).await.is_ok() {
                    stats.orphans_removed += 1;
                } else {
                    stats.errors += 1;
                }
                continue;
            }
        };

        let has_record = match state.metadata.get_transfer(id.as_str()).await {
            Ok(row) => row.is_some(),
            Err(e) => {
                stats.errors += 1;
                tracing::warn!(transfer_id = %id, error = %e, "Orphan check failed");
                continue;
            }
        };
        if has_record {
            continue;
        }

        let has_artifact = match state.storage.exists(&keys::artifact_key(&id)).await {
            Ok(exists) => exists,
            Err(e) => {
                stats.errors += 1;
                tracing::warn!(transfer_id = %id, error = %e, "Orphan check failed");
                continue;
            }
        };
        if has_artifact {
            continue;
        }

        match state.storage.delete_prefix(&keys::chunk_prefix(&id)).await {
            Ok(()) => {
                stats.orphans_removed += 1;
                tracing::info!(transfer_id = %id, "Removed orphaned chunk scratch area");
            }
            Err(e) => {
                stats.errors += 1;
                tracing::warn!(transfer_id = %id, error = %e, "Failed to remove orphan");
            }
        }
    }
}
