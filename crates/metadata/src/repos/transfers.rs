//! Transfer record repository.

use crate::error::MetadataResult;
use crate::models::TransferRow;
use async_trait::async_trait;
use time::OffsetDateTime;

/// Outcome of recording a chunk arrival.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkReceipt {
    /// Distinct chunk indices received after this arrival.
    pub chunks_completed: i64,
    /// False when the index had already been received (duplicate delivery);
    /// duplicates update no counters.
    pub newly_recorded: bool,
}

/// Repository for transfer lifecycle operations.
#[async_trait]
pub trait TransferRepo: Send + Sync {
    /// Create a new transfer record.
    async fn create_transfer(&self, transfer: &TransferRow) -> MetadataResult<()>;

    /// Get a transfer by ID.
    async fn get_transfer(&self, transfer_id: &str) -> MetadataResult<Option<TransferRow>>;

    /// Record one chunk arrival.
    ///
    /// The first delivery of an index atomically increments `chunks_completed`
    /// by 1 and `uploaded_size` by `size_bytes`, and promotes a `pending`
    /// transfer to `uploading`. Re-delivery of an already-received index is a
    /// no-op on all counters. All of this happens in a single transaction so
    /// parallel chunk uploads never lose increments.
    async fn record_chunk(
        &self,
        transfer_id: &str,
        chunk_index: i64,
        size_bytes: i64,
        received_at: OffsetDateTime,
    ) -> MetadataResult<ChunkReceipt>;

    /// Received chunk indices in ascending order.
    async fn get_received_chunk_indices(&self, transfer_id: &str) -> MetadataResult<Vec<i64>>;

    /// Add bytes for an individually uploaded file and promote `pending`
    /// to `uploading`. Chunk counters are untouched.
    async fn add_file_bytes(&self, transfer_id: &str, size_bytes: i64) -> MetadataResult<()>;

    /// Transition a transfer to `ready`.
    ///
    /// Returns `true` if this call performed the transition, `false` if the
    /// transfer was already `ready` (finalization must only take effect once).
    async fn mark_ready(&self, transfer_id: &str) -> MetadataResult<bool>;

    /// Atomically increment the download counter.
    async fn increment_download_count(&self, transfer_id: &str) -> MetadataResult<()>;

    /// Transfers whose retention window has passed as of `now`.
    async fn list_expired(&self, now: OffsetDateTime) -> MetadataResult<Vec<TransferRow>>;

    /// Delete a transfer and its chunk/file rows (cascade).
    ///
    /// Fails with `NotFound` if the id does not exist; a repeated delete has
    /// no side effect.
    async fn delete_transfer(&self, transfer_id: &str) -> MetadataResult<()>;

    /// Count transfers still receiving data (`pending` or `uploading`).
    async fn count_active_transfers(&self) -> MetadataResult<i64>;
}
