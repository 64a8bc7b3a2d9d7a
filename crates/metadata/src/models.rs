//! Database row models.
//!
//! Rows are plain `sqlx::FromRow` structs; typed accessors convert the TEXT
//! columns into core domain enums.

use freight_core::{TransferId, TransferMode, TransferStatus};
use sqlx::FromRow;
use time::OffsetDateTime;

/// A transfer record.
#[derive(Clone, Debug, FromRow)]
pub struct TransferRow {
    /// Shareable transfer identifier.
    pub transfer_id: String,
    /// Display filename.
    pub filename: String,
    /// `archive` or `multifile`.
    pub mode: String,
    /// Stored lifecycle status (`pending`, `uploading`, `ready`).
    pub status: String,
    /// Declared total size in bytes.
    pub total_size: i64,
    /// Bytes received so far.
    pub uploaded_size: i64,
    /// Declared chunk count (0 for multi-file transfers).
    pub chunks_total: i64,
    /// Distinct chunk indices received so far.
    pub chunks_completed: i64,
    /// Times the transfer has been downloaded.
    pub download_count: i64,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl TransferRow {
    /// Typed transfer id.
    pub fn id(&self) -> freight_core::Result<TransferId> {
        TransferId::parse(&self.transfer_id)
    }

    /// Typed lifecycle status.
    pub fn status(&self) -> freight_core::Result<TransferStatus> {
        TransferStatus::parse(&self.status)
    }

    /// Typed transfer mode.
    pub fn mode(&self) -> freight_core::Result<TransferMode> {
        TransferMode::parse(&self.mode)
    }

    /// Whether the retention window has passed.
    pub fn is_expired(&self) -> bool {
        freight_core::transfer::is_expired(self.expires_at)
    }
}

/// One individually uploaded file belonging to a multi-file transfer.
#[derive(Clone, Debug, FromRow)]
pub struct TransferFileRow {
    /// Opaque file identifier.
    pub file_id: String,
    /// Owning transfer.
    pub transfer_id: String,
    /// Name the file is stored under in the landing area.
    pub stored_name: String,
    /// Original display name.
    pub original_name: String,
    /// Size in bytes.
    pub size: i64,
    /// Detected content type.
    pub content_type: String,
    pub created_at: OffsetDateTime,
}

/// Receipt record for one chunk index.
#[derive(Clone, Debug, FromRow)]
pub struct TransferChunkRow {
    pub transfer_id: String,
    pub chunk_index: i64,
    pub size_bytes: i64,
    pub received_at: OffsetDateTime,
}

/// The singleton usage-statistics row.
#[derive(Clone, Debug, FromRow)]
pub struct UsageStatsRow {
    pub id: i64,
    /// Cumulative successfully finalized transfers.
    pub total_transfers: i64,
    /// Cumulative bytes across finalized transfers.
    pub total_bytes: i64,
    pub updated_at: OffsetDateTime,
}
