//! Transfer file repository (multi-file mode).

use crate::error::MetadataResult;
use crate::models::TransferFileRow;
use async_trait::async_trait;

/// Repository for per-file records of multi-file transfers.
#[async_trait]
pub trait TransferFileRepo: Send + Sync {
    /// Record an individually uploaded file.
    async fn add_file(&self, file: &TransferFileRow) -> MetadataResult<()>;

    /// List a transfer's files, oldest first.
    async fn list_files(&self, transfer_id: &str) -> MetadataResult<Vec<TransferFileRow>>;

    /// Get one file by id, scoped to its transfer.
    async fn get_file(
        &self,
        transfer_id: &str,
        file_id: &str,
    ) -> MetadataResult<Option<TransferFileRow>>;
}
