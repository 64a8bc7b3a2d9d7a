//! Metadata store trait and SQLite implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::repos::{StatsRepo, TransferFileRepo, TransferRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use time::OffsetDateTime;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: TransferRepo + TransferFileRepo + StatsRepo + Send + Sync {
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Create a new SQLite store.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection
            // serializes counter updates and avoids "database is locked"
            // failures when chunks land in parallel.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;

        // Migrate transfers: add mode column if missing. Pre-mode databases
        // only ever held archive transfers. SQLite has no ADD COLUMN IF NOT
        // EXISTS, so check PRAGMA first.
        let columns: Vec<(i32, String, String, i32, Option<String>, i32)> =
            sqlx::query_as("PRAGMA table_info(transfers)")
                .fetch_all(&self.pool)
                .await?;

        let has_mode = columns.iter().any(|(_, name, _, _, _, _)| name == "mode");
        if !has_mode {
            sqlx::query("ALTER TABLE transfers ADD COLUMN mode TEXT NOT NULL DEFAULT 'archive'")
                .execute(&self.pool)
                .await?;
        }

        // Seed the singleton stats row with a bound timestamp so the column
        // decodes as OffsetDateTime.
        sqlx::query(
            "INSERT OR IGNORE INTO usage_stats (id, total_transfers, total_bytes, updated_at)
             VALUES (1, 0, 0, ?)",
        )
        .bind(OffsetDateTime::now_utc())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// Implement the repository traits for SqliteStore
mod sqlite_impl {
    use super::*;
    use crate::models::*;
    use crate::repos::ChunkReceipt;

    #[async_trait]
    impl TransferRepo for SqliteStore {
        async fn create_transfer(&self, transfer: &TransferRow) -> MetadataResult<()> {
            if self.get_transfer(&transfer.transfer_id).await?.is_some() {
                return Err(MetadataError::AlreadyExists(format!(
                    "transfer_id {} already exists",
                    transfer.transfer_id
                )));
            }

            sqlx::query(
                "INSERT INTO transfers (transfer_id, filename, mode, status, total_size, \
                 uploaded_size, chunks_total, chunks_completed, download_count, created_at, expires_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&transfer.transfer_id)
            .bind(&transfer.filename)
            .bind(&transfer.mode)
            .bind(&transfer.status)
            .bind(transfer.total_size)
            .bind(transfer.uploaded_size)
            .bind(transfer.chunks_total)
            .bind(transfer.chunks_completed)
            .bind(transfer.download_count)
            .bind(transfer.created_at)
            .bind(transfer.expires_at)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn get_transfer(&self, transfer_id: &str) -> MetadataResult<Option<TransferRow>> {
            let row =
                sqlx::query_as::<_, TransferRow>("SELECT * FROM transfers WHERE transfer_id = ?")
                    .bind(transfer_id)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(row)
        }

        async fn record_chunk(
            &self,
            transfer_id: &str,
            chunk_index: i64,
            size_bytes: i64,
            received_at: OffsetDateTime,
        ) -> MetadataResult<ChunkReceipt> {
            let mut tx = self.pool.begin().await?;

            // INSERT OR IGNORE makes duplicate delivery of an index a no-op;
            // the counter update below only runs for a first delivery.
            let inserted = sqlx::query(
                "INSERT OR IGNORE INTO transfer_chunks (transfer_id, chunk_index, size_bytes, received_at) \
                 VALUES (?, ?, ?, ?)",
            )
            .bind(transfer_id)
            .bind(chunk_index)
            .bind(size_bytes)
            .bind(received_at)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            let newly_recorded = inserted == 1;
            if newly_recorded {
                sqlx::query(
                    "UPDATE transfers SET \
                     chunks_completed = chunks_completed + 1, \
                     uploaded_size = uploaded_size + ?, \
                     status = CASE WHEN status = 'pending' THEN 'uploading' ELSE status END \
                     WHERE transfer_id = ?",
                )
                .bind(size_bytes)
                .bind(transfer_id)
                .execute(&mut *tx)
                .await?;
            }

            let chunks_completed: i64 =
                sqlx::query_scalar("SELECT chunks_completed FROM transfers WHERE transfer_id = ?")
                    .bind(transfer_id)
                    .fetch_one(&mut *tx)
                    .await?;

            tx.commit().await?;

            Ok(ChunkReceipt {
                chunks_completed,
                newly_recorded,
            })
        }

        async fn get_received_chunk_indices(&self, transfer_id: &str) -> MetadataResult<Vec<i64>> {
            let indices: Vec<i64> = sqlx::query_scalar(
                "SELECT chunk_index FROM transfer_chunks WHERE transfer_id = ? ORDER BY chunk_index",
            )
            .bind(transfer_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(indices)
        }

        async fn add_file_bytes(&self, transfer_id: &str, size_bytes: i64) -> MetadataResult<()> {
            let result = sqlx::query(
                "UPDATE transfers SET \
                 uploaded_size = uploaded_size + ?, \
                 status = CASE WHEN status = 'pending' THEN 'uploading' ELSE status END \
                 WHERE transfer_id = ?",
            )
            .bind(size_bytes)
            .bind(transfer_id)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(MetadataError::NotFound(format!(
                    "transfer_id {transfer_id} not found"
                )));
            }
            Ok(())
        }

        async fn mark_ready(&self, transfer_id: &str) -> MetadataResult<bool> {
            let result = sqlx::query(
                "UPDATE transfers SET status = 'ready' WHERE transfer_id = ? AND status != 'ready'",
            )
            .bind(transfer_id)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected() == 1)
        }

        async fn increment_download_count(&self, transfer_id: &str) -> MetadataResult<()> {
            sqlx::query(
                "UPDATE transfers SET download_count = download_count + 1 WHERE transfer_id = ?",
            )
            .bind(transfer_id)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn list_expired(&self, now: OffsetDateTime) -> MetadataResult<Vec<TransferRow>> {
            let rows = sqlx::query_as::<_, TransferRow>(
                "SELECT * FROM transfers WHERE expires_at < ? ORDER BY expires_at",
            )
            .bind(now)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn delete_transfer(&self, transfer_id: &str) -> MetadataResult<()> {
            let result = sqlx::query("DELETE FROM transfers WHERE transfer_id = ?")
                .bind(transfer_id)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(MetadataError::NotFound(format!(
                    "transfer_id {transfer_id} not found"
                )));
            }
            Ok(())
        }

        async fn count_active_transfers(&self) -> MetadataResult<i64> {
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM transfers WHERE status IN ('pending', 'uploading')",
            )
            .fetch_one(&self.pool)
            .await?;
            Ok(count)
        }
    }

    #[async_trait]
    impl TransferFileRepo for SqliteStore {
        async fn add_file(&self, file: &TransferFileRow) -> MetadataResult<()> {
            sqlx::query(
                "INSERT INTO transfer_files (file_id, transfer_id, stored_name, original_name, \
                 size, content_type, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&file.file_id)
            .bind(&file.transfer_id)
            .bind(&file.stored_name)
            .bind(&file.original_name)
            .bind(file.size)
            .bind(&file.content_type)
            .bind(file.created_at)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn list_files(&self, transfer_id: &str) -> MetadataResult<Vec<TransferFileRow>> {
            let rows = sqlx::query_as::<_, TransferFileRow>(
                "SELECT * FROM transfer_files WHERE transfer_id = ? ORDER BY created_at, file_id",
            )
            .bind(transfer_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn get_file(
            &self,
            transfer_id: &str,
            file_id: &str,
        ) -> MetadataResult<Option<TransferFileRow>> {
            let row = sqlx::query_as::<_, TransferFileRow>(
                "SELECT * FROM transfer_files WHERE transfer_id = ? AND file_id = ?",
            )
            .bind(transfer_id)
            .bind(file_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }
    }

    #[async_trait]
    impl StatsRepo for SqliteStore {
        async fn record_completion(&self, bytes: i64, at: OffsetDateTime) -> MetadataResult<()> {
            sqlx::query(
                "UPDATE usage_stats SET \
                 total_transfers = total_transfers + 1, \
                 total_bytes = total_bytes + ?, \
                 updated_at = ? \
                 WHERE id = 1",
            )
            .bind(bytes)
            .bind(at)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn get_stats(&self) -> MetadataResult<UsageStatsRow> {
            let row = sqlx::query_as::<_, UsageStatsRow>("SELECT * FROM usage_stats WHERE id = 1")
                .fetch_one(&self.pool)
                .await?;
            Ok(row)
        }
    }
}

const SCHEMA_SQL: &str = r#"
-- Transfer records
CREATE TABLE IF NOT EXISTS transfers (
    transfer_id TEXT PRIMARY KEY,
    filename TEXT NOT NULL,
    mode TEXT NOT NULL DEFAULT 'archive',
    status TEXT NOT NULL DEFAULT 'pending',
    total_size INTEGER NOT NULL,
    uploaded_size INTEGER NOT NULL DEFAULT 0,
    chunks_total INTEGER NOT NULL,
    chunks_completed INTEGER NOT NULL DEFAULT 0,
    download_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_transfers_expires ON transfers(expires_at);
CREATE INDEX IF NOT EXISTS idx_transfers_status ON transfers(status);

-- Per-chunk receipts; the primary key makes duplicate delivery idempotent
CREATE TABLE IF NOT EXISTS transfer_chunks (
    transfer_id TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    size_bytes INTEGER NOT NULL,
    received_at TEXT NOT NULL,
    PRIMARY KEY (transfer_id, chunk_index),
    FOREIGN KEY (transfer_id) REFERENCES transfers(transfer_id) ON DELETE CASCADE
);

-- Files of multi-file transfers
CREATE TABLE IF NOT EXISTS transfer_files (
    file_id TEXT PRIMARY KEY,
    transfer_id TEXT NOT NULL,
    stored_name TEXT NOT NULL,
    original_name TEXT NOT NULL,
    size INTEGER NOT NULL,
    content_type TEXT NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (transfer_id) REFERENCES transfers(transfer_id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_transfer_files_transfer ON transfer_files(transfer_id);

-- Singleton aggregate counters, incremented only on finalization
CREATE TABLE IF NOT EXISTS usage_stats (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    total_transfers INTEGER NOT NULL DEFAULT 0,
    total_bytes INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);
"#;
