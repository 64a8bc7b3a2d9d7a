//! Usage statistics repository.

use crate::error::MetadataResult;
use crate::models::UsageStatsRow;
use async_trait::async_trait;
use time::OffsetDateTime;

/// Repository for the singleton usage-statistics row.
#[async_trait]
pub trait StatsRepo: Send + Sync {
    /// Record a successful finalization: adds 1 transfer and `bytes` to the
    /// cumulative totals in a single atomic UPDATE.
    async fn record_completion(&self, bytes: i64, at: OffsetDateTime) -> MetadataResult<()>;

    /// Read the aggregate statistics.
    async fn get_stats(&self) -> MetadataResult<UsageStatsRow>;
}
