//! Aggregate usage statistics.

use axum::extract::State;
use axum::Json;
use freight_metadata::repos::{StatsRepo, TransferRepo};
use serde::Serialize;
use time::OffsetDateTime;

use crate::error::ApiResult;
use crate::state::AppState;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Usage statistics response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    /// Transfers finalized since the service was first started.
    pub total_transfers: i64,
    /// Bytes across all finalized transfers.
    pub total_bytes: i64,
    /// `total_bytes` in gibibytes, rounded to two decimals.
    #[serde(rename = "totalGB")]
    pub total_gb: f64,
    /// Transfers currently pending or uploading.
    pub active_transfers: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// GET /api/stats - Aggregate usage statistics.
#[tracing::instrument(skip(state))]
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<StatsResponse>> {
    let stats = state.metadata.get_stats().await?;
    let active = state.metadata.count_active_transfers().await?;

    Ok(Json(StatsResponse {
        total_transfers: stats.total_transfers,
        total_bytes: stats.total_bytes,
        total_gb: round_gb(stats.total_bytes),
        active_transfers: active,
        updated_at: stats.updated_at,
    }))
}

fn round_gb(bytes: i64) -> f64 {
    (bytes as f64 / BYTES_PER_GB * 100.0).round() / 100.0
}
