//! Transfer lifecycle handlers: init, chunk/file ingest, finalize, info,
//! delete, health.

use axum::extract::{Path, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use freight_core::{clamp_expiration_days, ProgressEvent, TransferId, TransferMode, TransferStatus};
use freight_metadata::models::{TransferFileRow, TransferRow};
use freight_metadata::repos::{StatsRepo, TransferFileRepo, TransferRepo};
use freight_metadata::MetadataStore;
use freight_storage::{keys, ObjectStore, StreamingUpload};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Slack added to the body-size limit so an oversized body is read (and
/// rejected with 400) instead of truncated at exactly the limit.
const BODY_LIMIT_SLACK: usize = 1024;

/// Request to initialize a transfer.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitTransferRequest {
    pub filename: String,
    pub total_size: i64,
    pub chunks_total: i64,
    pub expiration_days: Option<i64>,
    #[serde(default)]
    pub mode: Option<TransferMode>,
}

/// Response to a transfer initialization.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitTransferResponse {
    pub transfer_id: TransferId,
    pub upload_url: String,
    pub share_url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

/// POST /api/transfer/init - Initialize a new transfer.
#[tracing::instrument(skip(state, req))]
pub async fn init_transfer(
    State(state): State<AppState>,
    Json(req): Json<InitTransferRequest>,
) -> ApiResult<Json<InitTransferResponse>> {
    let mode = req.mode.unwrap_or(TransferMode::Archive);
    validate_init(&req, mode)?;

    let transfer_id = TransferId::new();
    let now = OffsetDateTime::now_utc();
    let days = clamp_expiration_days(req.expiration_days);
    let expires_at = now + time::Duration::days(days);

    let row = TransferRow {
        transfer_id: transfer_id.as_str().to_string(),
        filename: req.filename,
        mode: mode.as_str().to_string(),
        status: TransferStatus::Pending.as_str().to_string(),
        total_size: req.total_size,
        uploaded_size: 0,
        chunks_total: req.chunks_total,
        chunks_completed: 0,
        download_count: 0,
        created_at: now,
        expires_at,
    };
    state.metadata.create_transfer(&row).await?;

    tracing::info!(
        transfer_id = %transfer_id,
        mode = %mode.as_str(),
        total_size = req.total_size,
        chunks_total = req.chunks_total,
        expiration_days = days,
        "Transfer initialized"
    );

    let base = &state.config.server.public_base_url;
    Ok(Json(InitTransferResponse {
        upload_url: format!("{}/api/transfer/{}", base, transfer_id),
        share_url: format!("{}/{}", base, transfer_id),
        expires_at,
        transfer_id,
    }))
}

fn validate_init(req: &InitTransferRequest, mode: TransferMode) -> ApiResult<()> {
    if req.filename.trim().is_empty() {
        return Err(ApiError::Validation("filename cannot be empty".to_string()));
    }
    if req.total_size <= 0 {
        return Err(ApiError::Validation(
            "totalSize must be greater than 0".to_string(),
        ));
    }
    let min_chunks = match mode {
        TransferMode::Archive => 1,
        TransferMode::MultiFile => 0,
    };
    if req.chunks_total < min_chunks {
        return Err(ApiError::Validation(format!(
            "chunksTotal must be at least {} for {} mode",
            min_chunks,
            mode.as_str()
        )));
    }
    Ok(())
}

/// Response to a chunk upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkResponse {
    pub success: bool,
    pub chunk_index: u32,
    pub chunks_completed: i64,
}

/// PUT /api/transfer/{id}/chunk/{index} - Ingest one chunk.
///
/// Out-of-order and concurrent arrivals are supported. Re-delivery of an
/// index overwrites the chunk slot and leaves all counters unchanged.
#[tracing::instrument(skip(state, req), fields(transfer_id = %transfer_id, chunk_index))]
pub async fn upload_chunk(
    State(state): State<AppState>,
    Path((transfer_id, chunk_index)): Path<(String, u32)>,
    req: Request,
) -> ApiResult<Json<ChunkResponse>> {
    let id = TransferId::parse(&transfer_id)?;
    let transfer = fetch_live_transfer(&state, &id).await?;

    if transfer.status()? == TransferStatus::Ready {
        return Err(ApiError::AlreadyComplete);
    }
    if (chunk_index as i64) >= transfer.chunks_total {
        return Err(ApiError::Validation(format!(
            "chunk index {} out of range (chunksTotal {})",
            chunk_index, transfer.chunks_total
        )));
    }

    let max = state.config.server.max_chunk_size as usize;
    let data = axum::body::to_bytes(req.into_body(), max + BODY_LIMIT_SLACK)
        .await
        .map_err(|e| ApiError::Validation(format!("failed to read chunk body: {}", e)))?;
    if data.len() > max {
        return Err(ApiError::Validation(format!(
            "chunk size {} exceeds maximum {}",
            data.len(),
            max
        )));
    }

    let size = data.len() as i64;
    state.storage.put(&keys::chunk_key(&id, chunk_index), data).await?;

    let receipt = state
        .metadata
        .record_chunk(id.as_str(), chunk_index as i64, size, OffsetDateTime::now_utc())
        .await?;

    // Re-read for the event payload; counters may have moved under
    // concurrent uploads and the event should reflect the latest state.
    if let Some(current) = state.metadata.get_transfer(id.as_str()).await? {
        state
            .progress
            .publish(&ProgressEvent::progress(
                &id,
                current.uploaded_size,
                current.total_size,
                current.chunks_completed,
                current.chunks_total,
            ))
            .await;
    }

    Ok(Json(ChunkResponse {
        success: true,
        chunk_index,
        chunks_completed: receipt.chunks_completed,
    }))
}

/// Response to an individual file upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub success: bool,
    pub file_id: String,
}

/// POST /api/transfer/{id}/file - Ingest one file (multi-file mode).
///
/// The stored name comes from `X-Stored-Name`, the display name from
/// `X-Original-Name`, and the content type from `Content-Type`.
#[tracing::instrument(skip(state, headers, req), fields(transfer_id = %transfer_id))]
pub async fn upload_file(
    State(state): State<AppState>,
    Path(transfer_id): Path<String>,
    headers: HeaderMap,
    req: Request,
) -> ApiResult<Json<FileResponse>> {
    let id = TransferId::parse(&transfer_id)?;
    let transfer = fetch_live_transfer(&state, &id).await?;

    if transfer.status()? == TransferStatus::Ready {
        return Err(ApiError::AlreadyComplete);
    }
    if transfer.mode()? != TransferMode::MultiFile {
        return Err(ApiError::Validation(
            "individual file upload is only valid for multifile transfers".to_string(),
        ));
    }

    let stored_name = required_header(&headers, "x-stored-name")?;
    let original_name = required_header(&headers, "x-original-name")?;
    validate_stored_name(&stored_name)?;

    let content_type = headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let max = state.config.server.max_file_size as usize;
    let data = axum::body::to_bytes(req.into_body(), max + BODY_LIMIT_SLACK)
        .await
        .map_err(|e| ApiError::Validation(format!("failed to read file body: {}", e)))?;
    if data.len() > max {
        return Err(ApiError::Validation(format!(
            "file size {} exceeds maximum {}",
            data.len(),
            max
        )));
    }

    let size = data.len() as i64;
    state.storage.put(&keys::file_key(&id, &stored_name), data).await?;

    let file_id = Uuid::new_v4().to_string();
    let file = TransferFileRow {
        file_id: file_id.clone(),
        transfer_id: id.as_str().to_string(),
        stored_name,
        original_name,
        size,
        content_type,
        created_at: OffsetDateTime::now_utc(),
    };
    state.metadata.add_file(&file).await?;
    state.metadata.add_file_bytes(id.as_str(), size).await?;

    if let Some(current) = state.metadata.get_transfer(id.as_str()).await? {
        state
            .progress
            .publish(&ProgressEvent::progress(
                &id,
                current.uploaded_size,
                current.total_size,
                current.chunks_completed,
                current.chunks_total,
            ))
            .await;
    }

    Ok(Json(FileResponse {
        success: true,
        file_id,
    }))
}

fn required_header(headers: &HeaderMap, name: &str) -> ApiResult<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Validation(format!("missing required header: {}", name)))
}

fn validate_stored_name(name: &str) -> ApiResult<()> {
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(ApiError::Validation(
            "stored name must be a bare filename".to_string(),
        ));
    }
    Ok(())
}

/// Response to a finalize call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteResponse {
    pub success: bool,
    pub status: TransferStatus,
    pub download_url: String,
}

/// POST /api/transfer/{id}/complete - Finalize a transfer.
///
/// Archive mode reassembles the chunks in ascending index order into the
/// shareable artifact before anything becomes downloadable; the artifact
/// appears atomically via rename, so a concurrent download never observes
/// a partial file. Finalizing twice is a conflict and usage statistics are
/// only ever counted once.
#[tracing::instrument(skip(state), fields(transfer_id = %transfer_id))]
pub async fn complete_transfer(
    State(state): State<AppState>,
    Path(transfer_id): Path<String>,
) -> ApiResult<Json<CompleteResponse>> {
    let id = TransferId::parse(&transfer_id)?;
    let transfer = fetch_live_transfer(&state, &id).await?;

    if transfer.status()? == TransferStatus::Ready {
        return Err(ApiError::AlreadyComplete);
    }

    if transfer.mode()? == TransferMode::Archive {
        let indices = state.metadata.get_received_chunk_indices(id.as_str()).await?;
        if (indices.len() as i64) < transfer.chunks_total {
            return Err(ApiError::Validation(format!(
                "transfer is incomplete: {} of {} chunks received",
                indices.len(),
                transfer.chunks_total
            )));
        }
        reassemble_archive(&state, &id, &indices).await?;
        // Consumed chunk slots are scratch space once the artifact exists.
        state.storage.delete_prefix(&keys::chunk_prefix(&id)).await?;
    }

    // The transition gates the stats increment: only the call that actually
    // flips the status counts the transfer.
    if !state.metadata.mark_ready(id.as_str()).await? {
        return Err(ApiError::AlreadyComplete);
    }
    state
        .metadata
        .record_completion(transfer.total_size, OffsetDateTime::now_utc())
        .await?;

    state.progress.publish(&ProgressEvent::complete(&id)).await;

    tracing::info!(
        transfer_id = %id,
        total_size = transfer.total_size,
        "Transfer finalized"
    );

    Ok(Json(CompleteResponse {
        success: true,
        status: TransferStatus::Ready,
        download_url: format!(
            "{}/api/transfer/{}/download",
            state.config.server.public_base_url, id
        ),
    }))
}

/// Stream every chunk slot, ascending by index, into the artifact.
async fn reassemble_archive(state: &AppState, id: &TransferId, indices: &[i64]) -> ApiResult<()> {
    use futures::StreamExt;

    let mut upload = state.storage.put_stream(&keys::artifact_key(id)).await?;
    for &index in indices {
        let mut stream = state
            .storage
            .get_stream(&keys::chunk_key(id, index as u32))
            .await?;
        while let Some(chunk) = stream.next().await {
            upload.write(chunk?).await?;
        }
    }
    let bytes_written = upload.finish().await?;
    tracing::debug!(
        transfer_id = %id,
        chunks = indices.len(),
        bytes_written,
        "Archive reassembled"
    );
    Ok(())
}

/// One file entry in a transfer info response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub file_id: String,
    pub original_name: String,
    pub size: i64,
    pub content_type: String,
}

/// Transfer info response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferInfoResponse {
    pub transfer_id: String,
    pub filename: String,
    pub mode: TransferMode,
    /// Stored lifecycle status, or `expired` once retention has passed.
    pub status: &'static str,
    pub progress: u8,
    pub total_size: i64,
    pub uploaded_size: i64,
    pub chunks_total: i64,
    pub chunks_completed: i64,
    pub download_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub files: Vec<FileInfo>,
}

/// GET /api/transfer/{id} - Transfer status and progress.
///
/// Expiry is derived at read time: a transfer past its `expires_at` still
/// returns the full view, with status `expired` and a 410 response code,
/// even when the stored status says `ready`.
#[tracing::instrument(skip(state), fields(transfer_id = %transfer_id))]
pub async fn get_transfer_info(
    State(state): State<AppState>,
    Path(transfer_id): Path<String>,
) -> ApiResult<Response> {
    let id = TransferId::parse(&transfer_id)?;
    let transfer = state
        .metadata
        .get_transfer(id.as_str())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("transfer {} not found", id)))?;

    let status = transfer.status()?;
    let expired = transfer.is_expired();
    let files = if status == TransferStatus::Ready && !expired {
        state
            .metadata
            .list_files(id.as_str())
            .await?
            .into_iter()
            .map(|f| FileInfo {
                file_id: f.file_id,
                original_name: f.original_name,
                size: f.size,
                content_type: f.content_type,
            })
            .collect()
    } else {
        Vec::new()
    };

    let body = TransferInfoResponse {
        progress: freight_core::transfer::progress_percent(
            transfer.chunks_completed,
            transfer.chunks_total,
        ),
        transfer_id: transfer.transfer_id,
        filename: transfer.filename,
        mode: TransferMode::parse(&transfer.mode)?,
        status: if expired { "expired" } else { status.as_str() },
        total_size: transfer.total_size,
        uploaded_size: transfer.uploaded_size,
        chunks_total: transfer.chunks_total,
        chunks_completed: transfer.chunks_completed,
        download_count: transfer.download_count,
        created_at: transfer.created_at,
        expires_at: transfer.expires_at,
        files,
    };

    if expired {
        Ok((StatusCode::GONE, Json(body)).into_response())
    } else {
        Ok(Json(body).into_response())
    }
}

/// Response to a delete call.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

/// DELETE /api/transfer/{id} - Delete a transfer and its stored objects.
///
/// Storage cleanup is best-effort; a failed object removal is logged and
/// does not block removing the record. A second delete of the same id is
/// 404 with no side effect.
#[tracing::instrument(skip(state), fields(transfer_id = %transfer_id))]
pub async fn delete_transfer(
    State(state): State<AppState>,
    Path(transfer_id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let id = TransferId::parse(&transfer_id)?;
    let transfer = state
        .metadata
        .get_transfer(id.as_str())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("transfer {} not found", id)))?;

    purge_transfer_objects(&state, &id).await;
    state.metadata.delete_transfer(id.as_str()).await?;

    tracing::info!(
        transfer_id = %id,
        status = %transfer.status,
        "Transfer deleted"
    );
    Ok(Json(DeleteResponse { success: true }))
}

/// Remove a transfer's artifact, chunk scratch area, and files area.
/// Each failure is logged and swallowed.
pub(crate) async fn purge_transfer_objects(state: &AppState, id: &TransferId) {
    if let Err(e) = state.storage.delete(&keys::artifact_key(id)).await {
        if !matches!(e, freight_storage::StorageError::NotFound(_)) {
            tracing::warn!(transfer_id = %id, error = %e, "Failed to delete artifact");
        }
    }
    if let Err(e) = state.storage.delete_prefix(&keys::chunk_prefix(id)).await {
        tracing::warn!(transfer_id = %id, error = %e, "Failed to delete chunk scratch area");
    }
    if let Err(e) = state.storage.delete_prefix(&keys::files_prefix(id)).await {
        tracing::warn!(transfer_id = %id, error = %e, "Failed to delete files area");
    }
}

/// Fetch a transfer, mapping absence to 404 and passed retention to 410.
async fn fetch_live_transfer(state: &AppState, id: &TransferId) -> ApiResult<TransferRow> {
    let transfer = state
        .metadata
        .get_transfer(id.as_str())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("transfer {} not found", id)))?;
    if transfer.is_expired() {
        return Err(ApiError::Expired);
    }
    Ok(transfer)
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// GET /health - Service health.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    state.metadata.health_check().await?;
    state.storage.health_check().await?;

    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
    }))
}
