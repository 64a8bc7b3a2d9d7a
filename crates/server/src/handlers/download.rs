//! Download handler: artifact and per-file streaming.

use std::io::Write as _;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue, Response, StatusCode};
use serde::Deserialize;

use freight_core::{TransferId, TransferMode, TransferStatus};
use freight_metadata::repos::{TransferFileRepo, TransferRepo};
use freight_storage::{keys, ObjectStore};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const ZIP_CONTENT_TYPE: &str = "application/zip";

/// Download query parameters.
#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    /// Download a single file of a multi-file transfer instead of the
    /// combined artifact.
    pub file: Option<String>,
}

/// GET /api/transfer/{id}/download - Stream the artifact or a single file.
///
/// The combined artifact for a multi-file transfer is synthesized as a zip
/// on first demand, persisted atomically, then streamed. If a concurrent
/// delete has already removed the artifact this is a plain 404; a download
/// only wins the race when the artifact is fully written.
#[tracing::instrument(skip(state), fields(transfer_id = %transfer_id))]
pub async fn download_transfer(
    State(state): State<AppState>,
    Path(transfer_id): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> ApiResult<Response<Body>> {
    let id = TransferId::parse(&transfer_id)?;
    let transfer = state
        .metadata
        .get_transfer(id.as_str())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("transfer {} not found", id)))?;

    if transfer.is_expired() {
        return Err(ApiError::Expired);
    }
    if transfer.status()? != TransferStatus::Ready {
        return Err(ApiError::NotReady(format!(
            "transfer is {}",
            transfer.status
        )));
    }

    let (key, content_type, display_name) = match &query.file {
        Some(file_id) => {
            let file = state
                .metadata
                .get_file(id.as_str(), file_id)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("file {} not found", file_id)))?;
            (
                keys::file_key(&id, &file.stored_name),
                file.content_type,
                file.original_name,
            )
        }
        None => {
            let key = keys::artifact_key(&id);
            if !state.storage.exists(&key).await? {
                if transfer.mode()? == TransferMode::MultiFile {
                    synthesize_zip(&state, &id).await?;
                } else {
                    return Err(ApiError::NotFound(format!(
                        "transfer {} has no artifact",
                        id
                    )));
                }
            }
            let name = if transfer.filename.ends_with(".zip") {
                transfer.filename.clone()
            } else {
                format!("{}.zip", transfer.filename)
            };
            (key, ZIP_CONTENT_TYPE.to_string(), name)
        }
    };

    let meta = state.storage.head(&key).await.map_err(|e| match e {
        // Lost the race against a concurrent delete.
        freight_storage::StorageError::NotFound(_) => {
            ApiError::NotFound(format!("transfer {} has no artifact", id))
        }
        other => ApiError::Storage(other),
    })?;
    let stream = state.storage.get_stream(&key).await?;

    state.metadata.increment_download_count(id.as_str()).await?;

    tracing::info!(
        transfer_id = %id,
        file_id = ?query.file,
        size = meta.size,
        "Download started"
    );

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, meta.size)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&display_name)?,
        )
        .header(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        )
        .header(header::PRAGMA, HeaderValue::from_static("no-cache"))
        .header(header::EXPIRES, HeaderValue::from_static("0"))
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::Internal(format!("failed to build response: {}", e)))?;

    Ok(response)
}

/// Build a zip of all files and persist it as the transfer's artifact.
///
/// The zip is assembled in memory (individual files are already bounded by
/// the configured size limit) and written via the atomic `put`, so a
/// concurrent download either sees the complete artifact or none at all.
async fn synthesize_zip(state: &AppState, id: &TransferId) -> ApiResult<()> {
    let files = state.metadata.list_files(id.as_str()).await?;
    if files.is_empty() {
        return Err(ApiError::NotFound(format!(
            "transfer {} has no artifact",
            id
        )));
    }

    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    for file in &files {
        let data = state
            .storage
            .get(&keys::file_key(id, &file.stored_name))
            .await?;
        writer
            .start_file(file.original_name.as_str(), options)
            .map_err(|e| ApiError::Internal(format!("zip write failed: {}", e)))?;
        writer
            .write_all(&data)
            .map_err(|e| ApiError::Internal(format!("zip write failed: {}", e)))?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| ApiError::Internal(format!("zip finalize failed: {}", e)))?;
    let archive = bytes::Bytes::from(cursor.into_inner());

    tracing::info!(
        transfer_id = %id,
        files = files.len(),
        size = archive.len(),
        "Synthesized zip artifact on demand"
    );
    state.storage.put(&keys::artifact_key(id), archive).await?;
    Ok(())
}

/// Attachment disposition with an RFC 5987 encoded filename.
fn content_disposition(filename: &str) -> ApiResult<HeaderValue> {
    let value = format!("attachment; filename*=UTF-8''{}", rfc5987_encode(filename));
    HeaderValue::from_str(&value)
        .map_err(|e| ApiError::Internal(format!("invalid disposition header: {}", e)))
}

/// Percent-encode a filename per RFC 5987 (attr-char stays literal,
/// everything else becomes %XX per UTF-8 byte).
fn rfc5987_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'a'..=b'z'
            | b'A'..=b'Z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~' => out.push(byte as char),
            _ => {
                out.push('%');
                out.push_str(&format!("{:02X}", byte));
            }
        }
    }
    out
}
