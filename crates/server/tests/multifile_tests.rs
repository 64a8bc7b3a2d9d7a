//! Integration tests for multi-file transfers: per-file ingest, zip
//! synthesis, per-file download.

mod common;

use axum::http::StatusCode;
use common::fixtures::{download_request, json_request, raw_request, seeded_bytes};
use common::TestServer;
use freight_metadata::repos::{TransferFileRepo, TransferRepo};
use freight_storage::ObjectStore;
use serde_json::json;

async fn init_multifile(server: &TestServer, total_size: usize) -> String {
    let (status, body) = json_request(
        &server.router,
        "POST",
        "/api/transfer/init",
        Some(json!({
            "filename": "vacation-photos",
            "totalSize": total_size,
            "chunksTotal": 0,
            "mode": "multifile",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "init failed: {body}");
    body["transferId"].as_str().unwrap().to_string()
}

async fn upload_file(
    server: &TestServer,
    id: &str,
    stored: &str,
    original: &str,
    content_type: &str,
    data: bytes::Bytes,
) -> String {
    let (status, body) = raw_request(
        &server.router,
        "POST",
        &format!("/api/transfer/{id}/file"),
        data,
        &[
            ("X-Stored-Name", stored),
            ("X-Original-Name", original),
            ("Content-Type", content_type),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::OK, "file upload failed: {body}");
    body["fileId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_file_upload_records_row_and_bytes() {
    let server = TestServer::new().await;
    let id = init_multifile(&server, 3000).await;

    upload_file(
        &server,
        &id,
        "a.jpg",
        "beach day.jpg",
        "image/jpeg",
        seeded_bytes(1, 1000),
    )
    .await;
    upload_file(
        &server,
        &id,
        "b.jpg",
        "sunset.jpg",
        "image/jpeg",
        seeded_bytes(2, 2000),
    )
    .await;

    let row = server.metadata().get_transfer(&id).await.unwrap().unwrap();
    assert_eq!(row.uploaded_size, 3000);
    assert_eq!(row.status, "uploading");
    assert_eq!(row.chunks_completed, 0);

    let files = server.metadata().list_files(&id).await.unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].original_name, "beach day.jpg");
}

#[tokio::test]
async fn test_file_upload_to_archive_transfer_is_400() {
    let server = TestServer::new().await;

    let (_, body) = json_request(
        &server.router,
        "POST",
        "/api/transfer/init",
        Some(json!({"filename": "a.zip", "totalSize": 10, "chunksTotal": 1})),
    )
    .await;
    let id = body["transferId"].as_str().unwrap();

    let (status, body) = raw_request(
        &server.router,
        "POST",
        &format!("/api/transfer/{id}/file"),
        seeded_bytes(1, 10),
        &[("X-Stored-Name", "a.txt"), ("X-Original-Name", "a.txt")],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
}

#[tokio::test]
async fn test_file_upload_requires_name_headers() {
    let server = TestServer::new().await;
    let id = init_multifile(&server, 100).await;

    let (status, _) = raw_request(
        &server.router,
        "POST",
        &format!("/api/transfer/{id}/file"),
        seeded_bytes(1, 10),
        &[("X-Original-Name", "a.txt")],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_file_upload_rejects_path_in_stored_name() {
    let server = TestServer::new().await;
    let id = init_multifile(&server, 100).await;

    let (status, _) = raw_request(
        &server.router,
        "POST",
        &format!("/api/transfer/{id}/file"),
        seeded_bytes(1, 10),
        &[
            ("X-Stored-Name", "../escape.txt"),
            ("X-Original-Name", "escape.txt"),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_download_synthesizes_zip_on_demand() {
    let server = TestServer::new().await;
    let id = init_multifile(&server, 1500).await;

    upload_file(
        &server,
        &id,
        "one.txt",
        "one.txt",
        "text/plain",
        seeded_bytes(1, 500),
    )
    .await;
    upload_file(
        &server,
        &id,
        "two.txt",
        "two.txt",
        "text/plain",
        seeded_bytes(2, 1000),
    )
    .await;
    json_request(
        &server.router,
        "POST",
        &format!("/api/transfer/{id}/complete"),
        None,
    )
    .await;

    let (status, headers, body) = download_request(
        &server.router,
        &format!("/api/transfer/{id}/download"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["content-type"], "application/zip");
    // Zip local file header magic.
    assert_eq!(&body[..4], b"PK\x03\x04");

    // The synthesized artifact is persisted for subsequent downloads.
    assert!(server
        .storage()
        .exists(&format!("artifacts/{id}.zip"))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_download_single_file_uses_its_content_type() {
    let server = TestServer::new().await;
    let id = init_multifile(&server, 700).await;

    let data = seeded_bytes(11, 700);
    let file_id = upload_file(
        &server,
        &id,
        "photo.jpg",
        "beach day.jpg",
        "image/jpeg",
        data.clone(),
    )
    .await;
    json_request(
        &server.router,
        "POST",
        &format!("/api/transfer/{id}/complete"),
        None,
    )
    .await;

    let (status, headers, body) = download_request(
        &server.router,
        &format!("/api/transfer/{id}/download?file={file_id}"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["content-type"], "image/jpeg");
    assert_eq!(
        headers["content-disposition"],
        "attachment; filename*=UTF-8''beach%20day.jpg"
    );
    assert_eq!(body, data);
}

#[tokio::test]
async fn test_download_unknown_file_id_is_404() {
    let server = TestServer::new().await;
    let id = init_multifile(&server, 100).await;

    upload_file(
        &server,
        &id,
        "a.txt",
        "a.txt",
        "text/plain",
        seeded_bytes(1, 100),
    )
    .await;
    json_request(
        &server.router,
        "POST",
        &format!("/api/transfer/{id}/complete"),
        None,
    )
    .await;

    let (status, _, _) = download_request(
        &server.router,
        &format!("/api/transfer/{id}/download?file=no-such-file"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_info_lists_files_when_ready() {
    let server = TestServer::new().await;
    let id = init_multifile(&server, 100).await;

    upload_file(
        &server,
        &id,
        "a.txt",
        "a.txt",
        "text/plain",
        seeded_bytes(1, 100),
    )
    .await;

    // Not ready yet: file listing withheld.
    let (_, body) =
        json_request(&server.router, "GET", &format!("/api/transfer/{id}"), None).await;
    assert_eq!(body["files"].as_array().unwrap().len(), 0);

    json_request(
        &server.router,
        "POST",
        &format!("/api/transfer/{id}/complete"),
        None,
    )
    .await;

    let (_, body) =
        json_request(&server.router, "GET", &format!("/api/transfer/{id}"), None).await;
    assert_eq!(body["status"], "ready");
    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["originalName"], "a.txt");
    assert_eq!(files[0]["contentType"], "text/plain");
}
