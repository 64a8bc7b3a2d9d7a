//! Integration tests for the stats and health endpoints.

mod common;

use axum::http::StatusCode;
use common::fixtures::{json_request, raw_request, seeded_bytes};
use common::TestServer;
use serde_json::json;

async fn finalize_one(server: &TestServer, total_size: usize) -> String {
    let (_, body) = json_request(
        &server.router,
        "POST",
        "/api/transfer/init",
        Some(json!({"filename": "a.zip", "totalSize": total_size, "chunksTotal": 1})),
    )
    .await;
    let id = body["transferId"].as_str().unwrap().to_string();

    raw_request(
        &server.router,
        "PUT",
        &format!("/api/transfer/{id}/chunk/0"),
        seeded_bytes(1, total_size),
        &[],
    )
    .await;
    json_request(
        &server.router,
        "POST",
        &format!("/api/transfer/{id}/complete"),
        None,
    )
    .await;
    id
}

#[tokio::test]
async fn test_stats_start_at_zero() {
    let server = TestServer::new().await;

    let (status, body) = json_request(&server.router, "GET", "/api/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalTransfers"], 0);
    assert_eq!(body["totalBytes"], 0);
    assert_eq!(body["totalGB"], 0.0);
    assert_eq!(body["activeTransfers"], 0);
    assert!(body["updatedAt"].as_str().is_some());
}

#[tokio::test]
async fn test_stats_count_finalized_transfers() {
    let server = TestServer::new().await;

    finalize_one(&server, 1000).await;
    finalize_one(&server, 2000).await;

    let (_, body) = json_request(&server.router, "GET", "/api/stats", None).await;
    assert_eq!(body["totalTransfers"], 2);
    assert_eq!(body["totalBytes"], 3000);
}

#[tokio::test]
async fn test_repeated_finalize_counts_once() {
    let server = TestServer::new().await;
    let id = finalize_one(&server, 1000).await;

    // Second finalize is rejected and must not re-increment stats.
    let (status, _) = json_request(
        &server.router,
        "POST",
        &format!("/api/transfer/{id}/complete"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = json_request(&server.router, "GET", "/api/stats", None).await;
    assert_eq!(body["totalTransfers"], 1);
    assert_eq!(body["totalBytes"], 1000);
}

#[tokio::test]
async fn test_active_transfers_exclude_ready() {
    let server = TestServer::new().await;

    finalize_one(&server, 100).await;
    json_request(
        &server.router,
        "POST",
        "/api/transfer/init",
        Some(json!({"filename": "b.zip", "totalSize": 10, "chunksTotal": 1})),
    )
    .await;

    let (_, body) = json_request(&server.router, "GET", "/api/stats", None).await;
    assert_eq!(body["activeTransfers"], 1);
}

#[tokio::test]
async fn test_health_reports_ok() {
    let server = TestServer::new().await;

    let (status, body) = json_request(&server.router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].as_str().is_some());
}
