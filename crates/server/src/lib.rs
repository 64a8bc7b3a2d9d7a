//! HTTP/WebSocket server for the freight transfer service.
//!
//! This crate provides the HTTP control plane:
//! - Transfer initialization and finalization
//! - Chunk and whole-file ingest
//! - Artifact and per-file download streaming
//! - Live progress fan-out over WebSocket
//! - Retention sweeping
//! - Usage statistics and health endpoints

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod sweeper;
pub mod ws;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
pub use ws::ProgressHub;
