//! Core domain types and shared logic for the freight transfer service.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Transfer identifiers and lifecycle states
//! - Archive vs. multi-file transfer modes
//! - Progress events published to live watchers
//! - Application configuration

pub mod config;
pub mod error;
pub mod progress;
pub mod transfer;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use progress::ProgressEvent;
pub use transfer::{TransferId, TransferMode, TransferStatus};

/// Maximum accepted chunk size: 32 MiB
pub const MAX_CHUNK_SIZE: u64 = 32 * 1024 * 1024;

/// Minimum retention period in days.
pub const MIN_EXPIRATION_DAYS: i64 = 3;

/// Maximum retention period in days.
pub const MAX_EXPIRATION_DAYS: i64 = 7;

/// Clamp a requested retention period into the allowed range.
///
/// Out-of-range requests are silently clamped rather than rejected.
pub fn clamp_expiration_days(requested: Option<i64>) -> i64 {
    requested
        .unwrap_or(MIN_EXPIRATION_DAYS)
        .clamp(MIN_EXPIRATION_DAYS, MAX_EXPIRATION_DAYS)
}
