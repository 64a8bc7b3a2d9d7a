//! Metadata store abstraction and SQLite implementation for freight.
//!
//! This crate provides the control-plane data model:
//! - Transfer records and lifecycle counters
//! - Per-chunk receipt tracking (idempotent duplicate delivery)
//! - Multi-file transfer listings
//! - The singleton usage-statistics row

pub mod error;
pub mod models;
pub mod repos;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use store::{MetadataStore, SqliteStore};

use freight_core::config::MetadataConfig;
use std::sync::Arc;

/// Create a metadata store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    match config {
        MetadataConfig::Sqlite { path } => {
            let store = SqliteStore::new(path).await?;
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
    }
}
