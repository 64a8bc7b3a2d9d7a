//! Object storage abstraction and filesystem backend for freight.
//!
//! This crate provides:
//! - Finalized artifact storage with atomic writes
//! - Per-transfer chunk and file landing areas
//! - Key-layout helpers shared by the server and the retention sweeper

pub mod backends;
pub mod error;
pub mod keys;
pub mod traits;

pub use backends::filesystem::FilesystemBackend;
pub use error::{StorageError, StorageResult};
pub use traits::{ByteStream, ObjectMeta, ObjectStore, StreamingUpload};

use freight_core::config::StorageConfig;
use std::sync::Arc;

/// Create an object store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn ObjectStore>> {
    match config {
        StorageConfig::Filesystem { path } => {
            let backend = FilesystemBackend::new(path).await?;
            Ok(Arc::new(backend))
        }
    }
}
