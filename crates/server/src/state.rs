//! Application state shared across handlers.

use std::sync::Arc;

use freight_core::config::AppConfig;
use freight_metadata::MetadataStore;
use freight_storage::ObjectStore;

use crate::ws::ProgressHub;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Object storage backend.
    pub storage: Arc<dyn ObjectStore>,
    /// Metadata store.
    pub metadata: Arc<dyn MetadataStore>,
    /// Live progress fan-out hub.
    pub progress: Arc<ProgressHub>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Panics
    ///
    /// Panics if configuration validation fails.
    pub fn new(
        config: AppConfig,
        storage: Arc<dyn ObjectStore>,
        metadata: Arc<dyn MetadataStore>,
    ) -> Self {
        if let Err(error) = config.validate() {
            panic!("Invalid configuration: {}", error);
        }

        Self {
            config: Arc::new(config),
            storage,
            metadata,
            progress: Arc::new(ProgressHub::new()),
        }
    }
}
