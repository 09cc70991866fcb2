//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use avifpress_core::Config;
use avifpress_processing::ConversionPipeline;
use avifpress_services::SessionStore;
use tokio::sync::Semaphore;

pub struct AppState {
    pub config: Config,
    pub sessions: SessionStore,
    /// Caps how many conversion batches run at once across all requests.
    pub batch_permits: Semaphore,
}

impl AppState {
    pub fn new(config: Config) -> Arc<Self> {
        Arc::new(Self {
            sessions: SessionStore::new(Duration::from_secs(config.session_retention_secs)),
            batch_permits: Semaphore::new(config.max_concurrent_batches),
            config,
        })
    }

    /// Pipeline for one request; quality falls back to the configured default.
    pub fn pipeline(&self, quality: Option<u8>) -> ConversionPipeline {
        ConversionPipeline::new(
            self.config.max_edge,
            quality.unwrap_or(self.config.quality),
            Duration::from_secs(self.config.image_timeout_secs),
        )
    }
}
