//! Application state shared across all handlers.

use std::sync::Arc;

use crate::config::Config;
use crate::file::LocalFileStorage;
use crate::metrics::Metrics;

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone, Debug)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

#[derive(Debug)]
struct AppStateInner {
    /// Immutable configuration, including the upload PIN.
    config: Config,

    /// Upload directory storage.
    storage: LocalFileStorage,

    /// Prometheus metrics.
    metrics: Metrics,
}

impl AppState {
    /// Create application state from configuration.
    pub fn new(config: Config) -> Self {
        let storage = LocalFileStorage::new(&config.uploads_dir, &config.uploads_url);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                storage,
                metrics: Metrics::new(),
            }),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the upload storage.
    pub fn storage(&self) -> &LocalFileStorage {
        &self.inner.storage
    }

    /// Get the metrics registry.
    pub fn metrics(&self) -> &Metrics {
        &self.inner.metrics
    }
}
