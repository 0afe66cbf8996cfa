//! Prometheus metrics collection.
//!
//! Provides upload metrics in Prometheus format.

use prometheus_client::encoding::{EncodeLabelSet, text::encode};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

/// How an upload request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Accepted,
    Rejected,
    NoFile,
    TooLarge,
    Failed,
}

impl UploadOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            UploadOutcome::Accepted => "accepted",
            UploadOutcome::Rejected => "rejected",
            UploadOutcome::NoFile => "no_file",
            UploadOutcome::TooLarge => "too_large",
            UploadOutcome::Failed => "failed",
        }
    }
}

/// Upload labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct UploadLabels {
    pub outcome: String,
}

/// Application metrics.
pub struct Metrics {
    registry: Registry,

    /// Upload requests by outcome.
    pub uploads: Family<UploadLabels, Counter>,

    /// Bytes of accepted uploads.
    pub upload_bytes: Counter,
}

impl Metrics {
    /// Create a new metrics registry.
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let uploads = Family::<UploadLabels, Counter>::default();
        registry.register("uploads", "Upload requests by outcome", uploads.clone());

        let upload_bytes = Counter::default();
        registry.register(
            "upload_bytes",
            "Bytes of accepted uploads",
            upload_bytes.clone(),
        );

        Self {
            registry,
            uploads,
            upload_bytes,
        }
    }

    /// Record the outcome of an upload request.
    pub fn record_upload(&self, outcome: UploadOutcome) {
        let labels = UploadLabels {
            outcome: outcome.as_str().to_string(),
        };
        self.uploads.get_or_create(&labels).inc();
    }

    /// Record the size of an accepted upload.
    pub fn record_upload_bytes(&self, bytes: u64) {
        self.upload_bytes.inc_by(bytes);
    }

    /// Encode metrics in Prometheus text format.
    ///
    /// # Panics
    ///
    /// Panics if Prometheus metric encoding to a `String` buffer fails.
    /// The `fmt::Write` impl for `String` is infallible.
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        // Prometheus encoding to String buffer is infallible
        #[allow(clippy::expect_used)]
        encode(&mut buffer, &self.registry).expect("encoding metrics");
        buffer
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish()
    }
}
