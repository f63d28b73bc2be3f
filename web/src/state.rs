//! Application state for Axum handlers.

use soulpass_runtime::{AdmissionController, MetricsExporter};
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cheap to clone: the controller shares one ledger and the token is
/// reference counted.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Admission controller
    pub controller: AdmissionController,
    admin_token: Option<Arc<str>>,
    metrics: Option<MetricsExporter>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(controller: AdmissionController, admin_token: Option<String>) -> Self {
        Self {
            controller,
            admin_token: admin_token.map(Arc::from),
            metrics: None,
        }
    }

    /// Attach the Prometheus exporter served on `/metrics`
    #[must_use]
    pub fn with_metrics(mut self, exporter: MetricsExporter) -> Self {
        self.metrics = Some(exporter);
        self
    }

    /// Configured admin token
    #[must_use]
    pub fn admin_token(&self) -> Option<&str> {
        self.admin_token.as_deref()
    }

    /// Installed metrics exporter
    #[must_use]
    pub const fn metrics(&self) -> Option<&MetricsExporter> {
        self.metrics.as_ref()
    }
}
