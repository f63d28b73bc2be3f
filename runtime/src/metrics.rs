//! Business metrics for the admission engine.
//!
//! Counters and histograms are recorded through the `metrics` facade and
//! become visible once a recorder is installed. Without one (unit tests)
//! every call is a no-op.
//!
//! # Example
//!
//! ```rust,no_run
//! use soulpass_runtime::metrics::MetricsExporter;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let exporter = MetricsExporter::install()?;
//! let text = exporter.render();
//! # Ok(())
//! # }
//! ```

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

/// Errors from metrics setup.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Installed Prometheus recorder.
#[derive(Clone)]
pub struct MetricsExporter {
    handle: PrometheusHandle,
}

impl MetricsExporter {
    /// Describes every metric and installs the global Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or a recorder is
    /// already installed.
    pub fn install() -> Result<Self, MetricsError> {
        register_metrics();

        let handle = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?
            .install_recorder()
            .map_err(|e| MetricsError::Install(e.to_string()))?;

        tracing::info!("Metrics recorder installed");
        Ok(Self { handle })
    }

    /// Renders current metrics in Prometheus text format
    #[must_use]
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl std::fmt::Debug for MetricsExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsExporter").finish_non_exhaustive()
    }
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        "soulpass_bookings_created_total",
        "Total number of bookings admitted"
    );
    describe_counter!(
        "soulpass_admission_rejections_total",
        "Total number of rejected ledger operations, by error code"
    );
    describe_counter!(
        "soulpass_payments_submitted_total",
        "Total number of payment proofs submitted"
    );
    describe_counter!(
        "soulpass_payment_decisions_total",
        "Total number of operator decisions, by decision"
    );
    describe_counter!(
        "soulpass_confirmed_amount_total",
        "Sum of approved payment amounts"
    );
    describe_counter!(
        "soulpass_tickets_issued_total",
        "Total number of tickets issued"
    );
    describe_counter!(
        "soulpass_ticket_scans_total",
        "Total number of ticket scans, by outcome"
    );
    describe_histogram!(
        "soulpass_transaction_duration_seconds",
        "Time spent inside a ledger transaction, by operation"
    );
}

/// Record an admitted booking
pub fn record_booking_created() {
    counter!("soulpass_bookings_created_total").increment(1);
}

/// Record a rejected operation
pub fn record_rejection(operation: &'static str, code: &'static str) {
    counter!(
        "soulpass_admission_rejections_total",
        "operation" => operation,
        "reason" => code
    )
    .increment(1);
}

/// Record a submitted payment proof
pub fn record_payment_submitted() {
    counter!("soulpass_payments_submitted_total").increment(1);
}

/// Record an operator decision and, for approvals, the confirmed amount
pub fn record_payment_decision(decision: &'static str, approved_amount: Option<u64>) {
    counter!("soulpass_payment_decisions_total", "decision" => decision).increment(1);
    if let Some(amount) = approved_amount {
        counter!("soulpass_confirmed_amount_total").increment(amount);
    }
}

/// Record an issued ticket
pub fn record_ticket_issued() {
    counter!("soulpass_tickets_issued_total").increment(1);
}

/// Record a scan outcome (`valid`, `already_scanned`, `voided`, `not_found`, `forged`)
pub fn record_ticket_scan(outcome: &'static str) {
    counter!("soulpass_ticket_scans_total", "outcome" => outcome).increment(1);
}

/// Record time spent inside a transaction
pub fn record_transaction_duration(operation: &'static str, elapsed: Duration) {
    histogram!("soulpass_transaction_duration_seconds", "operation" => operation)
        .record(elapsed.as_secs_f64());
}
