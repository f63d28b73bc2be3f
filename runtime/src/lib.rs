//! # SoulPass Runtime
//!
//! Runtime for the SoulPass booking ledger.
//!
//! This crate owns the shared [`Ledger`](soulpass_core::Ledger) and turns the
//! pure reducers of `soulpass-core` into serialized, all-or-nothing
//! operations.
//!
//! ## Core Components
//!
//! - **AdmissionController**: façade for checkout, operator console and door scanning
//! - **Journal**: ordered record of every committed event
//! - **Metrics**: Prometheus counters and histograms for business outcomes
//! - **Identity**: seam for the external name generator
//!
//! ## Example
//!
//! ```ignore
//! use soulpass_runtime::{AdmissionController, Decision, PaymentSubmission};
//!
//! let controller = AdmissionController::new(PassClass::default_catalog(), env);
//!
//! let booking = controller
//!     .create_booking(BuyerId::new(), &PassClassId::from(PassClassId::SEOUL_ENTRY), Money::new(7_000))
//!     .await?;
//!
//! let payment = controller
//!     .submit_payment(PaymentSubmission {
//!         booking_id: booking.id,
//!         channel: PaymentChannel::Mtn,
//!         sender_ref: "+22990000000".into(),
//!         amount: Money::new(7_000),
//!     })
//!     .await?;
//!
//! let outcome = controller.decide_payment(true, payment.id, Decision::Approve).await?;
//! ```

/// Transactional façade over the ledger
pub mod controller;

/// Identity generation seam
pub mod identity;

/// Prometheus metrics for observability
pub mod metrics;

/// Read models returned by the controller
pub mod views;

pub use controller::{AdmissionController, PaymentSubmission};
pub use identity::{IdentityError, IdentityProvider, IdentityRequest};
pub use metrics::{MetricsError, MetricsExporter};
pub use views::{
    BookingStatusView, ClassStats, Decision, DecisionOutcome, LedgerStats, PendingPaymentView,
    ResetSummary, ScanReceipt, TicketLookup, TicketView, TontineSummary,
};
