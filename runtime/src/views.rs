//! Read models returned by the admission controller.
//!
//! Views are owned snapshots built under a read guard, so callers never
//! hold a ledger lock while serializing or rendering them.

use serde::{Deserialize, Serialize};
use soulpass_core::aggregates::tontine::TontineProgress;
use soulpass_core::types::{
    Booking, BookingId, BookingPhase, BookingStatus, BuyerIdentity, Money, PassClassId, Payment,
    Ticket, TicketCode, Tontine,
};
use soulpass_core::{DateTime, Utc};

/// Operator decision on a pending payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum Decision {
    /// Money arrived
    Approve,
    /// Proof rejected
    Reject {
        /// Reason shown to the buyer
        note: Option<String>,
    },
}

impl Decision {
    /// Label used in logs and metrics
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject { .. } => "reject",
        }
    }
}

/// Result of [`decide_payment`](crate::AdmissionController::decide_payment)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionOutcome {
    /// Payment marked Failed; confirmed totals untouched
    Rejected {
        /// The rejected payment
        payment: Payment,
    },
    /// Payment approved; booking still owes money
    Progress {
        /// The approved payment
        payment: Payment,
        /// Installment progress after approval
        progress: TontineProgress,
    },
    /// Payment approved and the booking is fully paid
    Paid {
        /// The approved payment
        payment: Payment,
        /// The booking's ticket
        ticket: Ticket,
    },
}

/// Buyer-facing status of a booking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingStatusView {
    /// Booking
    pub booking_id: BookingId,
    /// Pass class
    pub pass_class: PassClassId,
    /// Stored status
    pub status: BookingStatus,
    /// Derived phase
    pub phase: BookingPhase,
    /// Amount owed
    pub total_amount: Money,
    /// Confirmed total
    pub amount_paid: Money,
    /// Still owed
    pub remaining_amount: Money,
    /// Whether a payment awaits review
    pub has_pending_payment: bool,
    /// Ticket code once issued
    pub ticket_code: Option<TicketCode>,
    /// Installment cache
    pub tontine: Option<Tontine>,
    /// Generated identity
    pub identity: Option<BuyerIdentity>,
    /// Every payment attempt, oldest first
    pub payments: Vec<Payment>,
}

/// Pending payment enriched for the operator console
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingPaymentView {
    /// The pending payment
    pub payment: Payment,
    /// Pass class of the booking
    pub pass_class: PassClassId,
    /// Booking status
    pub booking_status: BookingStatus,
    /// Amount owed on the booking
    pub total_amount: Money,
    /// Confirmed so far
    pub amount_paid: Money,
    /// Whether this is an installment rather than a full payment
    pub is_tontine: bool,
    /// What would remain owed if this payment is approved
    pub remaining_after_approval: Money,
}

/// How to find a ticket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketLookup {
    /// By printable code
    Code(TicketCode),
    /// By owning booking
    Booking(BookingId),
}

/// Ticket with the booking context shown on the ticket screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketView {
    /// The ticket
    pub ticket: Ticket,
    /// Owning booking
    pub booking: Booking,
    /// Pass class display name
    pub pass_name: String,
    /// Generated identity, if any
    pub identity: Option<BuyerIdentity>,
}

/// Accepted scan at the door
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReceipt {
    /// Ticket code
    pub code: TicketCode,
    /// Pass class
    pub pass_class: PassClassId,
    /// Holder display name, if an identity was generated
    pub holder: Option<String>,
    /// Time the scan was accepted
    pub scanned_at: DateTime<Utc>,
}

/// Per-class booking counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassStats {
    /// Pass class
    pub pass_class: PassClassId,
    /// Non-cancelled bookings
    pub bookings: usize,
    /// Seats sold
    pub sold: u32,
    /// Capacity
    pub capacity: u32,
}

/// Installment booking shown on the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TontineSummary {
    /// Booking
    pub booking_id: BookingId,
    /// Pass class
    pub pass_class: PassClassId,
    /// Confirmed
    pub amount_paid: Money,
    /// Owed
    pub remaining_amount: Money,
    /// Boxes confirmed
    pub paid_boxes: u64,
    /// Boxes needed
    pub total_boxes: u64,
}

/// Administrative dashboard figures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStats {
    /// Tickets issued
    pub total_tickets: usize,
    /// Bookings in Paid
    pub paid_bookings: usize,
    /// Bookings in Tontine
    pub tontine_bookings: usize,
    /// Per-class counts
    pub by_class: Vec<ClassStats>,
    /// Sum of every Success payment
    pub total_revenue: Money,
    /// Ten most recent tickets, newest first
    pub recent_tickets: Vec<Ticket>,
    /// Bookings currently paying in installments
    pub tontines_in_progress: Vec<TontineSummary>,
}

/// What a reset removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetSummary {
    /// Bookings deleted
    pub bookings: usize,
    /// Payments deleted
    pub payments: usize,
    /// Tickets deleted
    pub tickets: usize,
}
