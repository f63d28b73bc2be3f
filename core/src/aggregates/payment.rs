//! Payment aggregate for the booking ledger.
//!
//! Records payment proofs submitted by buyers and the operator's decision
//! on each. A payment is decided exactly once: Pending moves to Success or
//! Failed and then freezes.
//!
//! Approval only flips the payment. Recomputing the installment cache and
//! settling the booking are separate steps the admission controller runs in
//! the same unit of work.

use crate::error::{AdmissionError, AdmissionResult};
use crate::event::LedgerEvent;
use crate::environment::LedgerEnvironment;
use crate::ledger::Ledger;
use crate::reducer::{Events, Reducer};
use crate::types::{Booking, BookingId, Money, Payment, PaymentChannel, PaymentId, PaymentStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::smallvec;

/// Note attached to a rejection when the operator gives none
pub const DEFAULT_REJECTION_NOTE: &str = "Payment rejected";

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Actions for the Payment aggregate
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentAction {
    // Commands
    /// Record a payment proof awaiting review
    SubmitPayment {
        /// Identifier for the new payment
        payment_id: PaymentId,
        /// Booking paid toward
        booking_id: BookingId,
        /// Operator used
        channel: PaymentChannel,
        /// Sender phone number
        sender_ref: String,
        /// Declared amount
        amount: Money,
    },

    /// Operator confirms the money arrived
    ApprovePayment {
        /// Payment to approve
        payment_id: PaymentId,
    },

    /// Operator rejects the proof
    RejectPayment {
        /// Payment to reject
        payment_id: PaymentId,
        /// Reason shown to the buyer
        note: Option<String>,
    },

    // Events
    /// Payment proof was recorded
    PaymentSubmitted {
        /// The new payment
        payment: Payment,
    },

    /// Payment was approved
    PaymentApproved {
        /// Payment
        payment_id: PaymentId,
        /// Owning booking
        booking_id: BookingId,
        /// Approved amount
        amount: Money,
        /// Confirmation time
        paid_at: DateTime<Utc>,
    },

    /// Payment was rejected
    PaymentRejected {
        /// Payment
        payment_id: PaymentId,
        /// Owning booking
        booking_id: BookingId,
        /// Reason
        note: String,
        /// Decision time
        decided_at: DateTime<Utc>,
    },
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the Payment aggregate
#[derive(Debug, Clone, Copy)]
pub struct PaymentReducer;

impl PaymentReducer {
    /// Creates a new `PaymentReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Amount the booking still owes on confirmed payments
    fn remaining_balance(ledger: &Ledger, booking: &Booking) -> AdmissionResult<Money> {
        let paid = ledger.confirmed_total(&booking.id)?;
        Ok(booking.total_amount.saturating_sub(paid))
    }

    /// Validates a new payment proof
    fn validate_submission(
        ledger: &Ledger,
        booking_id: &BookingId,
        sender_ref: &str,
        amount: Money,
    ) -> AdmissionResult<()> {
        if amount.is_zero() {
            return Err(AdmissionError::InvalidAmount);
        }
        let booking = ledger.booking(booking_id)?;
        if sender_ref.trim().is_empty() {
            return Err(AdmissionError::InvalidSender);
        }
        if booking.status.is_terminal() {
            return Err(AdmissionError::BookingClosed(*booking_id));
        }
        let remaining = Self::remaining_balance(ledger, booking)?;
        if amount > remaining {
            return Err(AdmissionError::ExceedsBalance { amount, remaining });
        }
        Ok(())
    }

    /// Loads a payment that is still awaiting a decision
    fn undecided<'a>(ledger: &'a Ledger, payment_id: &PaymentId) -> AdmissionResult<&'a Payment> {
        let payment = ledger.payment(payment_id)?;
        if payment.status.is_decided() {
            return Err(AdmissionError::AlreadyDecided {
                payment_id: *payment_id,
                status: payment.status,
            });
        }
        Ok(payment)
    }

    /// Validates an approval before anything is written
    fn validate_approval(ledger: &Ledger, payment: &Payment) -> AdmissionResult<()> {
        let booking = ledger.booking(&payment.booking_id)?;
        if booking.status.is_terminal() {
            return Err(AdmissionError::BookingClosed(booking.id));
        }
        let remaining = Self::remaining_balance(ledger, booking)?;
        if payment.amount > remaining {
            return Err(AdmissionError::ExceedsBalance {
                amount: payment.amount,
                remaining,
            });
        }
        Ok(())
    }

    /// Applies an event to the ledger
    pub fn apply_event(ledger: &mut Ledger, action: &PaymentAction) {
        match action {
            PaymentAction::PaymentSubmitted { payment } => {
                ledger.payments.insert(payment.id, payment.clone());
            }
            PaymentAction::PaymentApproved {
                payment_id,
                paid_at,
                ..
            } => {
                if let Some(payment) = ledger.payments.get_mut(payment_id) {
                    payment.status = PaymentStatus::Success;
                    payment.paid_at = Some(*paid_at);
                }
            }
            PaymentAction::PaymentRejected {
                payment_id, note, ..
            } => {
                if let Some(payment) = ledger.payments.get_mut(payment_id) {
                    payment.status = PaymentStatus::Failed;
                    payment.note = Some(note.clone());
                }
            }
            // Commands don't modify state
            PaymentAction::SubmitPayment { .. }
            | PaymentAction::ApprovePayment { .. }
            | PaymentAction::RejectPayment { .. } => {}
        }
    }

    fn emit(ledger: &mut Ledger, event: PaymentAction) -> Events<LedgerEvent> {
        Self::apply_event(ledger, &event);
        smallvec![LedgerEvent::Payment(event)]
    }
}

impl Default for PaymentReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for PaymentReducer {
    type State = Ledger;
    type Action = PaymentAction;
    type Event = LedgerEvent;
    type Error = AdmissionError;
    type Environment = LedgerEnvironment;

    fn reduce(
        &self,
        ledger: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Result<Events<Self::Event>, Self::Error> {
        match action {
            // ========== Submit Proof ==========
            PaymentAction::SubmitPayment {
                payment_id,
                booking_id,
                channel,
                sender_ref,
                amount,
            } => {
                Self::validate_submission(ledger, &booking_id, &sender_ref, amount)?;
                let payment = Payment {
                    id: payment_id,
                    booking_id,
                    amount,
                    channel,
                    sender_ref: sender_ref.trim().to_string(),
                    status: PaymentStatus::Pending,
                    note: None,
                    created_at: env.clock.now(),
                    paid_at: None,
                };
                Ok(Self::emit(ledger, PaymentAction::PaymentSubmitted { payment }))
            }

            // ========== Approve ==========
            PaymentAction::ApprovePayment { payment_id } => {
                let payment = Self::undecided(ledger, &payment_id)?;
                Self::validate_approval(ledger, payment)?;
                let (booking_id, amount) = (payment.booking_id, payment.amount);
                Ok(Self::emit(
                    ledger,
                    PaymentAction::PaymentApproved {
                        payment_id,
                        booking_id,
                        amount,
                        paid_at: env.clock.now(),
                    },
                ))
            }

            // ========== Reject ==========
            PaymentAction::RejectPayment { payment_id, note } => {
                let booking_id = Self::undecided(ledger, &payment_id)?.booking_id;
                let note = note
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| DEFAULT_REJECTION_NOTE.to_string());
                Ok(Self::emit(
                    ledger,
                    PaymentAction::PaymentRejected {
                        payment_id,
                        booking_id,
                        note,
                        decided_at: env.clock.now(),
                    },
                ))
            }

            // ========== Events (replay) ==========
            event => Ok(Self::emit(ledger, event)),
        }
    }
}
