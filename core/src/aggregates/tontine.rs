//! Tontine aggregate: installment progress for a booking.
//!
//! The stored [`Tontine`] record is a cache. Its amounts are always
//! recomputed from the booking's Success payments, never accumulated and
//! never taken from a client-declared box count.

use crate::error::{AdmissionError, AdmissionResult};
use crate::event::LedgerEvent;
use crate::environment::LedgerEnvironment;
use crate::ledger::Ledger;
use crate::reducer::{Events, Reducer};
use crate::types::{Booking, BookingId, Money, Tontine, TontineStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::smallvec;

// ============================================================================
// Data Structures
// ============================================================================

/// How a client-declared box count compares with confirmed payments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimCheck {
    /// Declared count does not exceed the confirmed count
    Consistent,
    /// Client claims more boxes than the operator confirmed
    Unconfirmed {
        /// Boxes the client declared
        declared: u64,
        /// Boxes backed by confirmed payments
        confirmed: u64,
    },
}

/// Authoritative installment progress for a booking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TontineProgress {
    /// Booking
    pub booking_id: BookingId,
    /// Amount owed
    pub total_amount: Money,
    /// Sum of confirmed payments
    pub amount_paid: Money,
    /// Amount still owed
    pub remaining_amount: Money,
    /// Increments needed
    pub total_boxes: u64,
    /// Increments confirmed
    pub paid_boxes: u64,
    /// Progress status
    pub status: TontineStatus,
    /// Comparison with the client's declared count, when one was given
    pub claim: Option<ClaimCheck>,
}

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Actions for the Tontine aggregate
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TontineAction {
    // Commands
    /// Recompute the cached progress from confirmed payments
    Recompute {
        /// Booking to recompute
        booking_id: BookingId,
    },

    // Events
    /// Cached progress was created or updated
    TontineUpdated {
        /// The new record
        tontine: Tontine,
    },
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the Tontine aggregate
#[derive(Debug, Clone, Copy)]
pub struct TontineReducer;

impl TontineReducer {
    /// Creates a new `TontineReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Builds the record for `booking` given its confirmed total
    #[must_use]
    pub fn compute(booking: &Booking, amount_paid: Money, box_unit: Money, at: DateTime<Utc>) -> Tontine {
        let remaining_amount = booking.total_amount.saturating_sub(amount_paid);
        Tontine {
            booking_id: booking.id,
            total_boxes: booking.total_amount.whole_units_of(box_unit),
            paid_boxes: amount_paid.whole_units_of(box_unit),
            amount_paid,
            remaining_amount,
            status: if remaining_amount.is_zero() {
                TontineStatus::Complete
            } else {
                TontineStatus::InProgress
            },
            updated_at: at,
        }
    }

    /// Live progress for a booking, optionally checking a declared box count.
    ///
    /// Never mutates the ledger.
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::BookingNotFound`] for unknown bookings
    /// - [`AdmissionError::InvariantViolation`] if the confirmed sum overflows
    pub fn progress(
        ledger: &Ledger,
        booking_id: &BookingId,
        box_unit: Money,
        declared_boxes: Option<u64>,
        now: DateTime<Utc>,
    ) -> AdmissionResult<TontineProgress> {
        let booking = ledger.booking(booking_id)?;
        let paid = ledger.confirmed_total(booking_id)?;
        let live = Self::compute(booking, paid, box_unit, now);

        let claim = declared_boxes.map(|declared| {
            if declared > live.paid_boxes {
                ClaimCheck::Unconfirmed {
                    declared,
                    confirmed: live.paid_boxes,
                }
            } else {
                ClaimCheck::Consistent
            }
        });

        Ok(TontineProgress {
            booking_id: *booking_id,
            total_amount: booking.total_amount,
            amount_paid: live.amount_paid,
            remaining_amount: live.remaining_amount,
            total_boxes: live.total_boxes,
            paid_boxes: live.paid_boxes,
            status: live.status,
            claim,
        })
    }

    /// Checks the recomputed sum against the cache and the booking total
    fn validate_recomputation(ledger: &Ledger, booking: &Booking, paid: Money) -> AdmissionResult<()> {
        if let Some(cached) = ledger.tontines.get(&booking.id) {
            if paid < cached.amount_paid {
                return Err(AdmissionError::InvariantViolation(format!(
                    "confirmed total for booking {} fell from {} to {paid}",
                    booking.id, cached.amount_paid
                )));
            }
        }
        if paid > booking.total_amount {
            return Err(AdmissionError::InvariantViolation(format!(
                "confirmed total {paid} exceeds {} owed on booking {}",
                booking.total_amount, booking.id
            )));
        }
        Ok(())
    }

    /// Applies an event to the ledger
    pub fn apply_event(ledger: &mut Ledger, action: &TontineAction) {
        match action {
            TontineAction::TontineUpdated { tontine } => {
                ledger.tontines.insert(tontine.booking_id, tontine.clone());
            }
            TontineAction::Recompute { .. } => {}
        }
    }
}

impl Default for TontineReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for TontineReducer {
    type State = Ledger;
    type Action = TontineAction;
    type Event = LedgerEvent;
    type Error = AdmissionError;
    type Environment = LedgerEnvironment;

    fn reduce(
        &self,
        ledger: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Result<Events<Self::Event>, Self::Error> {
        let event = match action {
            TontineAction::Recompute { booking_id } => {
                let booking = ledger.booking(&booking_id)?;
                let paid = ledger.confirmed_total(&booking_id)?;
                Self::validate_recomputation(ledger, booking, paid)?;
                TontineAction::TontineUpdated {
                    tontine: Self::compute(booking, paid, env.policy.box_unit, env.clock.now()),
                }
            }
            event @ TontineAction::TontineUpdated { .. } => event,
        };

        Self::apply_event(ledger, &event);
        Ok(smallvec![LedgerEvent::Tontine(event)])
    }
}
