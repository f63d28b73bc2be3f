//! Booking aggregate: the reservation state machine.
//!
//! Owns the booking lifecycle and is the only caller of the ticket issuer.
//! Admission at creation and promotion out of Pending both read inventory
//! facts from the ledger, so two bookings can never claim the last seat
//! inside one serialized unit of work.
//!
//! ```text
//! Pending ──► Tontine ──► Paid
//!    │           │
//!    └───────────┴──► Cancelled
//! ```

use crate::aggregates::inventory::Availability;
use crate::aggregates::ticket::{TicketAction, TicketReducer};
use crate::error::{AdmissionError, AdmissionResult};
use crate::event::LedgerEvent;
use crate::environment::LedgerEnvironment;
use crate::ledger::Ledger;
use crate::reducer::{Events, Reducer};
use crate::types::{
    Booking, BookingId, BookingStatus, BuyerId, BuyerIdentity, Money, PassClassId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::smallvec;

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Actions for the Booking aggregate
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingAction {
    // Commands
    /// Reserve a pass at the price the buyer saw
    CreateBooking {
        /// Identifier for the new booking
        booking_id: BookingId,
        /// Buyer account
        buyer: BuyerId,
        /// Pass class to reserve
        pass_class: PassClassId,
        /// Price shown at checkout
        declared_price: Money,
    },

    /// Reconcile the status with confirmed payments, issuing the ticket once covered
    Settle {
        /// Booking to settle
        booking_id: BookingId,
    },

    /// Cancel a non-terminal booking
    CancelBooking {
        /// Booking to cancel
        booking_id: BookingId,
        /// Reason
        reason: String,
    },

    /// Attach a generated identity, replacing any earlier one
    AssignIdentity {
        /// Booking
        booking_id: BookingId,
        /// Generated identity
        identity: BuyerIdentity,
    },

    // Events
    /// Booking was created
    BookingCreated {
        /// The new booking
        booking: Booking,
    },

    /// Booking moved to another status
    StatusChanged {
        /// Booking
        booking_id: BookingId,
        /// Previous status
        from: BookingStatus,
        /// New status
        to: BookingStatus,
        /// Confirmed total at the time of the change
        amount_paid: Money,
        /// When changed
        changed_at: DateTime<Utc>,
    },

    /// Booking was cancelled
    BookingCancelled {
        /// Booking
        booking_id: BookingId,
        /// Status before cancellation
        from: BookingStatus,
        /// Reason
        reason: String,
        /// When cancelled
        cancelled_at: DateTime<Utc>,
    },

    /// Identity was attached
    IdentityAssigned {
        /// Booking
        booking_id: BookingId,
        /// Identity
        identity: BuyerIdentity,
        /// When attached
        assigned_at: DateTime<Utc>,
    },
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the Booking aggregate
#[derive(Debug, Clone, Copy)]
pub struct BookingReducer;

impl BookingReducer {
    /// Creates a new `BookingReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Status a booking should hold given its confirmed total
    #[must_use]
    pub fn target_status(current: BookingStatus, paid: Money, total: Money) -> BookingStatus {
        if paid >= total {
            BookingStatus::Paid
        } else if paid.is_zero() {
            current
        } else {
            BookingStatus::Tontine
        }
    }

    /// Validates a new booking against the catalog and current admission
    fn validate_creation(
        ledger: &Ledger,
        pass_class: &PassClassId,
        declared_price: Money,
        env: &LedgerEnvironment,
    ) -> AdmissionResult<Money> {
        let class = ledger.pass_class(pass_class)?;
        if declared_price != class.unit_price {
            return Err(AdmissionError::PriceMismatch {
                declared: declared_price,
                current: class.unit_price,
            });
        }
        let availability = Availability::compute(ledger, class, env.clock.now(), &env.policy);
        if !availability.is_open() {
            return Err(AdmissionError::SoldOut(pass_class.clone()));
        }
        Ok(class.unit_price)
    }

    /// A Pending booking may only start consuming a seat while one is left
    fn validate_promotion(ledger: &Ledger, booking: &Booking) -> AdmissionResult<()> {
        let class = ledger.pass_class(&booking.pass_class)?;
        if ledger.sold(&booking.pass_class) >= class.capacity.seats() {
            return Err(AdmissionError::SoldOut(booking.pass_class.clone()));
        }
        Ok(())
    }

    fn validate_transition(from: BookingStatus, to: BookingStatus) -> AdmissionResult<()> {
        if from.can_transition_to(to) {
            Ok(())
        } else {
            Err(AdmissionError::InvalidTransition { from, to })
        }
    }

    fn settle(
        ledger: &mut Ledger,
        booking_id: BookingId,
        env: &LedgerEnvironment,
    ) -> AdmissionResult<Events<LedgerEvent>> {
        let booking = ledger.booking(&booking_id)?;
        match booking.status {
            // Re-entry after payment is a no-op; the ticket already exists
            BookingStatus::Paid => return Ok(Events::new()),
            BookingStatus::Cancelled => return Err(AdmissionError::BookingClosed(booking_id)),
            BookingStatus::Pending | BookingStatus::Tontine => {}
        }

        let from = booking.status;
        let paid = ledger.confirmed_total(&booking_id)?;
        let to = Self::target_status(from, paid, booking.total_amount);
        Self::validate_transition(from, to)?;
        if from == BookingStatus::Pending && to.consumes_inventory() {
            Self::validate_promotion(ledger, booking)?;
        }

        let mut events = Events::new();
        if to != from {
            events.extend(Self::emit(
                ledger,
                BookingAction::StatusChanged {
                    booking_id,
                    from,
                    to,
                    amount_paid: paid,
                    changed_at: env.clock.now(),
                },
            ));
        }
        if to == BookingStatus::Paid {
            events.extend(TicketReducer::new().reduce(
                ledger,
                TicketAction::IssueTicket { booking_id },
                env,
            )?);
        }
        Ok(events)
    }

    /// Applies an event to the ledger
    pub fn apply_event(ledger: &mut Ledger, action: &BookingAction) {
        match action {
            BookingAction::BookingCreated { booking } => {
                ledger.bookings.insert(booking.id, booking.clone());
            }
            BookingAction::StatusChanged {
                booking_id,
                to,
                changed_at,
                ..
            } => {
                if let Some(booking) = ledger.bookings.get_mut(booking_id) {
                    booking.status = *to;
                    booking.updated_at = *changed_at;
                }
            }
            BookingAction::BookingCancelled {
                booking_id,
                cancelled_at,
                ..
            } => {
                if let Some(booking) = ledger.bookings.get_mut(booking_id) {
                    booking.status = BookingStatus::Cancelled;
                    booking.updated_at = *cancelled_at;
                }
            }
            BookingAction::IdentityAssigned {
                booking_id,
                identity,
                ..
            } => {
                ledger.identities.insert(*booking_id, identity.clone());
            }
            // Commands don't modify state
            BookingAction::CreateBooking { .. }
            | BookingAction::Settle { .. }
            | BookingAction::CancelBooking { .. }
            | BookingAction::AssignIdentity { .. } => {}
        }
    }

    fn emit(ledger: &mut Ledger, event: BookingAction) -> Events<LedgerEvent> {
        Self::apply_event(ledger, &event);
        smallvec![LedgerEvent::Booking(event)]
    }
}

impl Default for BookingReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for BookingReducer {
    type State = Ledger;
    type Action = BookingAction;
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
            // ========== Create (admission) ==========
            BookingAction::CreateBooking {
                booking_id,
                buyer,
                pass_class,
                declared_price,
            } => {
                let unit_price = Self::validate_creation(ledger, &pass_class, declared_price, env)?;
                let now = env.clock.now();
                let booking = Booking {
                    id: booking_id,
                    buyer,
                    pass_class,
                    unit_price,
                    total_amount: unit_price,
                    status: BookingStatus::Pending,
                    created_at: now,
                    updated_at: now,
                };
                Ok(Self::emit(ledger, BookingAction::BookingCreated { booking }))
            }

            // ========== Settle after a decision ==========
            BookingAction::Settle { booking_id } => Self::settle(ledger, booking_id, env),

            // ========== Cancel ==========
            BookingAction::CancelBooking { booking_id, reason } => {
                let from = ledger.booking(&booking_id)?.status;
                Self::validate_transition(from, BookingStatus::Cancelled)?;
                Ok(Self::emit(
                    ledger,
                    BookingAction::BookingCancelled {
                        booking_id,
                        from,
                        reason,
                        cancelled_at: env.clock.now(),
                    },
                ))
            }

            // ========== Identity ==========
            BookingAction::AssignIdentity {
                booking_id,
                identity,
            } => {
                ledger.booking(&booking_id)?;
                // The holder name is sealed into the ticket payload at issue.
                if let Some(ticket) = ledger.ticket_for_booking(&booking_id) {
                    return Err(AdmissionError::IdentityLocked(ticket.code.clone()));
                }
                Ok(Self::emit(
                    ledger,
                    BookingAction::IdentityAssigned {
                        booking_id,
                        identity,
                        assigned_at: env.clock.now(),
                    },
                ))
            }

            // ========== Events (replay) ==========
            event => Ok(Self::emit(ledger, event)),
        }
    }
}
