//! Ticket aggregate for the booking ledger.
//!
//! Mints one admission credential per fully-paid booking and enforces
//! single-use scanning. Issuance is idempotent through the ledger's
//! booking→ticket index: issuing twice returns the ticket minted first.

use crate::error::{AdmissionError, AdmissionResult};
use crate::event::LedgerEvent;
use crate::environment::LedgerEnvironment;
use crate::ledger::Ledger;
use crate::payload::TicketPayload;
use crate::reducer::{Events, Reducer};
use crate::types::{BookingId, Ticket, TicketCode, TicketId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::smallvec;

/// Attempts at drawing a code that is not already in use
const CODE_ATTEMPTS: usize = 3;

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Actions for the Ticket aggregate
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketAction {
    // Commands
    /// Issue the ticket for a fully-paid booking
    IssueTicket {
        /// Booking to ticket
        booking_id: BookingId,
    },

    /// Accept a ticket at the door
    ValidateTicket {
        /// Scanned code
        code: TicketCode,
    },

    /// Invalidate a ticket
    VoidTicket {
        /// Ticket code
        code: TicketCode,
        /// Reason recorded on the ticket
        reason: String,
    },

    // Events
    /// Ticket was issued
    TicketIssued {
        /// The new ticket
        ticket: Ticket,
    },

    /// Ticket was scanned for the first time
    TicketScanned {
        /// Ticket
        ticket_id: TicketId,
        /// Ticket code
        code: TicketCode,
        /// Scan time
        scanned_at: DateTime<Utc>,
    },

    /// Ticket was voided
    TicketVoided {
        /// Ticket
        ticket_id: TicketId,
        /// Ticket code
        code: TicketCode,
        /// Reason
        reason: String,
        /// When voided
        voided_at: DateTime<Utc>,
    },
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the Ticket aggregate
#[derive(Debug, Clone, Copy)]
pub struct TicketReducer;

impl TicketReducer {
    /// Creates a new `TicketReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Looks up a ticket by code
    ///
    /// # Errors
    ///
    /// [`AdmissionError::TicketNotFound`] if no ticket has this code.
    pub fn find_by_code<'a>(ledger: &'a Ledger, code: &TicketCode) -> AdmissionResult<&'a Ticket> {
        ledger
            .ticket_by_code(code)
            .ok_or_else(|| AdmissionError::TicketNotFound(code.to_string()))
    }

    /// Validates that the booking's confirmed total covers what it owes
    fn validate_fully_paid(ledger: &Ledger, booking_id: &BookingId) -> AdmissionResult<()> {
        let booking = ledger.booking(booking_id)?;
        let paid = ledger.confirmed_total(booking_id)?;
        if paid < booking.total_amount {
            return Err(AdmissionError::NotFullyPaid {
                paid,
                total: booking.total_amount,
            });
        }
        Ok(())
    }

    fn draw_code(ledger: &Ledger, env: &LedgerEnvironment, issued_at: DateTime<Utc>) -> AdmissionResult<TicketCode> {
        for _ in 0..CODE_ATTEMPTS {
            let code = env.codes.generate(issued_at);
            if ledger.ticket_by_code(&code).is_none() {
                return Ok(code);
            }
        }
        Err(AdmissionError::InvariantViolation(
            "could not draw an unused ticket code".to_string(),
        ))
    }

    fn mint(ledger: &Ledger, booking_id: BookingId, env: &LedgerEnvironment) -> AdmissionResult<Ticket> {
        let booking = ledger.booking(&booking_id)?;
        let issued_at = env.clock.now();
        let code = Self::draw_code(ledger, env, issued_at)?;

        let payload = TicketPayload {
            code: code.clone(),
            holder: ledger
                .identities
                .get(&booking_id)
                .map(|identity| identity.display_name.clone()),
            pass_class: booking.pass_class.clone(),
            booking_id,
        };
        let sealed = env
            .sealer
            .seal(&payload)
            .map_err(|e| AdmissionError::InvariantViolation(e.to_string()))?;

        Ok(Ticket {
            id: TicketId::new(),
            booking_id,
            code,
            payload: sealed,
            is_valid: true,
            void_reason: None,
            scanned_at: None,
            issued_at,
        })
    }

    /// Applies an event to the ledger
    pub fn apply_event(ledger: &mut Ledger, action: &TicketAction) {
        match action {
            TicketAction::TicketIssued { ticket } => {
                ledger.insert_ticket(ticket.clone());
            }
            TicketAction::TicketScanned {
                ticket_id,
                scanned_at,
                ..
            } => {
                if let Some(ticket) = ledger.ticket_mut(ticket_id) {
                    ticket.scanned_at.get_or_insert(*scanned_at);
                }
            }
            TicketAction::TicketVoided {
                ticket_id, reason, ..
            } => {
                if let Some(ticket) = ledger.ticket_mut(ticket_id) {
                    ticket.is_valid = false;
                    ticket.void_reason = Some(reason.clone());
                }
            }
            // Commands don't modify state
            TicketAction::IssueTicket { .. }
            | TicketAction::ValidateTicket { .. }
            | TicketAction::VoidTicket { .. } => {}
        }
    }

    fn emit(ledger: &mut Ledger, event: TicketAction) -> Events<LedgerEvent> {
        Self::apply_event(ledger, &event);
        smallvec![LedgerEvent::Ticket(event)]
    }
}

impl Default for TicketReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for TicketReducer {
    type State = Ledger;
    type Action = TicketAction;
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
            // ========== Issue ==========
            TicketAction::IssueTicket { booking_id } => {
                Self::validate_fully_paid(ledger, &booking_id)?;
                if ledger.ticket_for_booking(&booking_id).is_some() {
                    return Ok(Events::new());
                }
                let ticket = Self::mint(ledger, booking_id, env)?;
                Ok(Self::emit(ledger, TicketAction::TicketIssued { ticket }))
            }

            // ========== Validate at the door ==========
            TicketAction::ValidateTicket { code } => {
                let ticket = Self::find_by_code(ledger, &code)?;
                if !ticket.is_valid {
                    return Err(AdmissionError::TicketVoided(code));
                }
                if let Some(scanned_at) = ticket.scanned_at {
                    return Err(AdmissionError::AlreadyScanned { code, scanned_at });
                }
                let ticket_id = ticket.id;
                Ok(Self::emit(
                    ledger,
                    TicketAction::TicketScanned {
                        ticket_id,
                        code,
                        scanned_at: env.clock.now(),
                    },
                ))
            }

            // ========== Void ==========
            TicketAction::VoidTicket { code, reason } => {
                let ticket = Self::find_by_code(ledger, &code)?;
                if !ticket.is_valid {
                    return Ok(Events::new());
                }
                let ticket_id = ticket.id;
                Ok(Self::emit(
                    ledger,
                    TicketAction::TicketVoided {
                        ticket_id,
                        code,
                        reason,
                        voided_at: env.clock.now(),
                    },
                ))
            }

            // ========== Events (replay) ==========
            event => Ok(Self::emit(ledger, event)),
        }
    }
}
