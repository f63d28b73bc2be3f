//! Journal events emitted by the ledger reducers.
//!
//! [`LedgerEvent`] wraps the event variants of every aggregate so the
//! runtime can keep one ordered journal. Replaying a journal onto a ledger
//! holding the same catalog rebuilds the same state.

use crate::aggregates::booking::{BookingAction, BookingReducer};
use crate::aggregates::inventory::{InventoryAction, InventoryReducer};
use crate::aggregates::payment::{PaymentAction, PaymentReducer};
use crate::aggregates::ticket::{TicketAction, TicketReducer};
use crate::aggregates::tontine::{TontineAction, TontineReducer};
use crate::ledger::Ledger;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Union of all aggregate events
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// Event from the Inventory aggregate
    Inventory(InventoryAction),
    /// Event from the Booking aggregate
    Booking(BookingAction),
    /// Event from the Payment aggregate
    Payment(PaymentAction),
    /// Event from the Tontine aggregate
    Tontine(TontineAction),
    /// Event from the Ticket aggregate
    Ticket(TicketAction),
    /// Every booking-derived record was deleted
    LedgerReset {
        /// When reset
        reset_at: DateTime<Utc>,
    },
}

impl LedgerEvent {
    /// Short type name, e.g. `Payment.PaymentApproved`
    #[must_use]
    pub fn event_type(&self) -> String {
        let (aggregate, detail) = match self {
            Self::Inventory(action) => ("Inventory", format!("{action:?}")),
            Self::Booking(action) => ("Booking", format!("{action:?}")),
            Self::Payment(action) => ("Payment", format!("{action:?}")),
            Self::Tontine(action) => ("Tontine", format!("{action:?}")),
            Self::Ticket(action) => ("Ticket", format!("{action:?}")),
            Self::LedgerReset { .. } => return "Ledger.LedgerReset".to_string(),
        };
        let variant = detail
            .split([' ', '(', '{'])
            .next()
            .unwrap_or("Unknown");
        format!("{aggregate}.{variant}")
    }

    /// Applies this event to a ledger without validation
    pub fn apply(&self, ledger: &mut Ledger) {
        match self {
            Self::Inventory(action) => InventoryReducer::apply_event(ledger, action),
            Self::Booking(action) => BookingReducer::apply_event(ledger, action),
            Self::Payment(action) => PaymentReducer::apply_event(ledger, action),
            Self::Tontine(action) => TontineReducer::apply_event(ledger, action),
            Self::Ticket(action) => TicketReducer::apply_event(ledger, action),
            Self::LedgerReset { .. } => ledger.clear_bookings(),
        }
    }
}

/// A committed event with its position in the journal
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Position, starting at 1
    pub sequence: u64,
    /// Commit time
    pub recorded_at: DateTime<Utc>,
    /// The event
    pub event: LedgerEvent,
}

/// Rebuilds a ledger by applying journal entries in order
pub fn replay<'a>(ledger: &mut Ledger, entries: impl IntoIterator<Item = &'a JournalEntry>) {
    for entry in entries {
        entry.event.apply(ledger);
    }
}
