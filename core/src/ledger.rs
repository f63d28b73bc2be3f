//! The ledger: the single state value every aggregate reducer operates on.
//!
//! Seat counts and paid totals are never stored. They are recomputed from
//! booking statuses and the payment history on every read, so the ledger has
//! exactly one source of truth for each fact.

use crate::error::{AdmissionError, AdmissionResult};
use crate::types::{
    Booking, BookingId, BookingStatus, BuyerIdentity, Money, PassClass, PassClassId, Payment,
    PaymentId, PaymentStatus, Ticket, TicketCode, TicketId, Tontine,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};

/// In-memory booking ledger
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ledger {
    /// Pass classes by identifier
    pub catalog: BTreeMap<PassClassId, PassClass>,
    /// Bookings by identifier
    pub bookings: HashMap<BookingId, Booking>,
    /// Payment attempts by identifier
    pub payments: HashMap<PaymentId, Payment>,
    /// Installment progress by booking
    pub tontines: HashMap<BookingId, Tontine>,
    /// Generated identities by booking
    pub identities: HashMap<BookingId, BuyerIdentity>,
    tickets: HashMap<TicketId, Ticket>,
    ticket_by_booking: HashMap<BookingId, TicketId>,
    ticket_by_code: HashMap<TicketCode, TicketId>,
}

impl Ledger {
    /// Creates an empty ledger over a catalog
    #[must_use]
    pub fn new(catalog: impl IntoIterator<Item = PassClass>) -> Self {
        Self {
            catalog: catalog
                .into_iter()
                .map(|class| (class.id.clone(), class))
                .collect(),
            ..Self::default()
        }
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    /// Looks up a pass class
    ///
    /// # Errors
    ///
    /// [`AdmissionError::PassClassNotFound`] if the id is unknown.
    pub fn pass_class(&self, id: &PassClassId) -> AdmissionResult<&PassClass> {
        self.catalog
            .get(id)
            .ok_or_else(|| AdmissionError::PassClassNotFound(id.clone()))
    }

    /// Looks up a booking
    ///
    /// # Errors
    ///
    /// [`AdmissionError::BookingNotFound`] if the id is unknown.
    pub fn booking(&self, id: &BookingId) -> AdmissionResult<&Booking> {
        self.bookings
            .get(id)
            .ok_or(AdmissionError::BookingNotFound(*id))
    }

    /// Looks up a payment
    ///
    /// # Errors
    ///
    /// [`AdmissionError::PaymentNotFound`] if the id is unknown.
    pub fn payment(&self, id: &PaymentId) -> AdmissionResult<&Payment> {
        self.payments
            .get(id)
            .ok_or(AdmissionError::PaymentNotFound(*id))
    }

    /// Payments recorded against a booking, oldest first
    #[must_use]
    pub fn payments_for(&self, booking_id: &BookingId) -> Vec<&Payment> {
        let mut payments: Vec<&Payment> = self
            .payments
            .values()
            .filter(|p| p.booking_id == *booking_id)
            .collect();
        payments.sort_by_key(|p| (p.created_at, p.id));
        payments
    }

    /// Sum of the booking's Success payments, recomputed from history
    ///
    /// # Errors
    ///
    /// [`AdmissionError::InvariantViolation`] if the sum overflows.
    pub fn confirmed_total(&self, booking_id: &BookingId) -> AdmissionResult<Money> {
        Money::checked_sum(
            self.payments
                .values()
                .filter(|p| p.booking_id == *booking_id && p.status == PaymentStatus::Success)
                .map(|p| p.amount),
        )
        .ok_or_else(|| AdmissionError::overflow("summing confirmed payments"))
    }

    /// Whether any payment for the booking awaits a decision
    #[must_use]
    pub fn has_pending_payment(&self, booking_id: &BookingId) -> bool {
        self.payments
            .values()
            .any(|p| p.booking_id == *booking_id && p.status == PaymentStatus::Pending)
    }

    // ------------------------------------------------------------------
    // Inventory counts
    // ------------------------------------------------------------------

    /// Bookings of a class in a seat-consuming status (Tontine or Paid)
    #[must_use]
    pub fn sold(&self, pass_class: &PassClassId) -> u32 {
        let count = self
            .bookings
            .values()
            .filter(|b| b.pass_class == *pass_class && b.status.consumes_inventory())
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Pending bookings of a class currently holding a seat.
    ///
    /// A Pending booking holds while it is younger than `hold_window`, or
    /// while one of its undecided payments is younger than `hold_window`.
    /// An unreviewed proof never locks a seat for longer than that.
    #[must_use]
    pub fn held(&self, pass_class: &PassClassId, now: DateTime<Utc>, hold_window: Duration) -> u32 {
        let awaiting: HashSet<BookingId> = self
            .payments
            .values()
            .filter(|p| p.status == PaymentStatus::Pending && now - p.created_at < hold_window)
            .map(|p| p.booking_id)
            .collect();

        let count = self
            .bookings
            .values()
            .filter(|b| b.pass_class == *pass_class && b.status == BookingStatus::Pending)
            .filter(|b| now - b.created_at < hold_window || awaiting.contains(&b.id))
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Bookings of a class in any status except Cancelled
    #[must_use]
    pub fn bookings_of_class(&self, pass_class: &PassClassId) -> usize {
        self.bookings
            .values()
            .filter(|b| b.pass_class == *pass_class && b.status != BookingStatus::Cancelled)
            .count()
    }

    // ------------------------------------------------------------------
    // Tickets
    // ------------------------------------------------------------------

    /// All issued tickets
    pub fn tickets(&self) -> impl Iterator<Item = &Ticket> {
        self.tickets.values()
    }

    /// Ticket issued for a booking, if any
    #[must_use]
    pub fn ticket_for_booking(&self, booking_id: &BookingId) -> Option<&Ticket> {
        self.ticket_by_booking
            .get(booking_id)
            .and_then(|id| self.tickets.get(id))
    }

    /// Ticket with the given code, if any
    #[must_use]
    pub fn ticket_by_code(&self, code: &TicketCode) -> Option<&Ticket> {
        self.ticket_by_code
            .get(code)
            .and_then(|id| self.tickets.get(id))
    }

    pub(crate) fn ticket_mut(&mut self, id: &TicketId) -> Option<&mut Ticket> {
        self.tickets.get_mut(id)
    }

    /// Inserts a ticket and maintains the booking and code indexes.
    ///
    /// A second ticket for the same booking is refused and the existing one kept.
    pub(crate) fn insert_ticket(&mut self, ticket: Ticket) -> bool {
        if self.ticket_by_booking.contains_key(&ticket.booking_id)
            || self.ticket_by_code.contains_key(&ticket.code)
        {
            return false;
        }
        self.ticket_by_booking.insert(ticket.booking_id, ticket.id);
        self.ticket_by_code.insert(ticket.code.clone(), ticket.id);
        self.tickets.insert(ticket.id, ticket);
        true
    }

    /// Number of issued tickets
    #[must_use]
    pub fn ticket_count(&self) -> usize {
        self.tickets.len()
    }

    /// Drops every booking-derived record; the catalog survives
    pub(crate) fn clear_bookings(&mut self) {
        self.tickets.clear();
        self.ticket_by_booking.clear();
        self.ticket_by_code.clear();
        self.payments.clear();
        self.tontines.clear();
        self.identities.clear();
        self.bookings.clear();
    }
}
