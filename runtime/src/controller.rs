//! The admission controller: façade and unit of atomicity.
//!
//! The ledger lives behind a single `tokio::sync::RwLock`. Every write runs
//! its reducers against a draft copy while holding the write guard and
//! commits the draft together with its journal entries only if every step
//! succeeded. A failed step leaves the shared ledger untouched, so callers
//! never observe half of a decision.
//!
//! Reads take the read guard and return owned views.
//!
//! The draft is a full clone of the ledger, so a write costs time linear in
//! the number of bookings, payments and tickets held. That fits one event's
//! worth of passes; a larger ledger would need per-step undo instead.

use crate::identity::{IdentityError, IdentityProvider, IdentityRequest};
use crate::metrics;
use crate::views::{
    BookingStatusView, ClassStats, Decision, DecisionOutcome, LedgerStats, PendingPaymentView,
    ResetSummary, ScanReceipt, TicketLookup, TicketView, TontineSummary,
};
use soulpass_core::aggregates::booking::{BookingAction, BookingReducer};
use soulpass_core::aggregates::inventory::{Availability, InventoryAction, InventoryReducer};
use soulpass_core::aggregates::payment::{PaymentAction, PaymentReducer};
use soulpass_core::aggregates::ticket::{TicketAction, TicketReducer};
use soulpass_core::aggregates::tontine::{ClaimCheck, TontineAction, TontineProgress, TontineReducer};
use soulpass_core::environment::LedgerEnvironment;
use soulpass_core::reducer::Reducer;
use soulpass_core::types::{
    Booking, BookingId, BookingPhase, BookingStatus, BuyerId, BuyerIdentity, Capacity, Money,
    PassClass, PassClassId, Payment, PaymentChannel, PaymentId, PaymentStatus, Ticket, TicketCode,
    TontineStatus,
};
use soulpass_core::{AdmissionError, AdmissionResult, ErrorKind, JournalEntry, Ledger, LedgerEvent};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Number of tickets listed on the dashboard
const RECENT_TICKETS: usize = 10;

/// Ledger plus its journal, guarded together
#[derive(Debug, Default)]
struct LedgerStore {
    ledger: Ledger,
    journal: Vec<JournalEntry>,
}

impl LedgerStore {
    fn commit(&mut self, draft: Ledger, events: Vec<LedgerEvent>, env: &LedgerEnvironment) {
        let recorded_at = env.clock.now();
        let mut sequence = self.journal.last().map_or(0, |entry| entry.sequence);
        self.journal.extend(events.into_iter().map(|event| {
            sequence += 1;
            JournalEntry {
                sequence,
                recorded_at,
                event,
            }
        }));
        self.ledger = draft;
    }
}

/// One serialized unit of work against a draft ledger
pub(crate) struct UnitOfWork<'a> {
    ledger: &'a mut Ledger,
    env: &'a LedgerEnvironment,
    events: Vec<LedgerEvent>,
}

impl UnitOfWork<'_> {
    /// Runs a reducer against the draft and collects its events
    fn dispatch<R>(&mut self, reducer: &R, action: R::Action) -> AdmissionResult<()>
    where
        R: Reducer<
                State = Ledger,
                Event = LedgerEvent,
                Error = AdmissionError,
                Environment = LedgerEnvironment,
            >,
    {
        let events = reducer.reduce(self.ledger, action, self.env)?;
        self.events.extend(events);
        Ok(())
    }

    fn ledger(&self) -> &Ledger {
        self.ledger
    }
}

/// Payment proof submitted by a buyer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSubmission {
    /// Booking paid toward
    pub booking_id: BookingId,
    /// Operator used
    pub channel: PaymentChannel,
    /// Sender phone number
    pub sender_ref: String,
    /// Declared amount
    pub amount: Money,
}

/// Entry point for checkout, operator console and door scanning.
///
/// Cheap to clone; clones share the same ledger.
#[derive(Clone)]
pub struct AdmissionController {
    store: Arc<RwLock<LedgerStore>>,
    env: LedgerEnvironment,
    identity: Option<Arc<dyn IdentityProvider>>,
}

impl AdmissionController {
    /// Creates a controller over an empty ledger for `catalog`
    #[must_use]
    pub fn new(catalog: impl IntoIterator<Item = PassClass>, env: LedgerEnvironment) -> Self {
        Self {
            store: Arc::new(RwLock::new(LedgerStore {
                ledger: Ledger::new(catalog),
                journal: Vec::new(),
            })),
            env,
            identity: None,
        }
    }

    /// Attaches an identity provider
    #[must_use]
    pub fn with_identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(provider);
        self
    }

    /// The environment reducers run with
    #[must_use]
    pub const fn environment(&self) -> &LedgerEnvironment {
        &self.env
    }

    // ========================================================================
    // Transaction plumbing
    // ========================================================================

    async fn transact<T, F>(&self, operation: &'static str, work: F) -> AdmissionResult<T>
    where
        F: FnOnce(&mut UnitOfWork<'_>) -> AdmissionResult<T>,
    {
        let started = Instant::now();
        let mut store = self.store.write().await;
        tracing::trace!(operation, "Acquired write lock on ledger");

        let mut draft = store.ledger.clone();
        let mut unit = UnitOfWork {
            ledger: &mut draft,
            env: &self.env,
            events: Vec::new(),
        };
        let result = work(&mut unit);
        let events = unit.events;

        match result {
            Ok(value) => {
                tracing::debug!(operation, events = events.len(), "Committing transaction");
                store.commit(draft, events, &self.env);
                metrics::record_transaction_duration(operation, started.elapsed());
                Ok(value)
            }
            Err(error) => {
                drop(store);
                Self::log_rejection(operation, &error);
                metrics::record_rejection(operation, error.code());
                Err(error)
            }
        }
    }

    fn log_rejection(operation: &'static str, error: &AdmissionError) {
        match error.kind() {
            ErrorKind::Internal => {
                tracing::error!(operation, code = error.code(), %error, "Transaction rolled back");
            }
            ErrorKind::Conflict | ErrorKind::Unauthorized => {
                tracing::warn!(operation, code = error.code(), %error, "Operation rejected");
            }
            ErrorKind::NotFound | ErrorKind::Invalid => {
                tracing::debug!(operation, code = error.code(), %error, "Operation rejected");
            }
        }
    }

    /// Read current ledger state via a closure
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&Ledger) -> T,
    {
        let store = self.store.read().await;
        f(&store.ledger)
    }

    /// Rejections of the admin gate are counted like any other
    fn gate(operation: &'static str, authorized: bool) -> AdmissionResult<()> {
        if authorized {
            return Ok(());
        }
        let error = AdmissionError::Unauthorized;
        Self::log_rejection(operation, &error);
        metrics::record_rejection(operation, error.code());
        Err(error)
    }

    // ========================================================================
    // Inventory
    // ========================================================================

    /// Seats of a pass class: capacity, sold, held and remaining
    ///
    /// # Errors
    ///
    /// [`AdmissionError::PassClassNotFound`] for unknown classes.
    #[tracing::instrument(skip(self), fields(pass_class = %pass_class))]
    pub async fn check_availability(&self, pass_class: &PassClassId) -> AdmissionResult<Availability> {
        let now = self.env.clock.now();
        self.state(|ledger| InventoryReducer::availability(ledger, pass_class, now, &self.env.policy))
            .await
    }

    /// Availability of every pass class
    pub async fn list_availability(&self) -> Vec<Availability> {
        let now = self.env.clock.now();
        self.state(|ledger| InventoryReducer::list_availability(ledger, now, &self.env.policy))
            .await
    }

    /// Changes the capacity of a pass class (admin)
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::Unauthorized`] when the gate denied the call
    /// - [`AdmissionError::PassClassNotFound`] for unknown classes
    /// - [`AdmissionError::InvalidCapacity`] below the seats already sold
    #[tracing::instrument(skip(self), fields(pass_class = %pass_class))]
    pub async fn set_capacity(
        &self,
        authorized: bool,
        pass_class: &PassClassId,
        capacity: Capacity,
    ) -> AdmissionResult<Availability> {
        Self::gate("set_capacity", authorized)?;
        let now = self.env.clock.now();
        let availability = self
            .transact("set_capacity", |unit| {
                unit.dispatch(
                    &InventoryReducer::new(),
                    InventoryAction::SetCapacity {
                        pass_class: pass_class.clone(),
                        capacity,
                    },
                )?;
                InventoryReducer::availability(unit.ledger(), pass_class, now, &unit.env.policy)
            })
            .await?;
        tracing::info!(capacity = capacity.seats(), "Capacity updated");
        Ok(availability)
    }

    /// Changes the price offered to new bookings (admin)
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::Unauthorized`] when the gate denied the call
    /// - [`AdmissionError::PassClassNotFound`] for unknown classes
    /// - [`AdmissionError::InvalidAmount`] for a zero price
    #[tracing::instrument(skip(self), fields(pass_class = %pass_class))]
    pub async fn set_unit_price(
        &self,
        authorized: bool,
        pass_class: &PassClassId,
        unit_price: Money,
    ) -> AdmissionResult<PassClass> {
        Self::gate("set_unit_price", authorized)?;
        let class = self
            .transact("set_unit_price", |unit| {
                unit.dispatch(
                    &InventoryReducer::new(),
                    InventoryAction::SetUnitPrice {
                        pass_class: pass_class.clone(),
                        unit_price,
                    },
                )?;
                unit.ledger().pass_class(pass_class).cloned()
            })
            .await?;
        tracing::info!(unit_price = %unit_price, "Unit price updated");
        Ok(class)
    }

    // ========================================================================
    // Bookings
    // ========================================================================

    /// Reserves a pass at the price the buyer saw
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::PassClassNotFound`] for unknown classes
    /// - [`AdmissionError::PriceMismatch`] if the catalog price changed
    /// - [`AdmissionError::SoldOut`] if no seat is open
    #[tracing::instrument(skip(self), fields(pass_class = %pass_class))]
    pub async fn create_booking(
        &self,
        buyer: BuyerId,
        pass_class: &PassClassId,
        declared_price: Money,
    ) -> AdmissionResult<Booking> {
        let booking_id = BookingId::new();
        let booking = self
            .transact("create_booking", |unit| {
                unit.dispatch(
                    &BookingReducer::new(),
                    BookingAction::CreateBooking {
                        booking_id,
                        buyer,
                        pass_class: pass_class.clone(),
                        declared_price,
                    },
                )?;
                unit.ledger().booking(&booking_id).cloned()
            })
            .await?;

        tracing::info!(booking_id = %booking.id, total = %booking.total_amount, "Booking created");
        metrics::record_booking_created();
        Ok(booking)
    }

    /// Cancels a Pending or Tontine booking (admin)
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::Unauthorized`] when the gate denied the call
    /// - [`AdmissionError::BookingNotFound`] for unknown bookings
    /// - [`AdmissionError::InvalidTransition`] for Paid or Cancelled bookings
    #[tracing::instrument(skip(self, reason))]
    pub async fn cancel_booking(
        &self,
        authorized: bool,
        booking_id: BookingId,
        reason: String,
    ) -> AdmissionResult<Booking> {
        Self::gate("cancel_booking", authorized)?;
        let booking = self
            .transact("cancel_booking", |unit| {
                unit.dispatch(
                    &BookingReducer::new(),
                    BookingAction::CancelBooking { booking_id, reason },
                )?;
                unit.ledger().booking(&booking_id).cloned()
            })
            .await?;
        tracing::info!(booking_id = %booking_id, "Booking cancelled");
        Ok(booking)
    }

    /// Buyer-facing status of a booking
    ///
    /// # Errors
    ///
    /// [`AdmissionError::BookingNotFound`] for unknown bookings.
    #[tracing::instrument(skip(self))]
    pub async fn booking_status(&self, booking_id: BookingId) -> AdmissionResult<BookingStatusView> {
        self.state(|ledger| {
            let booking = ledger.booking(&booking_id)?;
            let amount_paid = ledger.confirmed_total(&booking_id)?;
            let has_pending_payment = ledger.has_pending_payment(&booking_id);
            Ok(BookingStatusView {
                booking_id,
                pass_class: booking.pass_class.clone(),
                status: booking.status,
                phase: BookingPhase::derive(booking.status, has_pending_payment),
                total_amount: booking.total_amount,
                amount_paid,
                remaining_amount: booking.total_amount.saturating_sub(amount_paid),
                has_pending_payment,
                ticket_code: ledger
                    .ticket_for_booking(&booking_id)
                    .map(|ticket| ticket.code.clone()),
                tontine: ledger.tontines.get(&booking_id).cloned(),
                identity: ledger.identities.get(&booking_id).cloned(),
                payments: ledger
                    .payments_for(&booking_id)
                    .into_iter()
                    .cloned()
                    .collect(),
            })
        })
        .await
    }

    // ========================================================================
    // Payments
    // ========================================================================

    /// Records a payment proof awaiting operator review
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::InvalidAmount`] for a zero amount
    /// - [`AdmissionError::BookingNotFound`] for unknown bookings
    /// - [`AdmissionError::InvalidSender`] for a blank sender phone
    /// - [`AdmissionError::BookingClosed`] for Paid or Cancelled bookings
    /// - [`AdmissionError::ExceedsBalance`] above the remaining balance
    #[tracing::instrument(skip(self, submission), fields(booking_id = %submission.booking_id))]
    pub async fn submit_payment(&self, submission: PaymentSubmission) -> AdmissionResult<Payment> {
        let payment_id = PaymentId::new();
        let PaymentSubmission {
            booking_id,
            channel,
            sender_ref,
            amount,
        } = submission;

        let payment = self
            .transact("submit_payment", |unit| {
                unit.dispatch(
                    &PaymentReducer::new(),
                    PaymentAction::SubmitPayment {
                        payment_id,
                        booking_id,
                        channel,
                        sender_ref,
                        amount,
                    },
                )?;
                unit.ledger().payment(&payment_id).cloned()
            })
            .await?;

        tracing::info!(
            payment_id = %payment.id,
            amount = %payment.amount,
            channel = %payment.channel,
            "Payment submitted"
        );
        metrics::record_payment_submitted();
        Ok(payment)
    }

    /// Applies the operator's decision on a pending payment.
    ///
    /// Approval flips the payment to Success, recomputes the installment
    /// cache from every confirmed payment, and settles the booking, issuing
    /// its ticket once the total is covered. All of it commits or none of it
    /// does.
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::Unauthorized`] when the gate denied the call
    /// - [`AdmissionError::PaymentNotFound`] for unknown payments
    /// - [`AdmissionError::AlreadyDecided`] if the payment is no longer Pending
    /// - [`AdmissionError::BookingClosed`] when approving for a closed booking
    /// - [`AdmissionError::ExceedsBalance`] when approval would overpay
    /// - [`AdmissionError::SoldOut`] when a Pending booking has no seat left
    #[tracing::instrument(skip(self, decision), fields(decision = decision.label()))]
    pub async fn decide_payment(
        &self,
        authorized: bool,
        payment_id: PaymentId,
        decision: Decision,
    ) -> AdmissionResult<DecisionOutcome> {
        Self::gate("decide_payment", authorized)?;
        let label = decision.label();
        let now = self.env.clock.now();

        let outcome = self
            .transact("decide_payment", |unit| match decision {
                Decision::Reject { note } => {
                    unit.dispatch(
                        &PaymentReducer::new(),
                        PaymentAction::RejectPayment { payment_id, note },
                    )?;
                    let payment = unit.ledger().payment(&payment_id)?.clone();
                    Ok(DecisionOutcome::Rejected { payment })
                }
                Decision::Approve => {
                    unit.dispatch(
                        &PaymentReducer::new(),
                        PaymentAction::ApprovePayment { payment_id },
                    )?;
                    let booking_id = unit.ledger().payment(&payment_id)?.booking_id;
                    unit.dispatch(&TontineReducer::new(), TontineAction::Recompute { booking_id })?;
                    unit.dispatch(&BookingReducer::new(), BookingAction::Settle { booking_id })?;

                    let ledger = unit.ledger();
                    let payment = ledger.payment(&payment_id)?.clone();
                    if ledger.booking(&booking_id)?.status == BookingStatus::Paid {
                        let ticket = ledger
                            .ticket_for_booking(&booking_id)
                            .cloned()
                            .ok_or_else(|| {
                                AdmissionError::InvariantViolation(format!(
                                    "booking {booking_id} is paid without a ticket"
                                ))
                            })?;
                        Ok(DecisionOutcome::Paid { payment, ticket })
                    } else {
                        let progress = TontineReducer::progress(
                            ledger,
                            &booking_id,
                            unit.env.policy.box_unit,
                            None,
                            now,
                        )?;
                        Ok(DecisionOutcome::Progress { payment, progress })
                    }
                }
            })
            .await?;

        match &outcome {
            DecisionOutcome::Rejected { payment } => {
                tracing::info!(
                    payment_id = %payment_id,
                    booking_id = %payment.booking_id,
                    note = payment.note.as_deref().unwrap_or_default(),
                    "Payment rejected"
                );
                metrics::record_payment_decision(label, None);
            }
            DecisionOutcome::Progress { payment, progress } => {
                tracing::info!(
                    payment_id = %payment_id,
                    booking_id = %payment.booking_id,
                    amount_paid = %progress.amount_paid,
                    remaining = %progress.remaining_amount,
                    "Installment confirmed"
                );
                metrics::record_payment_decision(label, Some(payment.amount.units()));
            }
            DecisionOutcome::Paid { payment, ticket } => {
                tracing::info!(
                    payment_id = %payment_id,
                    booking_id = %payment.booking_id,
                    ticket_code = %ticket.code,
                    "Booking paid in full, ticket issued"
                );
                metrics::record_payment_decision(label, Some(payment.amount.units()));
                metrics::record_ticket_issued();
            }
        }
        Ok(outcome)
    }

    /// Pending payments, newest first, with booking context (admin)
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::Unauthorized`] when the gate denied the call
    /// - [`AdmissionError::InvariantViolation`] if a sum overflows
    pub async fn pending_payments(&self, authorized: bool) -> AdmissionResult<Vec<PendingPaymentView>> {
        Self::gate("pending_payments", authorized)?;
        self.state(|ledger| {
            let mut pending: Vec<&Payment> = ledger
                .payments
                .values()
                .filter(|p| p.status == PaymentStatus::Pending)
                .collect();
            pending.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

            pending
                .into_iter()
                .map(|payment| {
                    let booking = ledger.booking(&payment.booking_id)?;
                    let amount_paid = ledger.confirmed_total(&booking.id)?;
                    let remaining = booking.total_amount.saturating_sub(amount_paid);
                    Ok(PendingPaymentView {
                        payment: payment.clone(),
                        pass_class: booking.pass_class.clone(),
                        booking_status: booking.status,
                        total_amount: booking.total_amount,
                        amount_paid,
                        is_tontine: booking.status == BookingStatus::Tontine
                            || payment.amount < remaining,
                        remaining_after_approval: remaining.saturating_sub(payment.amount),
                    })
                })
                .collect()
        })
        .await
    }

    /// Authoritative installment progress, optionally checking a declared box count
    ///
    /// # Errors
    ///
    /// [`AdmissionError::BookingNotFound`] for unknown bookings.
    pub async fn tontine_progress(
        &self,
        booking_id: BookingId,
        declared_boxes: Option<u64>,
    ) -> AdmissionResult<TontineProgress> {
        let now = self.env.clock.now();
        let progress = self
            .state(|ledger| {
                TontineReducer::progress(
                    ledger,
                    &booking_id,
                    self.env.policy.box_unit,
                    declared_boxes,
                    now,
                )
            })
            .await?;
        if let Some(ClaimCheck::Unconfirmed {
            declared,
            confirmed,
        }) = progress.claim
        {
            tracing::warn!(
                booking_id = %booking_id,
                declared,
                confirmed,
                "Declared boxes exceed confirmed payments"
            );
        }
        Ok(progress)
    }

    // ========================================================================
    // Tickets
    // ========================================================================

    /// Issues the ticket of a fully-paid booking, or returns the existing one (admin)
    ///
    /// Issuance goes through the booking settlement, so a booking still marked
    /// Pending or Tontine moves to Paid in the same unit of work.
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::Unauthorized`] when the gate denied the call
    /// - [`AdmissionError::BookingNotFound`] for unknown bookings
    /// - [`AdmissionError::NotFullyPaid`] while money is still owed
    #[tracing::instrument(skip(self))]
    pub async fn issue_ticket(&self, authorized: bool, booking_id: BookingId) -> AdmissionResult<Ticket> {
        Self::gate("issue_ticket", authorized)?;
        let (ticket, freshly_issued) = self
            .transact("issue_ticket", |unit| {
                let booking = unit.ledger().booking(&booking_id)?;
                let paid = unit.ledger().confirmed_total(&booking_id)?;
                if paid < booking.total_amount {
                    return Err(AdmissionError::NotFullyPaid {
                        paid,
                        total: booking.total_amount,
                    });
                }
                let existed = unit.ledger().ticket_for_booking(&booking_id).is_some();
                unit.dispatch(&BookingReducer::new(), BookingAction::Settle { booking_id })?;
                unit.ledger()
                    .ticket_for_booking(&booking_id)
                    .cloned()
                    .map(|ticket| (ticket, !existed))
                    .ok_or_else(|| AdmissionError::TicketNotFound(booking_id.to_string()))
            })
            .await?;

        if freshly_issued {
            tracing::info!(booking_id = %booking_id, ticket_code = %ticket.code, "Ticket issued");
            metrics::record_ticket_issued();
        }
        Ok(ticket)
    }

    /// Accepts a ticket at the door, exactly once.
    ///
    /// `scanned` is either a printable code or a sealed QR payload; payloads
    /// are verified before the ledger is consulted.
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::ForgedPayload`] if a payload fails verification
    /// - [`AdmissionError::TicketNotFound`] for unknown codes
    /// - [`AdmissionError::TicketVoided`] for voided tickets
    /// - [`AdmissionError::AlreadyScanned`] with the original scan time
    #[tracing::instrument(skip(self, scanned))]
    pub async fn validate_ticket(&self, scanned: &str) -> AdmissionResult<ScanReceipt> {
        let code = match self.resolve_scan(scanned) {
            Ok(code) => code,
            Err(error) => {
                metrics::record_ticket_scan("forged");
                Self::log_rejection("validate_ticket", &error);
                return Err(error);
            }
        };

        let result = self
            .transact("validate_ticket", |unit| {
                unit.dispatch(
                    &TicketReducer::new(),
                    TicketAction::ValidateTicket { code: code.clone() },
                )?;
                let ledger = unit.ledger();
                let ticket = TicketReducer::find_by_code(ledger, &code)?;
                let booking = ledger.booking(&ticket.booking_id)?;
                let scanned_at = ticket.scanned_at.ok_or_else(|| {
                    AdmissionError::InvariantViolation(format!("ticket {code} scan was not recorded"))
                })?;
                Ok(ScanReceipt {
                    code: code.clone(),
                    pass_class: booking.pass_class.clone(),
                    holder: ledger
                        .identities
                        .get(&booking.id)
                        .map(|identity| identity.display_name.clone()),
                    scanned_at,
                })
            })
            .await;

        let outcome = match &result {
            Ok(_) => "valid",
            Err(AdmissionError::AlreadyScanned { .. }) => "already_scanned",
            Err(AdmissionError::TicketVoided(_)) => "voided",
            Err(AdmissionError::TicketNotFound(_)) => "not_found",
            Err(_) => "error",
        };
        metrics::record_ticket_scan(outcome);
        if let Ok(receipt) = &result {
            tracing::info!(ticket_code = %receipt.code, scanned_at = %receipt.scanned_at, "Ticket admitted");
        }
        result
    }

    fn resolve_scan(&self, scanned: &str) -> AdmissionResult<TicketCode> {
        let scanned = scanned.trim();
        if scanned.contains('.') {
            self.env
                .sealer
                .open(scanned)
                .map(|payload| payload.code)
                .map_err(|e| AdmissionError::ForgedPayload(e.to_string()))
        } else {
            Ok(TicketCode::new(scanned))
        }
    }

    /// Invalidates a ticket; voiding twice is a no-op (admin)
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::Unauthorized`] when the gate denied the call
    /// - [`AdmissionError::TicketNotFound`] for unknown codes
    #[tracing::instrument(skip(self, reason), fields(code = %code))]
    pub async fn void_ticket(
        &self,
        authorized: bool,
        code: &TicketCode,
        reason: String,
    ) -> AdmissionResult<Ticket> {
        Self::gate("void_ticket", authorized)?;
        let ticket = self
            .transact("void_ticket", |unit| {
                unit.dispatch(
                    &TicketReducer::new(),
                    TicketAction::VoidTicket {
                        code: code.clone(),
                        reason,
                    },
                )?;
                TicketReducer::find_by_code(unit.ledger(), code).cloned()
            })
            .await?;
        tracing::info!(reason = ticket.void_reason.as_deref().unwrap_or_default(), "Ticket voided");
        Ok(ticket)
    }

    /// Looks up a ticket with its booking context
    ///
    /// # Errors
    ///
    /// [`AdmissionError::TicketNotFound`] if no ticket matches.
    pub async fn find_ticket(&self, lookup: TicketLookup) -> AdmissionResult<TicketView> {
        self.state(|ledger| {
            let ticket = match &lookup {
                TicketLookup::Code(code) => TicketReducer::find_by_code(ledger, code)?,
                TicketLookup::Booking(booking_id) => ledger
                    .ticket_for_booking(booking_id)
                    .ok_or_else(|| AdmissionError::TicketNotFound(booking_id.to_string()))?,
            };
            let booking = ledger.booking(&ticket.booking_id)?;
            let pass_name = ledger.pass_class(&booking.pass_class)?.name.clone();
            Ok(TicketView {
                ticket: ticket.clone(),
                booking: booking.clone(),
                pass_name,
                identity: ledger.identities.get(&booking.id).cloned(),
            })
        })
        .await
    }

    // ========================================================================
    // Identity
    // ========================================================================

    /// Generates a display identity and upserts it onto the booking.
    ///
    /// The provider is awaited with no ledger guard held.
    ///
    /// # Errors
    ///
    /// - [`IdentityError::Unavailable`] without a provider
    /// - [`IdentityError::Ledger`] for unknown bookings, or
    ///   [`AdmissionError::IdentityLocked`] once a ticket has been issued
    /// - provider failures as [`IdentityError::Provider`] or [`IdentityError::Malformed`]
    #[tracing::instrument(skip(self, request))]
    pub async fn generate_identity(
        &self,
        booking_id: BookingId,
        request: IdentityRequest,
    ) -> Result<BuyerIdentity, IdentityError> {
        let provider = self.identity.as_ref().ok_or(IdentityError::Unavailable)?;
        self.state(|ledger| -> AdmissionResult<()> {
            ledger.booking(&booking_id)?;
            match ledger.ticket_for_booking(&booking_id) {
                Some(ticket) => Err(AdmissionError::IdentityLocked(ticket.code.clone())),
                None => Ok(()),
            }
        })
        .await?;

        let identity = provider.generate(&request).await?;

        self.transact("assign_identity", |unit| {
            unit.dispatch(
                &BookingReducer::new(),
                BookingAction::AssignIdentity {
                    booking_id,
                    identity: identity.clone(),
                },
            )
        })
        .await?;

        tracing::info!(display_name = %identity.display_name, "Identity assigned");
        Ok(identity)
    }

    // ========================================================================
    // Administration
    // ========================================================================

    /// Dashboard figures (admin)
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::Unauthorized`] when the gate denied the call
    /// - [`AdmissionError::InvariantViolation`] if revenue overflows
    pub async fn stats(&self, authorized: bool) -> AdmissionResult<LedgerStats> {
        Self::gate("stats", authorized)?;
        self.state(|ledger| {
            let count_status = |status: BookingStatus| {
                ledger
                    .bookings
                    .values()
                    .filter(|b| b.status == status)
                    .count()
            };

            let by_class = ledger
                .catalog
                .values()
                .map(|class| ClassStats {
                    pass_class: class.id.clone(),
                    bookings: ledger.bookings_of_class(&class.id),
                    sold: ledger.sold(&class.id),
                    capacity: class.capacity.seats(),
                })
                .collect();

            let total_revenue = Money::checked_sum(
                ledger
                    .payments
                    .values()
                    .filter(|p| p.status == PaymentStatus::Success)
                    .map(|p| p.amount),
            )
            .ok_or_else(|| AdmissionError::overflow("summing revenue"))?;

            let mut recent_tickets: Vec<Ticket> = ledger.tickets().cloned().collect();
            recent_tickets.sort_by(|a, b| b.issued_at.cmp(&a.issued_at).then(b.id.cmp(&a.id)));
            recent_tickets.truncate(RECENT_TICKETS);

            let mut tontines_in_progress: Vec<TontineSummary> = ledger
                .tontines
                .values()
                .filter(|t| t.status == TontineStatus::InProgress)
                .filter_map(|t| {
                    let booking = ledger.bookings.get(&t.booking_id)?;
                    (booking.status == BookingStatus::Tontine).then(|| TontineSummary {
                        booking_id: t.booking_id,
                        pass_class: booking.pass_class.clone(),
                        amount_paid: t.amount_paid,
                        remaining_amount: t.remaining_amount,
                        paid_boxes: t.paid_boxes,
                        total_boxes: t.total_boxes,
                    })
                })
                .collect();
            tontines_in_progress.sort_by_key(|t| t.booking_id);

            Ok(LedgerStats {
                total_tickets: ledger.ticket_count(),
                paid_bookings: count_status(BookingStatus::Paid),
                tontine_bookings: count_status(BookingStatus::Tontine),
                by_class,
                total_revenue,
                recent_tickets,
                tontines_in_progress,
            })
        })
        .await
    }

    /// Deletes every booking, payment, tontine, identity and ticket (admin).
    ///
    /// The catalog, including edited capacities and prices, survives.
    ///
    /// # Errors
    ///
    /// [`AdmissionError::Unauthorized`] when the gate denied the call.
    #[tracing::instrument(skip(self))]
    pub async fn reset(&self, authorized: bool) -> AdmissionResult<ResetSummary> {
        Self::gate("reset", authorized)?;
        let reset_at = self.env.clock.now();
        let summary = self
            .transact("reset", |unit| {
                let summary = ResetSummary {
                    bookings: unit.ledger.bookings.len(),
                    payments: unit.ledger.payments.len(),
                    tickets: unit.ledger.ticket_count(),
                };
                let event = LedgerEvent::LedgerReset { reset_at };
                event.apply(unit.ledger);
                unit.events.push(event);
                Ok(summary)
            })
            .await?;
        tracing::warn!(
            bookings = summary.bookings,
            payments = summary.payments,
            tickets = summary.tickets,
            "Ledger reset"
        );
        Ok(summary)
    }

    // ========================================================================
    // Journal
    // ========================================================================

    /// Every committed event, in commit order
    pub async fn journal(&self) -> Vec<JournalEntry> {
        self.store.read().await.journal.clone()
    }

    /// Owned copy of the current ledger
    pub async fn snapshot(&self) -> Ledger {
        self.state(Clone::clone).await
    }
}

impl std::fmt::Debug for AdmissionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionController")
            .field("env", &self.env)
            .field("identity", &self.identity.is_some())
            .finish_non_exhaustive()
    }
}
