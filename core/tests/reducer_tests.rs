//! Given-When-Then tests for the ledger reducers
//!
//! Each test seeds a ledger, runs one command through a reducer, and checks
//! the emitted events, the rejection, and the resulting state.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use chrono::Duration;
use soulpass_core::aggregates::booking::{BookingAction, BookingReducer};
use soulpass_core::aggregates::payment::{DEFAULT_REJECTION_NOTE, PaymentAction, PaymentReducer};
use soulpass_core::aggregates::ticket::{TicketAction, TicketReducer};
use soulpass_core::aggregates::tontine::{TontineAction, TontineReducer};
use soulpass_core::environment::{AdmissionPolicy, Clock, LedgerEnvironment};
use soulpass_core::payload::PayloadSealer;
use soulpass_core::reducer::Reducer;
use soulpass_core::types::{
    Booking, BookingId, BookingStatus, BuyerId, Money, PassClassId, Payment, PaymentChannel,
    PaymentId, PaymentStatus, TicketCode, TontineStatus,
};
use soulpass_core::{AdmissionError, Ledger};
use soulpass_testing::fixtures::{self, NEON_PRICE, SEOUL_PRICE};
use soulpass_testing::mocks::{ConstantTicketCodes, epoch};
use soulpass_testing::reducer_test::assertions;
use soulpass_testing::{ReducerTest, test_clock};
use std::sync::Arc;

// ============================================================================
// Test Fixtures
// ============================================================================

fn seed_booking(ledger: &mut Ledger, pass_class: PassClassId, status: BookingStatus) -> BookingId {
    let price = ledger.pass_class(&pass_class).unwrap().unit_price;
    let booking = Booking {
        id: BookingId::new(),
        buyer: BuyerId::new(),
        pass_class,
        unit_price: price,
        total_amount: price,
        status,
        created_at: epoch(),
        updated_at: epoch(),
    };
    let id = booking.id;
    ledger.bookings.insert(id, booking);
    id
}

fn seed_payment(
    ledger: &mut Ledger,
    booking_id: BookingId,
    amount: u64,
    status: PaymentStatus,
) -> PaymentId {
    let payment = Payment {
        id: PaymentId::new(),
        booking_id,
        amount: Money::new(amount),
        channel: PaymentChannel::Mtn,
        sender_ref: "+22997000000".to_string(),
        status,
        note: None,
        created_at: epoch(),
        paid_at: (status == PaymentStatus::Success).then(epoch),
    };
    let id = payment.id;
    ledger.payments.insert(id, payment);
    id
}

/// Ledger holding one Neon Vibe booking paid in full, ticket issued
fn paid_ledger() -> (Ledger, BookingId, TicketCode) {
    let env = fixtures::test_environment();
    let mut ledger = fixtures::ledger(10, 10);
    let booking_id = seed_booking(&mut ledger, fixtures::neon_vibe(), BookingStatus::Pending);
    seed_payment(&mut ledger, booking_id, 10_000, PaymentStatus::Success);
    BookingReducer::new()
        .reduce(&mut ledger, BookingAction::Settle { booking_id }, &env)
        .unwrap();
    let code = ledger.ticket_for_booking(&booking_id).unwrap().code.clone();
    (ledger, booking_id, code)
}

// ============================================================================
// Booking
// ============================================================================

#[test]
fn test_create_booking_copies_catalog_price() {
    let booking_id = BookingId::new();
    ReducerTest::new(BookingReducer::new())
        .with_env(fixtures::test_environment())
        .given_state(fixtures::ledger(10, 10))
        .when_action(BookingAction::CreateBooking {
            booking_id,
            buyer: BuyerId::new(),
            pass_class: fixtures::seoul_entry(),
            declared_price: SEOUL_PRICE,
        })
        .then_state(move |ledger| {
            let booking = ledger.booking(&booking_id).unwrap();
            assert_eq!(booking.status, BookingStatus::Pending);
            assert_eq!(booking.unit_price, SEOUL_PRICE);
            assert_eq!(booking.total_amount, SEOUL_PRICE);
            assert_eq!(booking.created_at, epoch());
        })
        .then_events(|events| {
            assertions::assert_event_types(events, &["Booking.BookingCreated"]);
        })
        .run();
}

#[test]
fn test_create_booking_rejects_stale_price() {
    ReducerTest::new(BookingReducer::new())
        .with_env(fixtures::test_environment())
        .given_state(fixtures::ledger(10, 10))
        .when_action(BookingAction::CreateBooking {
            booking_id: BookingId::new(),
            buyer: BuyerId::new(),
            pass_class: fixtures::neon_vibe(),
            declared_price: Money::new(9_000),
        })
        .then_error(|error| {
            assert_eq!(
                *error,
                AdmissionError::PriceMismatch {
                    declared: Money::new(9_000),
                    current: NEON_PRICE,
                }
            );
        })
        .then_state(|ledger| assert!(ledger.bookings.is_empty()))
        .run();
}

#[test]
fn test_create_booking_unknown_class() {
    ReducerTest::new(BookingReducer::new())
        .with_env(fixtures::test_environment())
        .given_state(fixtures::ledger(10, 10))
        .when_action(BookingAction::CreateBooking {
            booking_id: BookingId::new(),
            buyer: BuyerId::new(),
            pass_class: PassClassId::new("backstage"),
            declared_price: NEON_PRICE,
        })
        .then_error(|error| {
            assert_eq!(*error, AdmissionError::PassClassNotFound(PassClassId::new("backstage")));
        })
        .run();
}

#[test]
fn test_create_booking_sold_out_when_capacity_consumed() {
    let mut ledger = fixtures::ledger(10, 1);
    seed_booking(&mut ledger, fixtures::neon_vibe(), BookingStatus::Paid);

    ReducerTest::new(BookingReducer::new())
        .with_env(fixtures::test_environment())
        .given_state(ledger)
        .when_action(BookingAction::CreateBooking {
            booking_id: BookingId::new(),
            buyer: BuyerId::new(),
            pass_class: fixtures::neon_vibe(),
            declared_price: NEON_PRICE,
        })
        .then_error(|error| {
            assert_eq!(*error, AdmissionError::SoldOut(fixtures::neon_vibe()));
        })
        .then_state(|ledger| assert_eq!(ledger.bookings.len(), 1))
        .run();
}

#[test]
fn test_fresh_pending_booking_holds_the_last_seat() {
    let mut ledger = fixtures::ledger(10, 1);
    seed_booking(&mut ledger, fixtures::neon_vibe(), BookingStatus::Pending);

    ReducerTest::new(BookingReducer::new())
        .with_env(fixtures::test_environment())
        .given_state(ledger)
        .when_action(BookingAction::CreateBooking {
            booking_id: BookingId::new(),
            buyer: BuyerId::new(),
            pass_class: fixtures::neon_vibe(),
            declared_price: NEON_PRICE,
        })
        .then_error(|error| {
            assert_eq!(*error, AdmissionError::SoldOut(fixtures::neon_vibe()));
        })
        .run();
}

#[test]
fn test_stale_pending_booking_releases_its_hold() {
    let mut ledger = fixtures::ledger(10, 1);
    let stale = seed_booking(&mut ledger, fixtures::neon_vibe(), BookingStatus::Pending);
    ledger.bookings.get_mut(&stale).unwrap().created_at = epoch() - Duration::minutes(16);

    ReducerTest::new(BookingReducer::new())
        .with_env(fixtures::test_environment())
        .given_state(ledger)
        .when_action(BookingAction::CreateBooking {
            booking_id: BookingId::new(),
            buyer: BuyerId::new(),
            pass_class: fixtures::neon_vibe(),
            declared_price: NEON_PRICE,
        })
        .then_state(|ledger| assert_eq!(ledger.bookings.len(), 2))
        .run();
}

#[test]
fn test_settle_full_payment_marks_paid_and_issues_ticket() {
    let mut ledger = fixtures::ledger(10, 10);
    let booking_id = seed_booking(&mut ledger, fixtures::neon_vibe(), BookingStatus::Pending);
    seed_payment(&mut ledger, booking_id, 10_000, PaymentStatus::Success);

    ReducerTest::new(BookingReducer::new())
        .with_env(fixtures::test_environment())
        .given_state(ledger)
        .when_action(BookingAction::Settle { booking_id })
        .then_events(|events| {
            assertions::assert_event_types(
                events,
                &["Booking.StatusChanged", "Ticket.TicketIssued"],
            );
        })
        .then_state(move |ledger| {
            assert_eq!(ledger.booking(&booking_id).unwrap().status, BookingStatus::Paid);
            let ticket = ledger.ticket_for_booking(&booking_id).unwrap();
            assert!(ticket.code.is_well_formed());
            assert!(ticket.is_valid);
            assert!(ticket.scanned_at.is_none());
            assert_eq!(ledger.ticket_count(), 1);
        })
        .run();
}

#[test]
fn test_settle_partial_payment_moves_to_tontine() {
    let mut ledger = fixtures::ledger(10, 10);
    let booking_id = seed_booking(&mut ledger, fixtures::neon_vibe(), BookingStatus::Pending);
    seed_payment(&mut ledger, booking_id, 3_000, PaymentStatus::Success);

    ReducerTest::new(BookingReducer::new())
        .with_env(fixtures::test_environment())
        .given_state(ledger)
        .when_action(BookingAction::Settle { booking_id })
        .then_events(|events| assertions::assert_event_types(events, &["Booking.StatusChanged"]))
        .then_state(move |ledger| {
            assert_eq!(ledger.booking(&booking_id).unwrap().status, BookingStatus::Tontine);
            assert!(ledger.ticket_for_booking(&booking_id).is_none());
            assert_eq!(ledger.sold(&fixtures::neon_vibe()), 1);
        })
        .run();
}

#[test]
fn test_settle_refuses_promotion_past_capacity() {
    let mut ledger = fixtures::ledger(10, 1);
    seed_booking(&mut ledger, fixtures::neon_vibe(), BookingStatus::Tontine);
    let late = seed_booking(&mut ledger, fixtures::neon_vibe(), BookingStatus::Pending);
    seed_payment(&mut ledger, late, 2_000, PaymentStatus::Success);

    ReducerTest::new(BookingReducer::new())
        .with_env(fixtures::test_environment())
        .given_state(ledger)
        .when_action(BookingAction::Settle { booking_id: late })
        .then_error(|error| assert_eq!(*error, AdmissionError::SoldOut(fixtures::neon_vibe())))
        .then_state(move |ledger| {
            assert_eq!(ledger.booking(&late).unwrap().status, BookingStatus::Pending);
        })
        .run();
}

#[test]
fn test_settle_paid_booking_is_a_no_op() {
    let (ledger, booking_id, _) = paid_ledger();

    ReducerTest::new(BookingReducer::new())
        .with_env(fixtures::test_environment())
        .given_state(ledger)
        .when_action(BookingAction::Settle { booking_id })
        .then_events(assertions::assert_no_events)
        .then_state(|ledger| assert_eq!(ledger.ticket_count(), 1))
        .run();
}

#[test]
fn test_settle_cancelled_booking_is_closed() {
    let mut ledger = fixtures::ledger(10, 10);
    let booking_id = seed_booking(&mut ledger, fixtures::neon_vibe(), BookingStatus::Cancelled);

    ReducerTest::new(BookingReducer::new())
        .with_env(fixtures::test_environment())
        .given_state(ledger)
        .when_action(BookingAction::Settle { booking_id })
        .then_error(move |error| assert_eq!(*error, AdmissionError::BookingClosed(booking_id)))
        .run();
}

#[test]
fn test_cancel_tontine_booking_frees_the_seat() {
    let mut ledger = fixtures::ledger(10, 10);
    let booking_id = seed_booking(&mut ledger, fixtures::neon_vibe(), BookingStatus::Tontine);

    ReducerTest::new(BookingReducer::new())
        .with_env(fixtures::test_environment())
        .given_state(ledger)
        .when_action(BookingAction::CancelBooking {
            booking_id,
            reason: "buyer withdrew".to_string(),
        })
        .then_events(|events| assertions::assert_event_types(events, &["Booking.BookingCancelled"]))
        .then_state(move |ledger| {
            assert_eq!(ledger.booking(&booking_id).unwrap().status, BookingStatus::Cancelled);
            assert_eq!(ledger.sold(&fixtures::neon_vibe()), 0);
        })
        .run();
}

#[test]
fn test_cancel_paid_booking_is_invalid() {
    let (ledger, booking_id, _) = paid_ledger();

    ReducerTest::new(BookingReducer::new())
        .with_env(fixtures::test_environment())
        .given_state(ledger)
        .when_action(BookingAction::CancelBooking {
            booking_id,
            reason: "too late".to_string(),
        })
        .then_error(|error| {
            assert_eq!(
                *error,
                AdmissionError::InvalidTransition {
                    from: BookingStatus::Paid,
                    to: BookingStatus::Cancelled,
                }
            );
        })
        .run();
}

#[test]
fn test_assign_identity_before_ticket() {
    let mut ledger = fixtures::ledger(10, 10);
    let booking_id = seed_booking(&mut ledger, fixtures::neon_vibe(), BookingStatus::Tontine);

    ReducerTest::new(BookingReducer::new())
        .with_env(fixtures::test_environment())
        .given_state(ledger)
        .when_action(BookingAction::AssignIdentity {
            booking_id,
            identity: fixtures::identity(),
        })
        .then_events(|events| assertions::assert_event_types(events, &["Booking.IdentityAssigned"]))
        .then_state(move |ledger| {
            assert_eq!(ledger.identities.get(&booking_id), Some(&fixtures::identity()));
        })
        .run();
}

#[test]
fn test_assign_identity_after_ticket_is_locked() {
    let (ledger, booking_id, code) = paid_ledger();

    ReducerTest::new(BookingReducer::new())
        .with_env(fixtures::test_environment())
        .given_state(ledger)
        .when_action(BookingAction::AssignIdentity {
            booking_id,
            identity: fixtures::identity(),
        })
        .then_error(move |error| assert_eq!(*error, AdmissionError::IdentityLocked(code.clone())))
        .then_state(move |ledger| assert!(!ledger.identities.contains_key(&booking_id)))
        .run();
}

// ============================================================================
// Payment
// ============================================================================

#[test]
fn test_submit_payment_records_pending_proof() {
    let mut ledger = fixtures::ledger(10, 10);
    let booking_id = seed_booking(&mut ledger, fixtures::seoul_entry(), BookingStatus::Pending);
    let payment_id = PaymentId::new();

    ReducerTest::new(PaymentReducer::new())
        .with_env(fixtures::test_environment())
        .given_state(ledger)
        .when_action(PaymentAction::SubmitPayment {
            payment_id,
            booking_id,
            channel: PaymentChannel::Celtiis,
            sender_ref: "  +22961000000 ".to_string(),
            amount: Money::new(3_000),
        })
        .then_events(|events| assertions::assert_event_types(events, &["Payment.PaymentSubmitted"]))
        .then_state(move |ledger| {
            let payment = ledger.payment(&payment_id).unwrap();
            assert_eq!(payment.status, PaymentStatus::Pending);
            assert_eq!(payment.sender_ref, "+22961000000");
            assert_eq!(payment.paid_at, None);
            assert!(ledger.has_pending_payment(&booking_id));
            assert_eq!(ledger.confirmed_total(&booking_id).unwrap(), Money::ZERO);
        })
        .run();
}

#[test]
fn test_submit_payment_rejects_zero_amount() {
    let mut ledger = fixtures::ledger(10, 10);
    let booking_id = seed_booking(&mut ledger, fixtures::seoul_entry(), BookingStatus::Pending);

    ReducerTest::new(PaymentReducer::new())
        .with_env(fixtures::test_environment())
        .given_state(ledger)
        .when_action(PaymentAction::SubmitPayment {
            payment_id: PaymentId::new(),
            booking_id,
            channel: PaymentChannel::Mtn,
            sender_ref: "+22997000000".to_string(),
            amount: Money::ZERO,
        })
        .then_error(|error| assert_eq!(*error, AdmissionError::InvalidAmount))
        .then_state(|ledger| assert!(ledger.payments.is_empty()))
        .run();
}

#[test]
fn test_submit_payment_requires_sender() {
    let mut ledger = fixtures::ledger(10, 10);
    let booking_id = seed_booking(&mut ledger, fixtures::seoul_entry(), BookingStatus::Pending);

    ReducerTest::new(PaymentReducer::new())
        .with_env(fixtures::test_environment())
        .given_state(ledger)
        .when_action(PaymentAction::SubmitPayment {
            payment_id: PaymentId::new(),
            booking_id,
            channel: PaymentChannel::Mtn,
            sender_ref: "   ".to_string(),
            amount: Money::new(1_000),
        })
        .then_error(|error| assert_eq!(*error, AdmissionError::InvalidSender))
        .run();
}

#[test]
fn test_submit_payment_on_paid_booking_is_closed() {
    let (ledger, booking_id, _) = paid_ledger();

    ReducerTest::new(PaymentReducer::new())
        .with_env(fixtures::test_environment())
        .given_state(ledger)
        .when_action(PaymentAction::SubmitPayment {
            payment_id: PaymentId::new(),
            booking_id,
            channel: PaymentChannel::Mtn,
            sender_ref: "+22997000000".to_string(),
            amount: Money::new(1_000),
        })
        .then_error(move |error| assert_eq!(*error, AdmissionError::BookingClosed(booking_id)))
        .run();
}

#[test]
fn test_submit_payment_above_remaining_balance() {
    let mut ledger = fixtures::ledger(10, 10);
    let booking_id = seed_booking(&mut ledger, fixtures::neon_vibe(), BookingStatus::Tontine);
    seed_payment(&mut ledger, booking_id, 4_000, PaymentStatus::Success);

    ReducerTest::new(PaymentReducer::new())
        .with_env(fixtures::test_environment())
        .given_state(ledger)
        .when_action(PaymentAction::SubmitPayment {
            payment_id: PaymentId::new(),
            booking_id,
            channel: PaymentChannel::Mtn,
            sender_ref: "+22997000000".to_string(),
            amount: Money::new(7_000),
        })
        .then_error(|error| {
            assert_eq!(
                *error,
                AdmissionError::ExceedsBalance {
                    amount: Money::new(7_000),
                    remaining: Money::new(6_000),
                }
            );
        })
        .run();
}

#[test]
fn test_approve_payment_confirms_amount() {
    let mut ledger = fixtures::ledger(10, 10);
    let booking_id = seed_booking(&mut ledger, fixtures::neon_vibe(), BookingStatus::Pending);
    let payment_id = seed_payment(&mut ledger, booking_id, 3_000, PaymentStatus::Pending);

    ReducerTest::new(PaymentReducer::new())
        .with_env(fixtures::test_environment())
        .given_state(ledger)
        .when_action(PaymentAction::ApprovePayment { payment_id })
        .then_events(|events| assertions::assert_event_types(events, &["Payment.PaymentApproved"]))
        .then_state(move |ledger| {
            let payment = ledger.payment(&payment_id).unwrap();
            assert_eq!(payment.status, PaymentStatus::Success);
            assert_eq!(payment.paid_at, Some(test_clock().now()));
            assert_eq!(ledger.confirmed_total(&booking_id).unwrap(), Money::new(3_000));
        })
        .run();
}

#[test]
fn test_second_decision_reports_stored_status() {
    let mut ledger = fixtures::ledger(10, 10);
    let booking_id = seed_booking(&mut ledger, fixtures::neon_vibe(), BookingStatus::Pending);
    let payment_id = seed_payment(&mut ledger, booking_id, 3_000, PaymentStatus::Failed);

    ReducerTest::new(PaymentReducer::new())
        .with_env(fixtures::test_environment())
        .given_state(ledger)
        .when_action(PaymentAction::ApprovePayment { payment_id })
        .then_error(move |error| {
            assert_eq!(
                *error,
                AdmissionError::AlreadyDecided {
                    payment_id,
                    status: PaymentStatus::Failed,
                }
            );
        })
        .then_state(move |ledger| {
            assert_eq!(ledger.payment(&payment_id).unwrap().status, PaymentStatus::Failed);
        })
        .run();
}

#[test]
fn test_reject_payment_uses_default_note() {
    let mut ledger = fixtures::ledger(10, 10);
    let booking_id = seed_booking(&mut ledger, fixtures::neon_vibe(), BookingStatus::Pending);
    let payment_id = seed_payment(&mut ledger, booking_id, 3_000, PaymentStatus::Pending);

    ReducerTest::new(PaymentReducer::new())
        .with_env(fixtures::test_environment())
        .given_state(ledger)
        .when_action(PaymentAction::RejectPayment {
            payment_id,
            note: None,
        })
        .then_state(move |ledger| {
            let payment = ledger.payment(&payment_id).unwrap();
            assert_eq!(payment.status, PaymentStatus::Failed);
            assert_eq!(payment.note.as_deref(), Some(DEFAULT_REJECTION_NOTE));
            assert_eq!(ledger.confirmed_total(&booking_id).unwrap(), Money::ZERO);
        })
        .run();
}

#[test]
fn test_approve_payment_for_cancelled_booking_is_closed() {
    let mut ledger = fixtures::ledger(10, 10);
    let booking_id = seed_booking(&mut ledger, fixtures::neon_vibe(), BookingStatus::Cancelled);
    let payment_id = seed_payment(&mut ledger, booking_id, 3_000, PaymentStatus::Pending);

    ReducerTest::new(PaymentReducer::new())
        .with_env(fixtures::test_environment())
        .given_state(ledger)
        .when_action(PaymentAction::ApprovePayment { payment_id })
        .then_error(move |error| assert_eq!(*error, AdmissionError::BookingClosed(booking_id)))
        .run();
}

#[test]
fn test_approval_cannot_overpay() {
    let mut ledger = fixtures::ledger(10, 10);
    let booking_id = seed_booking(&mut ledger, fixtures::seoul_entry(), BookingStatus::Pending);
    let first = seed_payment(&mut ledger, booking_id, 5_000, PaymentStatus::Pending);
    seed_payment(&mut ledger, booking_id, 5_000, PaymentStatus::Success);

    ReducerTest::new(PaymentReducer::new())
        .with_env(fixtures::test_environment())
        .given_state(ledger)
        .when_action(PaymentAction::ApprovePayment { payment_id: first })
        .then_error(|error| {
            assert_eq!(
                *error,
                AdmissionError::ExceedsBalance {
                    amount: Money::new(5_000),
                    remaining: Money::new(2_000),
                }
            );
        })
        .run();
}

// ============================================================================
// Tontine
// ============================================================================

#[test]
fn test_recompute_caches_confirmed_progress() {
    let mut ledger = fixtures::ledger(10, 10);
    let booking_id = seed_booking(&mut ledger, fixtures::neon_vibe(), BookingStatus::Tontine);
    seed_payment(&mut ledger, booking_id, 3_000, PaymentStatus::Success);
    seed_payment(&mut ledger, booking_id, 2_500, PaymentStatus::Success);
    seed_payment(&mut ledger, booking_id, 4_000, PaymentStatus::Pending);
    seed_payment(&mut ledger, booking_id, 1_000, PaymentStatus::Failed);

    ReducerTest::new(TontineReducer::new())
        .with_env(fixtures::test_environment())
        .given_state(ledger)
        .when_action(TontineAction::Recompute { booking_id })
        .then_state(move |ledger| {
            let tontine = &ledger.tontines[&booking_id];
            assert_eq!(tontine.amount_paid, Money::new(5_500));
            assert_eq!(tontine.remaining_amount, Money::new(4_500));
            assert_eq!(tontine.paid_boxes, 5);
            assert_eq!(tontine.total_boxes, 10);
            assert_eq!(tontine.status, TontineStatus::InProgress);
        })
        .run();
}

#[test]
fn test_recompute_refuses_shrinking_total() {
    let mut ledger = fixtures::ledger(10, 10);
    let booking_id = seed_booking(&mut ledger, fixtures::neon_vibe(), BookingStatus::Tontine);
    let payment_id = seed_payment(&mut ledger, booking_id, 3_000, PaymentStatus::Success);
    let env = fixtures::test_environment();
    TontineReducer::new()
        .reduce(&mut ledger, TontineAction::Recompute { booking_id }, &env)
        .unwrap();
    ledger.payments.get_mut(&payment_id).unwrap().status = PaymentStatus::Failed;

    ReducerTest::new(TontineReducer::new())
        .with_env(env)
        .given_state(ledger)
        .when_action(TontineAction::Recompute { booking_id })
        .then_error(|error| assert!(matches!(error, AdmissionError::InvariantViolation(_))))
        .then_state(move |ledger| {
            assert_eq!(ledger.tontines[&booking_id].amount_paid, Money::new(3_000));
        })
        .run();
}

// ============================================================================
// Ticket
// ============================================================================

#[test]
fn test_issue_ticket_requires_full_payment() {
    let mut ledger = fixtures::ledger(10, 10);
    let booking_id = seed_booking(&mut ledger, fixtures::neon_vibe(), BookingStatus::Tontine);
    seed_payment(&mut ledger, booking_id, 9_000, PaymentStatus::Success);

    ReducerTest::new(TicketReducer::new())
        .with_env(fixtures::test_environment())
        .given_state(ledger)
        .when_action(TicketAction::IssueTicket { booking_id })
        .then_error(|error| {
            assert_eq!(
                *error,
                AdmissionError::NotFullyPaid {
                    paid: Money::new(9_000),
                    total: NEON_PRICE,
                }
            );
        })
        .then_state(|ledger| assert_eq!(ledger.ticket_count(), 0))
        .run();
}

#[test]
fn test_issue_ticket_is_idempotent() {
    let (ledger, booking_id, code) = paid_ledger();

    ReducerTest::new(TicketReducer::new())
        .with_env(fixtures::test_environment())
        .given_state(ledger)
        .when_action(TicketAction::IssueTicket { booking_id })
        .then_events(assertions::assert_no_events)
        .then_state(move |ledger| {
            assert_eq!(ledger.ticket_count(), 1);
            assert_eq!(ledger.ticket_for_booking(&booking_id).unwrap().code, code);
        })
        .run();
}

#[test]
fn test_issue_ticket_gives_up_on_colliding_codes() {
    let (mut ledger, _, taken) = paid_ledger();
    let second = seed_booking(&mut ledger, fixtures::neon_vibe(), BookingStatus::Paid);
    seed_payment(&mut ledger, second, 10_000, PaymentStatus::Success);

    let env = LedgerEnvironment::new(
        Arc::new(test_clock()),
        Arc::new(ConstantTicketCodes(taken)),
        AdmissionPolicy::default(),
        PayloadSealer::new(fixtures::TEST_SECRET),
    );

    ReducerTest::new(TicketReducer::new())
        .with_env(env)
        .given_state(ledger)
        .when_action(TicketAction::IssueTicket { booking_id: second })
        .then_error(|error| assert!(matches!(error, AdmissionError::InvariantViolation(_))))
        .then_state(|ledger| assert_eq!(ledger.ticket_count(), 1))
        .run();
}

#[test]
fn test_validate_ticket_admits_once() {
    let (ledger, _, code) = paid_ledger();
    let expected = code.clone();

    ReducerTest::new(TicketReducer::new())
        .with_env(fixtures::test_environment())
        .given_state(ledger)
        .when_action(TicketAction::ValidateTicket { code })
        .then_events(|events| assertions::assert_event_types(events, &["Ticket.TicketScanned"]))
        .then_state(move |ledger| {
            let ticket = ledger.ticket_by_code(&expected).unwrap();
            assert_eq!(ticket.scanned_at, Some(test_clock().now()));
        })
        .run();
}

#[test]
fn test_validate_ticket_twice_reports_first_scan() {
    let (mut ledger, _, code) = paid_ledger();
    let env = fixtures::test_environment();
    TicketReducer::new()
        .reduce(&mut ledger, TicketAction::ValidateTicket { code: code.clone() }, &env)
        .unwrap();
    let expected = code.clone();

    ReducerTest::new(TicketReducer::new())
        .with_env(env)
        .given_state(ledger)
        .when_action(TicketAction::ValidateTicket { code })
        .then_error(move |error| {
            assert_eq!(
                *error,
                AdmissionError::AlreadyScanned {
                    code: expected,
                    scanned_at: epoch(),
                }
            );
        })
        .run();
}

#[test]
fn test_validate_unknown_code() {
    ReducerTest::new(TicketReducer::new())
        .with_env(fixtures::test_environment())
        .given_state(fixtures::ledger(10, 10))
        .when_action(TicketAction::ValidateTicket {
            code: TicketCode::new("SAH-1-NOPE"),
        })
        .then_error(|error| {
            assert_eq!(*error, AdmissionError::TicketNotFound("SAH-1-NOPE".to_string()));
        })
        .run();
}

#[test]
fn test_voided_ticket_is_refused_at_the_door() {
    let (mut ledger, _, code) = paid_ledger();
    let env = fixtures::test_environment();
    TicketReducer::new()
        .reduce(
            &mut ledger,
            TicketAction::VoidTicket {
                code: code.clone(),
                reason: "duplicate purchase".to_string(),
            },
            &env,
        )
        .unwrap();
    let expected = code.clone();

    ReducerTest::new(TicketReducer::new())
        .with_env(env)
        .given_state(ledger)
        .when_action(TicketAction::ValidateTicket { code })
        .then_error(move |error| assert_eq!(*error, AdmissionError::TicketVoided(expected)))
        .run();
}

#[test]
fn test_void_twice_is_a_no_op() {
    let (mut ledger, _, code) = paid_ledger();
    let env = fixtures::test_environment();
    TicketReducer::new()
        .reduce(
            &mut ledger,
            TicketAction::VoidTicket {
                code: code.clone(),
                reason: "first".to_string(),
            },
            &env,
        )
        .unwrap();
    let expected = code.clone();

    ReducerTest::new(TicketReducer::new())
        .with_env(env)
        .given_state(ledger)
        .when_action(TicketAction::VoidTicket {
            code,
            reason: "second".to_string(),
        })
        .then_events(assertions::assert_no_events)
        .then_state(move |ledger| {
            let ticket = ledger.ticket_by_code(&expected).unwrap();
            assert!(!ticket.is_valid);
            assert_eq!(ticket.void_reason.as_deref(), Some("first"));
        })
        .run();
}

#[test]
fn test_ticket_payload_verifies_with_deployment_secret() {
    let (ledger, booking_id, code) = paid_ledger();
    let ticket = ledger.ticket_for_booking(&booking_id).unwrap();

    let payload = PayloadSealer::new(fixtures::TEST_SECRET)
        .open(&ticket.payload)
        .unwrap();
    assert_eq!(payload.code, code);
    assert_eq!(payload.booking_id, booking_id);
    assert_eq!(payload.pass_class, fixtures::neon_vibe());
    assert!(PayloadSealer::new("another-secret").open(&ticket.payload).is_err());
}
