//! End-to-end admission flows through the controller
//!
//! Covers checkout, installment payments, operator decisions, door scans
//! and administration against a shared in-memory ledger.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use chrono::Duration;
use soulpass_core::aggregates::tontine::ClaimCheck;
use soulpass_core::types::{
    BookingId, BookingPhase, BookingStatus, BuyerId, Capacity, Money, PassClassId, PaymentChannel,
    PaymentId, PaymentStatus, TicketCode, TontineStatus,
};
use soulpass_core::{AdmissionError, ErrorKind, Ledger, event};
use soulpass_runtime::{
    AdmissionController, Decision, DecisionOutcome, IdentityError, IdentityRequest,
    PaymentSubmission, TicketLookup,
};
use soulpass_testing::fixtures::{self, NEON_PRICE, SEOUL_PRICE};
use soulpass_testing::mocks::{FailingIdentityProvider, StaticIdentityProvider};
use soulpass_testing::ManualClock;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

// ============================================================================
// Helpers
// ============================================================================

fn proof(booking_id: BookingId, amount: u64) -> PaymentSubmission {
    PaymentSubmission {
        booking_id,
        channel: PaymentChannel::Mtn,
        sender_ref: "+22997000000".to_string(),
        amount: Money::new(amount),
    }
}

async fn book(controller: &AdmissionController, pass_class: &PassClassId) -> BookingId {
    let price = if *pass_class == fixtures::neon_vibe() {
        NEON_PRICE
    } else {
        SEOUL_PRICE
    };
    controller
        .create_booking(BuyerId::new(), pass_class, price)
        .await
        .unwrap()
        .id
}

async fn pay(controller: &AdmissionController, booking_id: BookingId, amount: u64) -> DecisionOutcome {
    let payment = controller.submit_payment(proof(booking_id, amount)).await.unwrap();
    controller
        .decide_payment(true, payment.id, Decision::Approve)
        .await
        .unwrap()
}

async fn paid_ticket(controller: &AdmissionController) -> (BookingId, TicketCode) {
    let booking_id = book(controller, &fixtures::neon_vibe()).await;
    match pay(controller, booking_id, 10_000).await {
        DecisionOutcome::Paid { ticket, .. } => (booking_id, ticket.code),
        other => panic!("expected a paid booking, got {other:?}"),
    }
}

// ============================================================================
// Checkout
// ============================================================================

#[tokio::test]
async fn test_create_booking_starts_pending() {
    let controller = fixtures::controller(10, 10);
    let booking = assert_ok!(
        controller
            .create_booking(BuyerId::new(), &fixtures::seoul_entry(), SEOUL_PRICE)
            .await
    );

    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.total_amount, SEOUL_PRICE);

    let availability = controller.check_availability(&fixtures::seoul_entry()).await.unwrap();
    assert_eq!(availability.sold, 0);
    assert_eq!(availability.held, 1);
    assert_eq!(availability.open, 9);
}

#[tokio::test]
async fn test_abandoned_checkout_releases_seat_after_hold_window() {
    let clock = Arc::new(ManualClock::default());
    let controller = fixtures::controller_with_clock(clock.clone(), 10, 1);

    book(&controller, &fixtures::neon_vibe()).await;
    let err = assert_err!(
        controller
            .create_booking(BuyerId::new(), &fixtures::neon_vibe(), NEON_PRICE)
            .await
    );
    assert_eq!(err, AdmissionError::SoldOut(fixtures::neon_vibe()));

    clock.advance(Duration::minutes(16));
    assert_ok!(
        controller
            .create_booking(BuyerId::new(), &fixtures::neon_vibe(), NEON_PRICE)
            .await
    );
}

#[tokio::test]
async fn test_pending_payment_extends_hold_past_booking_window() {
    let clock = Arc::new(ManualClock::default());
    let controller = fixtures::controller_with_clock(clock.clone(), 10, 1);

    let booking_id = book(&controller, &fixtures::neon_vibe()).await;
    clock.advance(Duration::minutes(10));
    controller.submit_payment(proof(booking_id, 2_000)).await.unwrap();
    clock.advance(Duration::minutes(10));

    let availability = controller.check_availability(&fixtures::neon_vibe()).await.unwrap();
    assert_eq!(availability.held, 1);
    assert_eq!(availability.open, 0);

    let status = controller.booking_status(booking_id).await.unwrap();
    assert_eq!(status.phase, BookingPhase::PendingPayment);
}

#[tokio::test]
async fn test_unreviewed_payment_releases_seat_after_hold_window() {
    let clock = Arc::new(ManualClock::default());
    let controller = fixtures::controller_with_clock(clock.clone(), 10, 1);

    let booking_id = book(&controller, &fixtures::neon_vibe()).await;
    controller.submit_payment(proof(booking_id, 1)).await.unwrap();
    clock.advance(Duration::days(30));

    let availability = controller.check_availability(&fixtures::neon_vibe()).await.unwrap();
    assert_eq!(availability.held, 0);
    assert_eq!(availability.open, 1);
    assert_ok!(
        controller
            .create_booking(BuyerId::new(), &fixtures::neon_vibe(), NEON_PRICE)
            .await
    );
}

#[tokio::test]
async fn test_price_edit_does_not_touch_existing_bookings() {
    let controller = fixtures::controller(10, 10);
    let booking_id = book(&controller, &fixtures::neon_vibe()).await;

    controller
        .set_unit_price(true, &fixtures::neon_vibe(), Money::new(12_000))
        .await
        .unwrap();

    let stale = controller
        .create_booking(BuyerId::new(), &fixtures::neon_vibe(), NEON_PRICE)
        .await;
    assert_eq!(
        stale,
        Err(AdmissionError::PriceMismatch {
            declared: NEON_PRICE,
            current: Money::new(12_000),
        })
    );

    let status = controller.booking_status(booking_id).await.unwrap();
    assert_eq!(status.total_amount, NEON_PRICE);
}

// ============================================================================
// Scenario B: installments
// ============================================================================

#[tokio::test]
async fn test_installments_reach_paid_and_issue_one_ticket() {
    let controller = fixtures::controller(10, 10);
    let booking_id = book(&controller, &fixtures::neon_vibe()).await;

    for round in 1..=3u64 {
        match pay(&controller, booking_id, 3_000).await {
            DecisionOutcome::Progress { progress, .. } => {
                assert_eq!(progress.amount_paid, Money::new(3_000 * round));
                assert_eq!(progress.paid_boxes, 3 * round);
                assert_eq!(progress.status, TontineStatus::InProgress);
            }
            other => panic!("expected progress, got {other:?}"),
        }
    }

    let status = controller.booking_status(booking_id).await.unwrap();
    assert_eq!(status.status, BookingStatus::Tontine);
    assert_eq!(status.remaining_amount, Money::new(1_000));
    assert_eq!(status.ticket_code, None);

    let ticket = match pay(&controller, booking_id, 1_000).await {
        DecisionOutcome::Paid { ticket, .. } => ticket,
        other => panic!("expected paid, got {other:?}"),
    };

    let status = controller.booking_status(booking_id).await.unwrap();
    assert_eq!(status.status, BookingStatus::Paid);
    assert_eq!(status.amount_paid, NEON_PRICE);
    assert_eq!(status.ticket_code, Some(ticket.code.clone()));
    assert_eq!(status.tontine.unwrap().status, TontineStatus::Complete);

    let stats = controller.stats(true).await.unwrap();
    assert_eq!(stats.total_tickets, 1);
    assert_eq!(stats.paid_bookings, 1);
    assert_eq!(stats.total_revenue, NEON_PRICE);

    // Manual issuance afterwards returns the same ticket
    let again = controller.issue_ticket(true, booking_id).await.unwrap();
    assert_eq!(again.code, ticket.code);
}

#[tokio::test]
async fn test_declared_boxes_are_checked_against_confirmed_payments() {
    let controller = fixtures::controller(10, 10);
    let booking_id = book(&controller, &fixtures::neon_vibe()).await;
    pay(&controller, booking_id, 3_000).await;
    controller.submit_payment(proof(booking_id, 5_000)).await.unwrap();

    let progress = controller.tontine_progress(booking_id, Some(8)).await.unwrap();
    assert_eq!(progress.paid_boxes, 3);
    assert_eq!(
        progress.claim,
        Some(ClaimCheck::Unconfirmed {
            declared: 8,
            confirmed: 3,
        })
    );

    let progress = controller.tontine_progress(booking_id, Some(2)).await.unwrap();
    assert_eq!(progress.claim, Some(ClaimCheck::Consistent));
}

#[tokio::test]
async fn test_overpayment_is_refused_at_submission() {
    let controller = fixtures::controller(10, 10);
    let booking_id = book(&controller, &fixtures::seoul_entry()).await;
    pay(&controller, booking_id, 5_000).await;

    let err = assert_err!(controller.submit_payment(proof(booking_id, 3_000)).await);
    assert_eq!(
        err,
        AdmissionError::ExceedsBalance {
            amount: Money::new(3_000),
            remaining: Money::new(2_000),
        }
    );
}

#[tokio::test]
async fn test_approval_that_would_overpay_leaves_payment_pending() {
    let controller = fixtures::controller(10, 10);
    let booking_id = book(&controller, &fixtures::seoul_entry()).await;
    let first = controller.submit_payment(proof(booking_id, 5_000)).await.unwrap();
    let second = controller.submit_payment(proof(booking_id, 5_000)).await.unwrap();
    controller.decide_payment(true, first.id, Decision::Approve).await.unwrap();

    let err = assert_err!(controller.decide_payment(true, second.id, Decision::Approve).await);
    assert!(matches!(err, AdmissionError::ExceedsBalance { .. }));

    let pending = controller.pending_payments(true).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].payment.id, second.id);
    assert_eq!(pending[0].amount_paid, Money::new(5_000));
}

// ============================================================================
// Scenario C: rejection
// ============================================================================

#[tokio::test]
async fn test_rejected_payment_leaves_booking_untouched() {
    let controller = fixtures::controller(10, 10);
    let booking_id = book(&controller, &fixtures::neon_vibe()).await;
    let before = controller.booking_status(booking_id).await.unwrap();

    let payment = controller.submit_payment(proof(booking_id, 5_000)).await.unwrap();
    let outcome = controller
        .decide_payment(
            true,
            payment.id,
            Decision::Reject {
                note: Some("wrong amount".to_string()),
            },
        )
        .await
        .unwrap();

    match outcome {
        DecisionOutcome::Rejected { payment } => {
            assert_eq!(payment.status, PaymentStatus::Failed);
            assert_eq!(payment.note.as_deref(), Some("wrong amount"));
        }
        other => panic!("expected rejection, got {other:?}"),
    }

    let after = controller.booking_status(booking_id).await.unwrap();
    assert_eq!(after.status, before.status);
    assert_eq!(after.amount_paid, before.amount_paid);
    assert_eq!(after.phase, BookingPhase::Pending);
}

#[tokio::test]
async fn test_decision_requires_authorization() {
    let controller = fixtures::controller(10, 10);
    let booking_id = book(&controller, &fixtures::neon_vibe()).await;
    let payment = controller.submit_payment(proof(booking_id, 5_000)).await.unwrap();

    let err = assert_err!(controller.decide_payment(false, payment.id, Decision::Approve).await);
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    let pending = controller.pending_payments(true).await.unwrap();
    assert_eq!(pending.len(), 1);
}

#[tokio::test]
async fn test_unknown_payment() {
    let controller = fixtures::controller(10, 10);
    let missing = PaymentId::new();
    let err = assert_err!(controller.decide_payment(true, missing, Decision::Approve).await);
    assert_eq!(err, AdmissionError::PaymentNotFound(missing));
}

// ============================================================================
// Scenario E: door scans
// ============================================================================

#[tokio::test]
async fn test_ticket_admits_exactly_once() {
    let controller = fixtures::controller(10, 10);
    let (_, code) = paid_ticket(&controller).await;

    let receipt = assert_ok!(controller.validate_ticket(code.as_str()).await);
    assert_eq!(receipt.code, code);
    assert_eq!(receipt.pass_class, fixtures::neon_vibe());

    let err = assert_err!(controller.validate_ticket(code.as_str()).await);
    assert_eq!(
        err,
        AdmissionError::AlreadyScanned {
            code: code.clone(),
            scanned_at: receipt.scanned_at,
        }
    );

    // Still retrievable as a record
    let view = controller.find_ticket(TicketLookup::Code(code)).await.unwrap();
    assert_eq!(view.ticket.scanned_at, Some(receipt.scanned_at));
    assert_eq!(view.pass_name, "Neon Vibe");
}

#[tokio::test]
async fn test_sealed_payload_scans_like_its_code() {
    let controller = fixtures::controller(10, 10);
    let (booking_id, code) = paid_ticket(&controller).await;
    let view = controller
        .find_ticket(TicketLookup::Booking(booking_id))
        .await
        .unwrap();

    let receipt = controller.validate_ticket(&view.ticket.payload).await.unwrap();
    assert_eq!(receipt.code, code);
}

#[tokio::test]
async fn test_forged_payload_is_refused_before_the_ledger() {
    let controller = fixtures::controller(10, 10);
    let (booking_id, code) = paid_ticket(&controller).await;
    let view = controller
        .find_ticket(TicketLookup::Booking(booking_id))
        .await
        .unwrap();

    let (body, _) = view.ticket.payload.split_once('.').unwrap();
    let forged = format!("{body}.AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA");
    let err = assert_err!(controller.validate_ticket(&forged).await);
    assert!(matches!(err, AdmissionError::ForgedPayload(_)));

    // The real ticket is still unscanned
    assert_ok!(controller.validate_ticket(code.as_str()).await);
}

#[tokio::test]
async fn test_voided_ticket_is_refused() {
    let controller = fixtures::controller(10, 10);
    let (_, code) = paid_ticket(&controller).await;

    let voided = controller
        .void_ticket(true, &code, "refunded".to_string())
        .await
        .unwrap();
    assert!(!voided.is_valid);

    let err = assert_err!(controller.validate_ticket(code.as_str()).await);
    assert_eq!(err, AdmissionError::TicketVoided(code));
}

#[tokio::test]
async fn test_issue_ticket_before_full_payment() {
    let controller = fixtures::controller(10, 10);
    let booking_id = book(&controller, &fixtures::neon_vibe()).await;
    pay(&controller, booking_id, 4_000).await;

    let err = assert_err!(controller.issue_ticket(true, booking_id).await);
    assert_eq!(
        err,
        AdmissionError::NotFullyPaid {
            paid: Money::new(4_000),
            total: NEON_PRICE,
        }
    );
}

// ============================================================================
// Administration
// ============================================================================

#[tokio::test]
async fn test_cancel_frees_seat_and_closes_booking() {
    let controller = fixtures::controller(10, 1);
    let booking_id = book(&controller, &fixtures::neon_vibe()).await;
    pay(&controller, booking_id, 2_000).await;
    assert_eq!(
        controller.check_availability(&fixtures::neon_vibe()).await.unwrap().sold,
        1
    );

    let cancelled = controller
        .cancel_booking(true, booking_id, "no show".to_string())
        .await
        .unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert_eq!(
        controller.check_availability(&fixtures::neon_vibe()).await.unwrap().open,
        1
    );

    let err = assert_err!(controller.submit_payment(proof(booking_id, 1_000)).await);
    assert_eq!(err, AdmissionError::BookingClosed(booking_id));
}

#[tokio::test]
async fn test_capacity_cannot_drop_below_sold() {
    let controller = fixtures::controller(10, 10);
    paid_ticket(&controller).await;
    paid_ticket(&controller).await;

    let err = assert_err!(
        controller
            .set_capacity(true, &fixtures::neon_vibe(), Capacity::new(1))
            .await
    );
    assert_eq!(err, AdmissionError::InvalidCapacity { requested: 1, sold: 2 });

    let availability = controller
        .set_capacity(true, &fixtures::neon_vibe(), Capacity::new(2))
        .await
        .unwrap();
    assert_eq!(availability.open, 0);
}

#[tokio::test]
async fn test_pending_payments_are_listed_with_context() {
    let controller = fixtures::controller(10, 10);
    let booking_id = book(&controller, &fixtures::neon_vibe()).await;
    pay(&controller, booking_id, 4_000).await;
    controller.submit_payment(proof(booking_id, 2_000)).await.unwrap();

    let pending = controller.pending_payments(true).await.unwrap();
    assert_eq!(pending.len(), 1);
    let view = &pending[0];
    assert_eq!(view.booking_status, BookingStatus::Tontine);
    assert!(view.is_tontine);
    assert_eq!(view.amount_paid, Money::new(4_000));
    assert_eq!(view.remaining_after_approval, Money::new(4_000));

    assert_eq!(
        controller.pending_payments(false).await,
        Err(AdmissionError::Unauthorized)
    );
}

#[tokio::test]
async fn test_reset_clears_bookings_and_keeps_catalog() {
    let controller = fixtures::controller(10, 10);
    controller
        .set_capacity(true, &fixtures::seoul_entry(), Capacity::new(25))
        .await
        .unwrap();
    paid_ticket(&controller).await;
    book(&controller, &fixtures::seoul_entry()).await;

    let summary = controller.reset(true).await.unwrap();
    assert_eq!(summary.bookings, 2);
    assert_eq!(summary.payments, 1);
    assert_eq!(summary.tickets, 1);

    let ledger = controller.snapshot().await;
    assert!(ledger.bookings.is_empty());
    assert!(ledger.payments.is_empty());
    assert_eq!(ledger.ticket_count(), 0);

    let seoul = controller.check_availability(&fixtures::seoul_entry()).await.unwrap();
    assert_eq!(seoul.capacity, 25);
    assert_eq!(seoul.open, 25);
}

#[tokio::test]
async fn test_journal_replays_to_the_current_ledger() {
    let controller = fixtures::controller(10, 10);
    let (_, code) = paid_ticket(&controller).await;
    let booking_id = book(&controller, &fixtures::seoul_entry()).await;
    pay(&controller, booking_id, 3_000).await;
    controller.validate_ticket(code.as_str()).await.unwrap();

    let journal = controller.journal().await;
    let sequences: Vec<u64> = journal.iter().map(|entry| entry.sequence).collect();
    assert_eq!(sequences, (1..=journal.len() as u64).collect::<Vec<_>>());

    let mut rebuilt = Ledger::new(fixtures::catalog(10, 10));
    event::replay(&mut rebuilt, &journal);
    assert_eq!(rebuilt, controller.snapshot().await);
}

#[tokio::test]
async fn test_rejected_operations_are_not_journaled() {
    let controller = fixtures::controller(10, 10);
    let booking_id = book(&controller, &fixtures::neon_vibe()).await;
    let before = controller.journal().await.len();

    assert_err!(controller.submit_payment(proof(booking_id, 0)).await);
    assert_err!(controller.issue_ticket(true, booking_id).await);
    assert_err!(controller.cancel_booking(false, booking_id, String::new()).await);

    assert_eq!(controller.journal().await.len(), before);
}

// ============================================================================
// Identity
// ============================================================================

#[tokio::test]
async fn test_identity_is_attached_and_sealed_into_ticket() {
    let provider = Arc::new(StaticIdentityProvider::new(fixtures::identity()));
    let controller = fixtures::controller(10, 10).with_identity_provider(provider.clone());
    let booking_id = book(&controller, &fixtures::neon_vibe()).await;

    let identity = controller
        .generate_identity(booking_id, IdentityRequest::default())
        .await
        .unwrap();
    assert_eq!(identity, fixtures::identity());
    assert_eq!(provider.calls(), 1);

    let ticket = match pay(&controller, booking_id, 10_000).await {
        DecisionOutcome::Paid { ticket, .. } => ticket,
        other => panic!("expected paid, got {other:?}"),
    };
    let receipt = controller.validate_ticket(&ticket.payload).await.unwrap();
    assert_eq!(receipt.holder.as_deref(), Some("Haneul"));
}

#[tokio::test]
async fn test_identity_is_locked_once_the_ticket_is_sealed() {
    let provider = Arc::new(StaticIdentityProvider::new(fixtures::identity()));
    let controller = fixtures::controller(10, 10).with_identity_provider(provider.clone());
    let (booking_id, code) = paid_ticket(&controller).await;

    let err = controller
        .generate_identity(booking_id, IdentityRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::Ledger(AdmissionError::IdentityLocked(ref locked)) if *locked == code));
    assert_eq!(provider.calls(), 0);

    let receipt = controller.validate_ticket(code.as_str()).await.unwrap();
    assert_eq!(receipt.holder, None);
    assert!(controller.booking_status(booking_id).await.unwrap().identity.is_none());
}

#[tokio::test]
async fn test_identity_without_provider_is_unavailable() {
    let controller = fixtures::controller(10, 10);
    let booking_id = book(&controller, &fixtures::neon_vibe()).await;

    let err = controller
        .generate_identity(booking_id, IdentityRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::Unavailable));
}

#[tokio::test]
async fn test_identity_provider_failure_changes_nothing() {
    let controller =
        fixtures::controller(10, 10).with_identity_provider(Arc::new(FailingIdentityProvider));
    let booking_id = book(&controller, &fixtures::neon_vibe()).await;

    let err = controller
        .generate_identity(booking_id, IdentityRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::Provider(_)));
    assert!(controller.booking_status(booking_id).await.unwrap().identity.is_none());
}

#[tokio::test]
async fn test_identity_for_unknown_booking() {
    let controller = fixtures::controller(10, 10)
        .with_identity_provider(Arc::new(StaticIdentityProvider::new(fixtures::identity())));
    let missing = BookingId::new();

    let err = controller
        .generate_identity(missing, IdentityRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        IdentityError::Ledger(AdmissionError::BookingNotFound(id)) if id == missing
    ));
}
