//! Property tests for ledger invariants
//!
//! Random installment plans and decision sequences must never push the
//! confirmed total above the booking total, never let it shrink, and always
//! leave a journal that replays to the live ledger.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use proptest::prelude::*;
use soulpass_core::types::{BookingStatus, BuyerId, Money, PaymentChannel};
use soulpass_core::{Ledger, event};
use soulpass_runtime::{Decision, PaymentSubmission};
use soulpass_testing::fixtures::{self, NEON_PRICE};
use soulpass_testing::properties::{decisions, installment_plan};

const BOX_UNIT: u64 = 1_000;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn confirmed_total_is_monotonic_and_bounded(
        plan in installment_plan(NEON_PRICE.units() / BOX_UNIT),
        verdicts in decisions(12),
    ) {
        runtime().block_on(async {
            let controller = fixtures::controller(10, 10);
            let booking = controller
                .create_booking(BuyerId::new(), &fixtures::neon_vibe(), NEON_PRICE)
                .await
                .unwrap();

            let mut last_paid = Money::ZERO;
            for (boxes, approve) in plan.iter().zip(verdicts.iter().cycle()) {
                let submitted = controller
                    .submit_payment(PaymentSubmission {
                        booking_id: booking.id,
                        channel: PaymentChannel::Mtn,
                        sender_ref: "+22997000000".to_string(),
                        amount: Money::new(boxes * BOX_UNIT),
                    })
                    .await;
                let Ok(payment) = submitted else { continue };

                let decision = if *approve {
                    Decision::Approve
                } else {
                    Decision::Reject { note: None }
                };
                let _ = controller.decide_payment(true, payment.id, decision).await;

                let status = controller.booking_status(booking.id).await.unwrap();
                assert!(status.amount_paid >= last_paid);
                assert!(status.amount_paid <= status.total_amount);
                assert_eq!(
                    status.ticket_code.is_some(),
                    status.status == BookingStatus::Paid
                );
                last_paid = status.amount_paid;
            }

            let mut rebuilt = Ledger::new(fixtures::catalog(10, 10));
            event::replay(&mut rebuilt, &controller.journal().await);
            assert_eq!(rebuilt, controller.snapshot().await);
        });
    }

    #[test]
    fn approving_a_full_plan_pays_the_booking(
        plan in installment_plan(NEON_PRICE.units() / BOX_UNIT),
    ) {
        runtime().block_on(async {
            let controller = fixtures::controller(10, 10);
            let booking = controller
                .create_booking(BuyerId::new(), &fixtures::neon_vibe(), NEON_PRICE)
                .await
                .unwrap();

            for boxes in &plan {
                let payment = controller
                    .submit_payment(PaymentSubmission {
                        booking_id: booking.id,
                        channel: PaymentChannel::Celtiis,
                        sender_ref: "+22961000000".to_string(),
                        amount: Money::new(boxes * BOX_UNIT),
                    })
                    .await
                    .unwrap();
                controller
                    .decide_payment(true, payment.id, Decision::Approve)
                    .await
                    .unwrap();
            }

            let status = controller.booking_status(booking.id).await.unwrap();
            assert_eq!(status.status, BookingStatus::Paid);
            assert_eq!(status.amount_paid, NEON_PRICE);
            assert_eq!(controller.stats(true).await.unwrap().total_tickets, 1);
        });
    }
}
