//! Payment endpoints.
//!
//! - `POST /api/payments` - submit proof of a mobile-money transfer
//! - `GET /api/payments/pending` - operator queue (admin)
//! - `POST /api/payments/:id/decision` - approve or reject (admin)

use crate::error::AppError;
use crate::extractors::{AdminGate, CorrelationId};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use soulpass_core::AdmissionError;
use soulpass_core::types::{BookingId, Money, Payment, PaymentChannel, PaymentId};
use soulpass_runtime::{Decision, DecisionOutcome, PaymentSubmission, PendingPaymentView};

/// Payment proof sent by the buyer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPaymentRequest {
    /// Booking paid toward
    pub booking_id: BookingId,
    /// Operator used
    #[serde(alias = "operator")]
    pub channel: PaymentChannel,
    /// Sender phone number
    #[serde(alias = "phone")]
    pub sender_phone: String,
    /// Amount sent; signed so negative values reach the amount check
    pub amount: i64,
}

impl TryFrom<SubmitPaymentRequest> for PaymentSubmission {
    type Error = AdmissionError;

    fn try_from(request: SubmitPaymentRequest) -> Result<Self, Self::Error> {
        let amount = u64::try_from(request.amount).map_err(|_| AdmissionError::InvalidAmount)?;
        Ok(Self {
            booking_id: request.booking_id,
            channel: request.channel,
            sender_ref: request.sender_phone,
            amount: Money::new(amount),
        })
    }
}

/// Record a Pending payment.
///
/// Answers 201 with the payment. The booking does not change until an
/// operator decides. Amounts at or below zero answer 422 `INVALID_AMOUNT`.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/payments \
///   -H 'Content-Type: application/json' \
///   -d '{"bookingId":"…","channel":"mtn","senderPhone":"+22997000000","amount":3000}'
/// ```
pub async fn submit_payment(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    body: Result<Json<SubmitPaymentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Payment>), AppError> {
    let Json(request) = body?;
    let payment = state
        .controller
        .submit_payment(PaymentSubmission::try_from(request)?)
        .await?;
    tracing::info!(
        correlation_id = %correlation_id.0,
        payment_id = %payment.id,
        "Payment proof accepted"
    );
    Ok((StatusCode::CREATED, Json(payment)))
}

/// Pending payments, newest first (admin)
pub async fn pending_payments(
    State(state): State<AppState>,
    AdminGate(authorized): AdminGate,
) -> Result<Json<Vec<PendingPaymentView>>, AppError> {
    Ok(Json(state.controller.pending_payments(authorized).await?))
}

/// Approve or reject a pending payment (admin).
///
/// Body is `{"decision":"approve"}` or `{"decision":"reject","note":"…"}`.
/// A second decision on the same payment answers 409 `ALREADY_DECIDED`.
pub async fn decide_payment(
    State(state): State<AppState>,
    AdminGate(authorized): AdminGate,
    correlation_id: CorrelationId,
    Path(payment_id): Path<PaymentId>,
    Json(decision): Json<Decision>,
) -> Result<Json<DecisionOutcome>, AppError> {
    let outcome = state
        .controller
        .decide_payment(authorized, payment_id, decision)
        .await?;
    tracing::info!(
        correlation_id = %correlation_id.0,
        payment_id = %payment_id,
        "Payment decided"
    );
    Ok(Json(outcome))
}
