//! Booking endpoints.
//!
//! - `POST /api/bookings` - checkout
//! - `GET /api/bookings/:id/status` - buyer-facing status
//! - `POST /api/bookings/:id/identity` - generate a display identity
//! - `POST /api/bookings/:id/cancel` - cancel (admin)

use crate::error::AppError;
use crate::extractors::{AdminGate, CorrelationId};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use soulpass_core::types::{Booking, BookingId, BuyerId, BuyerIdentity, Money, PassClassId};
use soulpass_runtime::{BookingStatusView, IdentityRequest};

/// Checkout request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    /// Buyer account; a fresh id is assigned when absent
    #[serde(default)]
    pub buyer_id: Option<BuyerId>,
    /// Pass class slug
    #[serde(alias = "selectedPass")]
    pub pass_class: PassClassId,
    /// Price the buyer was shown
    #[serde(alias = "passPrice")]
    pub declared_price: Money,
}

/// Cancellation request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelBookingRequest {
    /// Reason recorded in the journal
    #[serde(default)]
    pub reason: Option<String>,
}

/// Reserve a pass at the price the buyer saw.
///
/// Answers 201 with the Pending booking.
pub async fn create_booking(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let buyer = request.buyer_id.unwrap_or_default();
    let booking = state
        .controller
        .create_booking(buyer, &request.pass_class, request.declared_price)
        .await?;

    tracing::info!(
        correlation_id = %correlation_id.0,
        booking_id = %booking.id,
        "Checkout accepted"
    );
    Ok((StatusCode::CREATED, Json(booking)))
}

/// Buyer-facing status with payments, installment progress and ticket code
pub async fn booking_status(
    State(state): State<AppState>,
    Path(booking_id): Path<BookingId>,
) -> Result<Json<BookingStatusView>, AppError> {
    Ok(Json(state.controller.booking_status(booking_id).await?))
}

/// Generate a display identity and attach it to the booking
pub async fn generate_identity(
    State(state): State<AppState>,
    Path(booking_id): Path<BookingId>,
    Json(request): Json<IdentityRequest>,
) -> Result<Json<BuyerIdentity>, AppError> {
    Ok(Json(
        state
            .controller
            .generate_identity(booking_id, request)
            .await?,
    ))
}

/// Cancel a booking that has no confirmed money (admin)
pub async fn cancel_booking(
    State(state): State<AppState>,
    AdminGate(authorized): AdminGate,
    Path(booking_id): Path<BookingId>,
    Json(request): Json<CancelBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    let reason = request
        .reason
        .unwrap_or_else(|| "cancelled by operator".to_string());
    Ok(Json(
        state
            .controller
            .cancel_booking(authorized, booking_id, reason)
            .await?,
    ))
}
