//! Administrative endpoints (all gated).
//!
//! - `PUT /api/admin/pass-classes/:id/capacity`
//! - `PUT /api/admin/pass-classes/:id/price`
//! - `GET /api/admin/stats`
//! - `POST /api/admin/reset`

use crate::error::AppError;
use crate::extractors::{AdminGate, CorrelationId};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use soulpass_core::aggregates::inventory::Availability;
use soulpass_core::types::{Capacity, Money, PassClass, PassClassId};
use soulpass_runtime::{LedgerStats, ResetSummary};

/// New capacity
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityRequest {
    /// Seats
    pub capacity: u32,
}

/// New price for future bookings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRequest {
    /// Unit price
    pub unit_price: Money,
}

/// Change the capacity of a pass class
pub async fn set_capacity(
    State(state): State<AppState>,
    AdminGate(authorized): AdminGate,
    Path(pass_class): Path<String>,
    Json(request): Json<CapacityRequest>,
) -> Result<Json<Availability>, AppError> {
    Ok(Json(
        state
            .controller
            .set_capacity(
                authorized,
                &PassClassId::new(pass_class),
                Capacity::new(request.capacity),
            )
            .await?,
    ))
}

/// Change the price offered to new bookings; existing bookings keep theirs
pub async fn set_unit_price(
    State(state): State<AppState>,
    AdminGate(authorized): AdminGate,
    Path(pass_class): Path<String>,
    Json(request): Json<PriceRequest>,
) -> Result<Json<PassClass>, AppError> {
    Ok(Json(
        state
            .controller
            .set_unit_price(authorized, &PassClassId::new(pass_class), request.unit_price)
            .await?,
    ))
}

/// Dashboard figures
pub async fn stats(
    State(state): State<AppState>,
    AdminGate(authorized): AdminGate,
) -> Result<Json<LedgerStats>, AppError> {
    Ok(Json(state.controller.stats(authorized).await?))
}

/// Delete every booking, payment, installment record, identity and ticket.
///
/// The catalog survives.
pub async fn reset(
    State(state): State<AppState>,
    AdminGate(authorized): AdminGate,
    correlation_id: CorrelationId,
) -> Result<Json<ResetSummary>, AppError> {
    let summary = state.controller.reset(authorized).await?;
    tracing::warn!(correlation_id = %correlation_id.0, "Ledger reset over HTTP");
    Ok(Json(summary))
}
