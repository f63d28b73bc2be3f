//! Seat availability endpoints.
//!
//! - `GET /api/availability` - every pass class
//! - `GET /api/availability/:pass_class` - one pass class

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
};
use soulpass_core::aggregates::inventory::Availability;
use soulpass_core::types::PassClassId;

/// Availability of every pass class, catalog order
pub async fn list_availability(State(state): State<AppState>) -> Json<Vec<Availability>> {
    Json(state.controller.list_availability().await)
}

/// Availability of one pass class.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/api/availability/neon-vibe
/// ```
///
/// Response:
/// ```json
/// {
///   "passClass": "neon-vibe",
///   "name": "Neon Vibe Pass",
///   "unitPrice": 10000,
///   "capacity": 50,
///   "sold": 12,
///   "held": 3,
///   "remaining": 38,
///   "open": 35
/// }
/// ```
pub async fn check_availability(
    State(state): State<AppState>,
    Path(pass_class): Path<String>,
) -> Result<Json<Availability>, AppError> {
    let availability = state
        .controller
        .check_availability(&PassClassId::new(pass_class))
        .await?;
    Ok(Json(availability))
}
