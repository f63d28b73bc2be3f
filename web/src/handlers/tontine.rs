//! Installment progress endpoint.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use soulpass_core::aggregates::tontine::TontineProgress;
use soulpass_core::types::BookingId;

/// Query parameters of the progress endpoint
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressQuery {
    /// Box count the client believes is paid; compared, never trusted
    pub declared_boxes: Option<u64>,
}

/// Authoritative installment progress.
///
/// ```text
/// GET /api/tontine/:booking_id?declaredBoxes=4
/// ```
pub async fn tontine_progress(
    State(state): State<AppState>,
    Path(booking_id): Path<BookingId>,
    Query(query): Query<ProgressQuery>,
) -> Result<Json<TontineProgress>, AppError> {
    Ok(Json(
        state
            .controller
            .tontine_progress(booking_id, query.declared_boxes)
            .await?,
    ))
}
