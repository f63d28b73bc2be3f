//! Ticket endpoints.
//!
//! - `POST /api/tickets/issue` - issue for a fully paid booking (admin)
//! - `GET /api/tickets?code=` or `?bookingId=` - look up a ticket
//! - `POST /api/tickets/validate` - door scan
//! - `POST /api/tickets/:code/void` - void (admin)

use crate::error::AppError;
use crate::extractors::{AdminGate, CorrelationId};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use soulpass_core::types::{BookingId, Ticket, TicketCode};
use soulpass_core::{AdmissionError, DateTime, Utc};
use soulpass_runtime::{ScanReceipt, TicketLookup, TicketView};

/// Issue request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTicketRequest {
    /// Fully paid booking
    pub booking_id: BookingId,
}

/// Lookup query; `code` wins when both are given
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketQuery {
    /// Printable code
    pub code: Option<String>,
    /// Owning booking
    pub booking_id: Option<BookingId>,
}

/// Scanned value: a printable code or a sealed QR payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateTicketRequest {
    /// What the scanner read
    #[serde(alias = "code", alias = "payload")]
    pub ticket_code: String,
}

/// Void request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoidTicketRequest {
    /// Reason stored on the ticket
    #[serde(default)]
    pub reason: Option<String>,
}

/// Door verdict.
///
/// Refused scans are still 200: the scanner shows the reason and the
/// original scan time instead of an error screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    /// Whether the holder may enter
    pub valid: bool,
    /// Accepted scan details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<ScanReceipt>,
    /// Stable refusal code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Human-readable refusal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Time of the first accepted scan, for `ALREADY_SCANNED`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanned_at: Option<DateTime<Utc>>,
}

impl ScanResponse {
    fn accepted(receipt: ScanReceipt) -> Self {
        Self {
            valid: true,
            receipt: Some(receipt),
            code: None,
            reason: None,
            scanned_at: None,
        }
    }

    /// Refusals shown at the door; anything else is a real error
    fn refused(error: AdmissionError) -> Result<Self, AdmissionError> {
        let scanned_at = match &error {
            AdmissionError::AlreadyScanned { scanned_at, .. } => Some(*scanned_at),
            AdmissionError::TicketNotFound(_)
            | AdmissionError::TicketVoided(_)
            | AdmissionError::ForgedPayload(_) => None,
            _ => return Err(error),
        };
        Ok(Self {
            valid: false,
            receipt: None,
            code: Some(error.code().to_string()),
            reason: Some(error.to_string()),
            scanned_at,
        })
    }
}

/// Issue the ticket of a fully paid booking (admin); idempotent
pub async fn issue_ticket(
    State(state): State<AppState>,
    AdminGate(authorized): AdminGate,
    Json(request): Json<IssueTicketRequest>,
) -> Result<Json<Ticket>, AppError> {
    Ok(Json(
        state
            .controller
            .issue_ticket(authorized, request.booking_id)
            .await?,
    ))
}

/// Look up a ticket by code or booking
pub async fn find_ticket(
    State(state): State<AppState>,
    Query(query): Query<TicketQuery>,
) -> Result<Json<TicketView>, AppError> {
    let lookup = match (query.code, query.booking_id) {
        (Some(code), _) => TicketLookup::Code(TicketCode::new(code)),
        (None, Some(booking_id)) => TicketLookup::Booking(booking_id),
        (None, None) => return Err(AppError::bad_request("code or bookingId is required")),
    };
    Ok(Json(state.controller.find_ticket(lookup).await?))
}

/// Scan a ticket at the door; accepted at most once
pub async fn validate_ticket(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    Json(request): Json<ValidateTicketRequest>,
) -> Result<Json<ScanResponse>, AppError> {
    let scanned = request.ticket_code.trim();
    if scanned.is_empty() {
        return Err(AppError::bad_request("ticketCode is required"));
    }

    let response = match state.controller.validate_ticket(scanned).await {
        Ok(receipt) => ScanResponse::accepted(receipt),
        Err(error) => ScanResponse::refused(error)?,
    };
    tracing::debug!(
        correlation_id = %correlation_id.0,
        valid = response.valid,
        "Scan answered"
    );
    Ok(Json(response))
}

/// Void a ticket (admin)
pub async fn void_ticket(
    State(state): State<AppState>,
    AdminGate(authorized): AdminGate,
    Path(code): Path<String>,
    Json(request): Json<VoidTicketRequest>,
) -> Result<Json<Ticket>, AppError> {
    let reason = request
        .reason
        .unwrap_or_else(|| "voided by operator".to_string());
    Ok(Json(
        state
            .controller
            .void_ticket(authorized, &TicketCode::new(code), reason)
            .await?,
    ))
}
