//! Custom Axum extractors.
//!
//! - `CorrelationId`: read or generate the request correlation ID
//! - `AdminGate`: whether the caller presented the admin token
//!
//! # Examples
//!
//! ```ignore
//! async fn handler(
//!     State(state): State<AppState>,
//!     AdminGate(authorized): AdminGate,
//! ) -> Result<Json<LedgerStats>, AppError> {
//!     Ok(Json(state.controller.stats(authorized).await?))
//! }
//! ```

use crate::middleware::CORRELATION_ID_HEADER;
use crate::state::AppState;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::convert::Infallible;
use uuid::Uuid;

/// Header carrying the admin token.
pub const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";

/// Correlation ID for request tracing.
///
/// Prefers the ID stored by the correlation middleware, then the
/// `X-Correlation-ID` header, then a fresh UUID v4.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let correlation_id = parts
            .extensions
            .get::<Uuid>()
            .copied()
            .or_else(|| {
                parts
                    .headers
                    .get(CORRELATION_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| Uuid::parse_str(s).ok())
            })
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// Result of the admin check.
///
/// Never rejects: the boolean is handed to the controller, which refuses
/// admin operations with `Unauthorized` when it is `false`. Without a
/// configured token every caller is denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminGate(pub bool);

#[async_trait]
impl<S> FromRequestParts<S> for AdminGate
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let presented = parts
            .headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok());

        Ok(Self(token_matches(state.admin_token(), presented)))
    }
}

/// Constant-time comparison of the presented token against the configured one
#[must_use]
pub fn token_matches(expected: Option<&str>, presented: Option<&str>) -> bool {
    match (expected, presented) {
        (Some(expected), Some(presented)) => {
            constant_time_eq::constant_time_eq(expected.as_bytes(), presented.as_bytes())
        }
        _ => false,
    }
}
