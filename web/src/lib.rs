//! HTTP surface of the SoulPass booking ledger.
//!
//! The Axum layer is the imperative shell around the admission controller:
//! it parses JSON, evaluates the admin gate, calls the controller and maps
//! ledger errors to status codes. No business rule lives here.
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives at an Axum handler, tagged with a correlation ID
//! 2. **Extract** path, query, body and the admin gate
//! 3. **Call** the matching [`AdmissionController`](soulpass_runtime::AdmissionController) operation
//! 4. **Map** the result to JSON, or [`AppError`] to a `{code, message}` body
//!
//! # Example
//!
//! ```ignore
//! use soulpass_web::{AppState, routes::build_router};
//!
//! let state = AppState::new(controller, Some(admin_token));
//! let app = build_router(state);
//! axum::serve(listener, app).await?;
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod identity_client;
pub mod middleware;
pub mod routes;
pub mod state;

// Re-export key types for convenience
pub use config::{Config, ConfigError};
pub use error::AppError;
pub use extractors::{ADMIN_TOKEN_HEADER, AdminGate, CorrelationId};
pub use identity_client::ChatIdentityClient;
pub use middleware::{CORRELATION_ID_HEADER, CorrelationIdExt, correlation_id_layer};
pub use routes::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
