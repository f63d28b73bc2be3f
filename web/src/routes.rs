//! Router configuration.
//!
//! Builds the complete Axum router with all endpoints.

use crate::handlers::{admin, availability, bookings, health, payments, tickets, tontine};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// Health and metrics sit at the root; everything else is under `/api`.
/// Admin routes are mounted like the others: the gate is evaluated by the
/// controller, so a missing token answers 401 rather than 404.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Inventory
        .route("/availability", get(availability::list_availability))
        .route("/availability/:pass_class", get(availability::check_availability))
        // Bookings
        .route("/bookings", post(bookings::create_booking))
        .route("/bookings/:id/status", get(bookings::booking_status))
        .route("/bookings/:id/identity", post(bookings::generate_identity))
        .route("/bookings/:id/cancel", post(bookings::cancel_booking))
        // Payments
        .route("/payments", post(payments::submit_payment))
        .route("/payments/pending", get(payments::pending_payments))
        .route("/payments/:id/decision", post(payments::decide_payment))
        // Installments
        .route("/tontine/:booking_id", get(tontine::tontine_progress))
        // Tickets
        .route("/tickets", get(tickets::find_ticket))
        .route("/tickets/issue", post(tickets::issue_ticket))
        .route("/tickets/validate", post(tickets::validate_ticket))
        .route("/tickets/:code/void", post(tickets::void_ticket))
        // Administration
        .route("/admin/pass-classes/:id/capacity", put(admin::set_capacity))
        .route("/admin/pass-classes/:id/price", put(admin::set_unit_price))
        .route("/admin/stats", get(admin::stats))
        .route("/admin/reset", post(admin::reset));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(correlation_id_layer())
        .with_state(state)
}
