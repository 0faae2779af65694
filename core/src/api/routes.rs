//! API Routes
//!
//! Router configuration for the HTTP API.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use super::handlers::{self, ApiState};

/// Create the API router with all routes
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        // Health & Engine
        .route("/health", get(handlers::health))
        .route("/engine/committee", get(handlers::get_committee_info))
        // Governance
        .route("/admin/participants", post(handlers::admit_participant))
        .route("/admin/administrators", post(handlers::add_administrator))
        .route(
            "/admin/administrators/remove",
            post(handlers::remove_administrator),
        )
        .route("/admin/threshold", post(handlers::set_threshold))
        .route("/admin/threshold/get", post(handlers::get_threshold))
        // Transactions
        .route(
            "/transactions",
            get(handlers::list_transactions).post(handlers::submit_transaction),
        )
        .route("/transactions/{id}", get(handlers::get_transaction))
        .route("/transactions/{id}/flag", get(handlers::get_encrypted_flag))
        .route("/transactions/{id}/amount", get(handlers::get_encrypted_amount))
        .route(
            "/transactions/{id}/disclosure",
            post(handlers::request_disclosure),
        )
        // Engine callback
        .route("/engine/callback", post(handlers::disclosure_callback))
        // Audit events
        .route("/events", get(handlers::list_events))
        // CORS
        .layer(CorsLayer::permissive())
        .with_state(state)
}
