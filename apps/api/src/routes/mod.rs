pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::inbox::handlers;
use crate::postings::handlers as postings;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/jobs/score", post(handlers::handle_score))
        .route("/api/v1/scans", post(handlers::handle_scan_emails))
        .route("/api/v1/scans/inbox", post(handlers::handle_scan_inbox))
        .route("/api/v1/scans/links", post(postings::handle_scan_links))
        .route(
            "/api/v1/scans/:id/cancel",
            post(handlers::handle_cancel_scan),
        )
        .with_state(state)
}
