pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::proposal::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/proposals", post(handlers::handle_generate_proposal))
        .route("/api/v1/proposals/cancel", post(handlers::handle_cancel))
        .route("/api/v1/proposals/status", get(handlers::handle_status))
        .route(
            "/api/v1/proposals/latest/:section",
            get(handlers::handle_latest_section),
        )
        .with_state(state)
}
