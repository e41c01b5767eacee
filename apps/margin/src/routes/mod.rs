pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/constraints/extract",
            post(handlers::handle_extract),
        )
        .route("/api/v1/structure/analyze", post(handlers::handle_analyze))
        .route("/api/v1/generate", post(handlers::handle_generate))
        .with_state(state)
}
