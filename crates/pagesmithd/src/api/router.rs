//! API Router configuration

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;

/// Path of the build endpoint.
pub const BUILD_PATH: &str = "/api-endpoint";

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health_check))
        .route(BUILD_PATH, post(handlers::build))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
