use axum::{
    Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::handlers;
use crate::server::AppState;

/// Create the main API router with state
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(health_check))
        .route(
            "/ingress/{namespace}/{broker}",
            post(handlers::ingress_event),
        )
        .route("/filter/{namespace}/{broker}", post(handlers::filter_event))
}

/// Health check endpoint for container health monitoring
async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}
