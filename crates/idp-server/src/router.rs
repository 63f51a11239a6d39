//! Router configuration.

use axum::{routing::get, Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Creates the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::banner))
        .route("/metadata", get(handlers::metadata))
        .route("/sso", get(handlers::sso_redirect))
        .route("/login", get(handlers::login_form).post(handlers::login_submit))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Basic health check.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}
