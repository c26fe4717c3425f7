//! Health check endpoint

use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Serialize;

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Create health routes
pub fn health_routes() -> Router {
    Router::new().route("/api/health", get(health_check))
}
