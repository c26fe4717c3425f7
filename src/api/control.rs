//! Bot control endpoints
//!
//! - `GET /api/status`: config + live status per bot
//! - `POST /api/start/:name`, `POST /api/stop/:name`: manual actions (cooldown applies)
//! - `POST /api/broadcast`: send one chat line through every bot
//! - `POST /api/mc/:name/send`: send one chat line through one bot
//! - `POST /api/mc/sendAll`: broadcast, wrapped as `{ok, results}` for the panel

use super::ApiState;
use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use minecord_core::{ActionReport, EndpointStatus, SendReport};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::info;

/// Chat line request body
#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    pub text: String,
}

/// `POST /api/mc/sendAll` response
#[derive(Debug, Serialize)]
pub struct SendAllResponse {
    pub ok: bool,
    pub results: BTreeMap<String, SendReport>,
}

async fn status_all(Extension(state): Extension<ApiState>) -> Json<BTreeMap<String, EndpointStatus>> {
    Json(
        state
            .fleet
            .status_all()
            .into_iter()
            .map(|status| (status.config.name.clone(), status))
            .collect(),
    )
}

async fn start_bot(
    Extension(state): Extension<ApiState>,
    Path(name): Path<String>,
) -> Json<ActionReport> {
    let name = name.trim();
    if state.fleet.contains(name) {
        info!(bot = %name, "Manual start");
    }
    Json(state.fleet.start(name).await)
}

async fn stop_bot(
    Extension(state): Extension<ApiState>,
    Path(name): Path<String>,
) -> Json<ActionReport> {
    let name = name.trim();
    if state.fleet.contains(name) {
        info!(bot = %name, "Manual stop");
    }
    Json(state.fleet.stop(name).await)
}

async fn broadcast(
    Extension(state): Extension<ApiState>,
    Json(request): Json<BroadcastRequest>,
) -> Json<BTreeMap<String, SendReport>> {
    Json(state.fleet.broadcast(&request.text).await)
}

async fn send_one(
    Extension(state): Extension<ApiState>,
    Path(name): Path<String>,
    Json(request): Json<BroadcastRequest>,
) -> Response {
    let name = name.trim();
    let Some(manager) = state.fleet.get(name) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"ok": false, "error": format!("unknown bot: {}", name)})),
        )
            .into_response();
    };
    Json(manager.send_chat(&request.text).await).into_response()
}

async fn send_all(
    Extension(state): Extension<ApiState>,
    Json(request): Json<BroadcastRequest>,
) -> Response {
    if request.text.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"ok": false, "error": "empty message"})),
        )
            .into_response();
    }
    let results = state.fleet.broadcast(&request.text).await;
    Json(SendAllResponse { ok: true, results }).into_response()
}

/// Create control routes
pub fn control_routes() -> Router {
    Router::new()
        .route("/api/status", get(status_all))
        .route("/api/start/:name", post(start_bot))
        .route("/api/stop/:name", post(stop_bot))
        .route("/api/broadcast", post(broadcast))
        .route("/api/mc/sendAll", post(send_all))
        .route("/api/mc/:name/send", post(send_one))
}
