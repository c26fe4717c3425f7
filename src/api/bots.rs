//! Bots file endpoints
//!
//! The panel edits `bots.json` as raw JSON. Changes take effect on restart.

use super::ApiState;
use crate::server::bots::{read_raw, write_raw};
use axum::extract::Extension;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};
use tracing::warn;

async fn get_bots(Extension(state): Extension<ApiState>) -> Json<Value> {
    Json(read_raw(&state.bots_file))
}

async fn save_bots(Extension(state): Extension<ApiState>, Json(body): Json<Value>) -> Response {
    if !body.is_object() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"ok": false, "error": "body must be a JSON object"})),
        )
            .into_response();
    }

    match write_raw(&state.bots_file, &body) {
        Ok(()) => Json(json!({"ok": true})).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to save bots file");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"ok": false, "error": e.to_string()})),
            )
                .into_response()
        }
    }
}

/// Create bots file routes
pub fn bots_routes() -> Router {
    Router::new().route("/api/bots", get(get_bots).post(save_bots))
}
