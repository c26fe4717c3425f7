//! Web API module for MineCord
//!
//! Provides the control panel endpoints:
//! - Health check
//! - Bot status, manual start/stop and broadcast
//! - Log snapshot and live log stream (SSE)
//! - Bots file read/write

pub mod bots;
pub mod control;
pub mod health;
pub mod logs;

use axum::{Extension, Router};
use minecord_core::{Fleet, LogAggregator};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub use bots::bots_routes;
pub use control::control_routes;
pub use health::health_routes;
pub use logs::logs_routes;

/// Shared handler state
#[derive(Clone)]
pub struct ApiState {
    pub fleet: Arc<Fleet>,
    pub logs: Arc<LogAggregator>,
    pub bots_file: Arc<PathBuf>,
    /// Cancelled at shutdown; ends open log streams
    pub shutdown: CancellationToken,
}

impl ApiState {
    pub fn new(
        fleet: Arc<Fleet>,
        logs: Arc<LogAggregator>,
        bots_file: PathBuf,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            fleet,
            logs,
            bots_file: Arc::new(bots_file),
            shutdown,
        }
    }
}

/// Create the API router with all endpoints
pub fn api_router(state: ApiState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(control_routes())
        .merge(logs_routes())
        .merge(bots_routes())
        .layer(Extension(state))
}
