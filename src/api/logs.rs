//! Log endpoints
//!
//! `GET /api/logs/stream` sends an `init` event with every buffer, then one
//! `log` event per entry. A client that falls behind gets a fresh `init`.

use super::ApiState;
use axum::extract::Extension;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use futures::Stream;
use minecord_core::{LogFeed, LogSnapshot};
use serde::Serialize;
use std::convert::Infallible;
use std::time::Duration;
use tracing::debug;

/// Keep-alive comment interval on log streams
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Every buffer, keyed by source
#[derive(Debug, Serialize)]
pub struct LogBuffers {
    pub buffers: LogSnapshot,
}

fn sse_event(name: &str, data: &impl Serialize) -> Option<Event> {
    Event::default().event(name).json_data(data).ok()
}

async fn logs_snapshot(Extension(state): Extension<ApiState>) -> Json<LogBuffers> {
    Json(LogBuffers {
        buffers: state.logs.snapshot(),
    })
}

async fn logs_stream(
    Extension(state): Extension<ApiState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let logs = state.logs.clone();
    let shutdown = state.shutdown.clone();

    let stream = async_stream::stream! {
        let mut subscription = logs.subscribe();
        let init = LogBuffers { buffers: std::mem::take(&mut subscription.snapshot) };
        if let Some(event) = sse_event("init", &init) {
            yield Ok(event);
        }

        loop {
            let feed = tokio::select! {
                _ = shutdown.cancelled() => None,
                feed = subscription.recv() => feed,
            };
            match feed {
                Some(LogFeed::Entry(entry)) => {
                    if let Some(event) = sse_event("log", &entry) {
                        yield Ok(event);
                    }
                }
                Some(LogFeed::Lagged(missed)) => {
                    debug!(missed, "Log stream lagged, resending buffers");
                    subscription = logs.subscribe();
                    let init = LogBuffers { buffers: std::mem::take(&mut subscription.snapshot) };
                    if let Some(event) = sse_event("init", &init) {
                        yield Ok(event);
                    }
                }
                None => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL).text("ping"))
}

/// Create log routes
pub fn logs_routes() -> Router {
    Router::new()
        .route("/api/logs", get(logs_snapshot))
        .route("/api/logs/stream", get(logs_stream))
}
