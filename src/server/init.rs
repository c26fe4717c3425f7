//! Server initialization
//!
//! Builds the fleet, wires the bridge router and Discord adapter, serves the
//! control API and tears everything down on shutdown.

use super::config::AppConfig;
use super::loader::resolve_endpoints;
use super::shutdown::shutdown_signal;
use crate::api::{api_router, ApiState};
use anyhow::{Context, Result};
use axum::{routing::get, Router};
use minecord_channels::{BridgeRouter, DiscordAdapter};
use minecord_core::{Fleet, JsonLineConnector, LogAggregator};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn};

/// Run the bridge until a shutdown signal arrives
pub async fn run(config: AppConfig, logs: Arc<LogAggregator>) -> Result<()> {
    info!("Starting MineCord v{}", env!("CARGO_PKG_VERSION"));

    let discord = config
        .discord
        .resolve()
        .context("Discord token missing (set discord.token or DISCORD_TOKEN)")?;

    let source = resolve_endpoints(&config)?;
    let mode = source.mode();
    let connector = Arc::new(JsonLineConnector::new().with_connect_timeout(config.connect_timeout()));
    let fleet = Arc::new(
        Fleet::new(
            source.into_configs(),
            connector,
            logs.clone(),
            config.fleet_options(),
        )
        .context("Invalid bot configuration")?,
    );
    info!(mode, bots = fleet.len(), "Bots loaded");

    let shutdown = CancellationToken::new();

    // Discord adapter + bridge router
    let adapter = Arc::new(DiscordAdapter::new(discord));
    let router = Arc::new(BridgeRouter::new(fleet.clone(), adapter.clone()));
    if router.channels().is_empty() {
        warn!("No bot has a Discord channel; only explicit `!mc say <bot>` commands will work");
    }
    let relays = router.spawn_relays();

    let discord_token = shutdown.clone();
    let discord_handle = tokio::spawn(async move {
        tokio::select! {
            result = adapter.run(router) => {
                if let Err(e) = result {
                    error!(error = %e, "Discord adapter error");
                }
            }
            _ = discord_token.cancelled() => {
                info!("Discord adapter shutting down");
            }
        }
    });

    // Staggered boot runs in the background so the panel is up immediately
    let boot_fleet = fleet.clone();
    let boot_token = shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = boot_fleet.boot() => info!("Boot complete"),
            _ = boot_token.cancelled() => {}
        }
    });

    let state = ApiState::new(
        fleet.clone(),
        logs,
        PathBuf::from(&config.bots_file),
        shutdown.clone(),
    );
    let app = build_app(state, config.server.web_ui_dir.as_deref());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Panel listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .context("HTTP server error")?;

    shutdown.cancel();
    fleet.stop_all().await;
    for relay in relays {
        relay.unsubscribe();
    }

    match tokio::time::timeout(Duration::from_secs(5), discord_handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Discord adapter task error: {}", e),
        Err(_) => warn!("Discord adapter shutdown timeout, aborting"),
    }

    info!("MineCord shutdown complete");
    Ok(())
}

/// API routes plus the static panel when `web_ui_dir` exists
fn build_app(state: ApiState, web_ui_dir: Option<&str>) -> Router {
    let app = api_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    match web_ui_dir.map(Path::new).filter(|dir| dir.is_dir()) {
        Some(dir) => {
            info!("Web UI enabled: serving from {}", dir.display());
            app.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true))
        }
        None => app.route("/", get(|| async { "MineCord bridge" })),
    }
}
