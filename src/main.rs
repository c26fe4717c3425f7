//! MineCord - Discord <-> Minecraft bridge
//!
//! CLI entry point for the MineCord server.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use minecord_core::{LogAggregator, LogCaptureLayer};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod cli;
mod server;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let cli = cli::Cli::parse();
    let config = server::load_config()?;

    // Every tracing event also lands in the panel's log buffers
    let logs = Arc::new(LogAggregator::new(config.logs.capacity));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "minecord=info,minecord_core=info,minecord_channels=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(LogCaptureLayer::new(logs.clone()))
        .init();

    cli::run(cli, config, logs).await
}
