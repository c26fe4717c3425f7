//! CLI module for MineCord
//!
//! - `serve`: run the bridge and control panel (default)
//! - `check`: validate configuration and the bots file, then exit

use crate::server::config::AppConfig;
use clap::{Parser, Subcommand};
use minecord_core::LogAggregator;
use std::sync::Arc;

pub mod check;

/// MineCord bridge CLI
#[derive(Parser, Debug)]
#[command(name = "minecord")]
#[command(about = "Discord <-> Minecraft chat bridge")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the bridge and control panel (default)
    Serve,
    /// Validate configuration and exit
    Check,
}

/// Run the CLI command
pub async fn run(cli: Cli, config: AppConfig, logs: Arc<LogAggregator>) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => crate::server::run(config, logs).await,
        Commands::Check => check::run(&config),
    }
}
