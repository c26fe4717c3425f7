//! Configuration loading
//!
//! Handles loading configuration from embedded defaults, files, and environment.

use super::bots::{load_bots, BotsSource};
use super::config::AppConfig;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use std::path::Path;

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../../config/default.toml");

/// Load configuration from files and environment
pub fn load_config() -> Result<AppConfig> {
    let config = Config::builder()
        // 1. Embedded defaults (always available)
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        // 2. External overrides (optional)
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name("config/local").required(false))
        // 3. Environment variables (highest priority)
        // prefix_separator("_") so MINECORD_SERVER__PORT works (single _ after prefix).
        .add_source(
            Environment::with_prefix("MINECORD")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

/// Endpoints from the bots file, or the single bot when there is none
pub fn resolve_endpoints(config: &AppConfig) -> Result<BotsSource> {
    match load_bots(Path::new(&config.bots_file))? {
        Some(bots) => Ok(BotsSource::File(bots)),
        None => Ok(BotsSource::Single(config.single.to_connection_config()?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_defaults_parse() {
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.bots_file, "bots.json");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.fleet.start_delay_ms, 15_000);
        assert_eq!(config.fleet.start_jitter_ms, 3_000);
        assert_eq!(config.fleet.manual_cooldown_ms, 15_000);
        assert_eq!(config.connection.queue_capacity, 50);
        assert_eq!(config.logs.capacity, 300);
        assert!(config.discord.token.is_empty());
        assert!(config.single.host.is_empty());
    }

    #[test]
    fn test_single_mode_without_bots_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.bots_file = dir.path().join("missing.json").display().to_string();
        config.single.host = "localhost".to_string();
        config.single.username = "steve".to_string();

        match resolve_endpoints(&config).unwrap() {
            BotsSource::Single(single) => assert_eq!(single.name, "default"),
            other => panic!("expected single mode, got {:?}", other),
        }

        config.single.host.clear();
        assert!(resolve_endpoints(&config).is_err());
    }
}
