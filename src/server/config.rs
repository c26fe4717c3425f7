//! Server configuration types
//!
//! Contains all configuration structures for the MineCord server.

use anyhow::{bail, Result};
use minecord_core::{AuthMode, Backoff, ConnectionConfig, FleetOptions, ManagerOptions, DEFAULT_GAME_PORT};
use minecord_channels::DiscordConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Name of the only endpoint in single mode
pub const SINGLE_ENDPOINT_NAME: &str = "default";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_bots_file")]
    pub bots_file: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub discord: DiscordSection,
    #[serde(default)]
    pub fleet: FleetConfig,
    #[serde(default)]
    pub connection: ConnectionTuning,
    #[serde(default)]
    pub logs: LogsConfig,
    #[serde(default)]
    pub single: SingleConfig,
}

fn default_bots_file() -> String {
    "bots.json".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bots_file: default_bots_file(),
            server: ServerConfig::default(),
            discord: DiscordSection::default(),
            fleet: FleetConfig::default(),
            connection: ConnectionTuning::default(),
            logs: LogsConfig::default(),
            single: SingleConfig::default(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub web_ui_dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            web_ui_dir: None,
        }
    }
}

/// Discord section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscordSection {
    /// Bot token; empty means "use DISCORD_TOKEN"
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub allowed_guilds: Vec<u64>,
}

impl DiscordSection {
    /// Resolve the adapter config, falling back to the environment for the token
    pub fn resolve(&self) -> Result<DiscordConfig> {
        let config = if self.token.trim().is_empty() {
            DiscordConfig::from_env()?
        } else {
            DiscordConfig::new(self.token.trim())
        };
        Ok(if self.allowed_guilds.is_empty() {
            config
        } else {
            config.with_allowed_guilds(self.allowed_guilds.clone())
        })
    }
}

/// Boot and manual-action policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    pub start_delay_ms: u64,
    pub start_jitter_ms: u64,
    pub manual_cooldown_ms: u64,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            start_delay_ms: 15_000,
            start_jitter_ms: 3_000,
            manual_cooldown_ms: 15_000,
        }
    }
}

/// Per-connection tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionTuning {
    pub backoff_floor_ms: u64,
    pub backoff_ceiling_ms: u64,
    pub backoff_multiplier: f64,
    pub flush_delay_ms: u64,
    pub queue_capacity: usize,
    pub connect_timeout_ms: u64,
}

impl Default for ConnectionTuning {
    fn default() -> Self {
        Self {
            backoff_floor_ms: 2_000,
            backoff_ceiling_ms: 30_000,
            backoff_multiplier: 1.5,
            flush_delay_ms: 1_000,
            queue_capacity: 50,
            connect_timeout_ms: 10_000,
        }
    }
}

/// Log buffer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    pub capacity: usize,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self { capacity: 300 }
    }
}

/// The only endpoint when no bots file exists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_game_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub auth: AuthMode,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub channel_id: Option<u64>,
}

fn default_game_port() -> u16 {
    DEFAULT_GAME_PORT
}

impl Default for SingleConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_GAME_PORT,
            username: String::new(),
            auth: AuthMode::default(),
            version: None,
            channel_id: None,
        }
    }
}

impl SingleConfig {
    /// Endpoint config named [`SINGLE_ENDPOINT_NAME`]
    pub fn to_connection_config(&self) -> Result<ConnectionConfig> {
        if self.host.trim().is_empty() || self.username.trim().is_empty() {
            bail!(
                "no bots file and no single bot configured (set single.host and single.username)"
            );
        }
        let mut config = ConnectionConfig::new(SINGLE_ENDPOINT_NAME, self.host.trim(), self.username.trim())
            .with_port(self.port)
            .with_auth(self.auth);
        config.protocol_version_hint = self.version.clone().filter(|v| !v.trim().is_empty());
        config.channel_id = self.channel_id.filter(|id| *id != 0);
        Ok(config)
    }
}

impl AppConfig {
    /// Manager options from the `[connection]` section
    pub fn manager_options(&self) -> ManagerOptions {
        let c = &self.connection;
        ManagerOptions {
            backoff: Backoff::new(
                Duration::from_millis(c.backoff_floor_ms),
                Duration::from_millis(c.backoff_ceiling_ms),
                c.backoff_multiplier,
            ),
            flush_delay: Duration::from_millis(c.flush_delay_ms),
            queue_capacity: c.queue_capacity.max(1),
            ..ManagerOptions::default()
        }
    }

    /// Fleet options from the `[fleet]` and `[connection]` sections
    pub fn fleet_options(&self) -> FleetOptions {
        FleetOptions {
            start_delay: Duration::from_millis(self.fleet.start_delay_ms),
            start_jitter: Duration::from_millis(self.fleet.start_jitter_ms),
            manual_cooldown: Duration::from_millis(self.fleet.manual_cooldown_ms),
            manager: self.manager_options(),
        }
    }

    /// TCP connect timeout for the game gateway
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connection.connect_timeout_ms)
    }
}
