//! Endpoint configuration
//!
//! One [`ConnectionConfig`] per configured game endpoint. Configs are loaded
//! once at boot and never mutated afterwards.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

/// Default game server port
pub const DEFAULT_GAME_PORT: u16 = 25565;

/// Account authentication mode used when logging into the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Online-mode account (default)
    #[default]
    Microsoft,
    /// Offline / cracked servers, username only
    Offline,
}

impl AuthMode {
    /// Lowercase wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Microsoft => "microsoft",
            Self::Offline => "offline",
        }
    }
}

/// Login credentials for one endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// In-game username
    pub username: String,
    /// Authentication mode
    #[serde(default)]
    pub auth: AuthMode,
}

/// Configuration of a single game endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Unique endpoint name
    pub name: String,
    /// Game server host
    pub host: String,
    /// Game server port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Login credentials
    #[serde(flatten)]
    pub credentials: Credentials,
    /// Protocol version hint passed to the game client
    #[serde(default, alias = "version", skip_serializing_if = "Option::is_none")]
    pub protocol_version_hint: Option<String>,
    /// Auto-start on boot
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Discord channel bridged to this endpoint
    #[serde(
        default,
        alias = "channelId",
        deserialize_with = "deserialize_snowflake",
        skip_serializing_if = "Option::is_none"
    )]
    pub channel_id: Option<u64>,
}

fn default_port() -> u16 {
    DEFAULT_GAME_PORT
}

fn default_true() -> bool {
    true
}

impl ConnectionConfig {
    /// Create a config with defaults for everything but the required fields
    #[must_use]
    pub fn new(name: impl Into<String>, host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port: DEFAULT_GAME_PORT,
            credentials: Credentials {
                username: username.into(),
                auth: AuthMode::default(),
            },
            protocol_version_hint: None,
            enabled: true,
            channel_id: None,
        }
    }

    /// Set the port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the auth mode
    #[must_use]
    pub fn with_auth(mut self, auth: AuthMode) -> Self {
        self.credentials.auth = auth;
        self
    }

    /// Set the bridged Discord channel
    #[must_use]
    pub fn with_channel(mut self, channel_id: u64) -> Self {
        self.channel_id = Some(channel_id);
        self
    }

    /// Set the enabled flag
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// `host:port`
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check required fields on a single config
    pub fn validate(&self, index: usize) -> Result<()> {
        let required = [
            ("name", &self.name),
            ("host", &self.host),
            ("username", &self.credentials.username),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::InvalidConfig {
                    field: format!("bots[{}].{}", index, field),
                    message: "must not be empty".to_string(),
                });
            }
        }
        if self.port == 0 {
            return Err(Error::InvalidConfig {
                field: format!("bots[{}].port", index),
                message: "must be between 1 and 65535".to_string(),
            });
        }
        Ok(())
    }
}

/// Validate an endpoint list and normalize names (trimmed)
///
/// Fails on an empty list, a missing required field, or a duplicate name.
pub fn validate_endpoints(configs: &mut [ConnectionConfig]) -> Result<()> {
    if configs.is_empty() {
        return Err(Error::InvalidConfig {
            field: "bots".to_string(),
            message: "at least one bot must be configured".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for (index, config) in configs.iter_mut().enumerate() {
        config.name = config.name.trim().to_string();
        config.host = config.host.trim().to_string();
        config.validate(index)?;
        if !seen.insert(config.name.clone()) {
            return Err(Error::DuplicateEndpoint(config.name.clone()));
        }
    }
    Ok(())
}

/// Discord snowflakes arrive as JSON strings or numbers
fn deserialize_snowflake<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Snowflake {
        Number(u64),
        Text(String),
    }

    match Option::<Snowflake>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Snowflake::Number(id)) => Ok(Some(id)),
        Some(Snowflake::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Snowflake::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid channel id: {}", s))),
    }
}
