use crate::error::{Error, Result};
use serde::Deserialize;

/// Discord bot configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    /// Bot token (from DISCORD_TOKEN env)
    pub bot_token: String,
    /// Allowed guild (server) IDs (empty = allow all)
    #[serde(default)]
    pub allowed_guilds: Vec<u64>,
}

impl DiscordConfig {
    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let bot_token = std::env::var("DISCORD_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| Error::Discord("DISCORD_TOKEN not set".to_string()))?;

        let allowed_guilds = std::env::var("DISCORD_ALLOWED_GUILDS")
            .map(|s| parse_id_list(&s))
            .unwrap_or_default();

        Ok(Self {
            bot_token,
            allowed_guilds,
        })
    }

    /// Create with a bot token
    #[must_use]
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            allowed_guilds: Vec::new(),
        }
    }

    /// Set allowed guilds
    #[must_use]
    pub fn with_allowed_guilds(mut self, guilds: Vec<u64>) -> Self {
        self.allowed_guilds = guilds;
        self
    }
}

/// Parse a comma-separated id list, skipping anything that is not a number
pub(crate) fn parse_id_list(s: &str) -> Vec<u64> {
    s.split(',')
        .filter_map(|id| id.trim().parse().ok())
        .collect()
}
