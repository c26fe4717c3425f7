use super::config::DiscordConfig;
use super::handler::DiscordHandler;
use crate::bridge::BridgeRouter;
use crate::error::{Error, Result};
use crate::message::{ChatSink, InboundMessage};
use crate::util::{split_into_chunks, DISCORD_MESSAGE_LIMIT};

use serenity::all::{ChannelId, Client, CreateMessage, GatewayIntents, MessageId, MessageReference};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

/// Discord bot adapter
pub struct DiscordAdapter {
    pub(crate) config: DiscordConfig,
    pub(crate) bot_user_id: AtomicU64,
    pub(crate) http: RwLock<Option<Arc<serenity::http::Http>>>,
}

impl DiscordAdapter {
    /// Create a new Discord adapter
    #[must_use]
    pub fn new(config: DiscordConfig) -> Self {
        Self {
            config,
            bot_user_id: AtomicU64::new(0),
            http: RwLock::new(None),
        }
    }

    /// Create from environment
    pub fn from_env() -> Result<Self> {
        let config = DiscordConfig::from_env()?;
        Ok(Self::new(config))
    }

    /// Check if a guild is allowed
    pub fn is_guild_allowed(&self, guild_id: u64) -> bool {
        self.config.allowed_guilds.is_empty() || self.config.allowed_guilds.contains(&guild_id)
    }

    /// Get the bot user ID (0 until the gateway is ready)
    pub fn bot_user_id(&self) -> u64 {
        self.bot_user_id.load(Ordering::SeqCst)
    }

    /// Connect to the gateway and feed `!mc` messages to `router` until the
    /// client stops
    #[instrument(skip(self, router))]
    pub async fn run(self: Arc<Self>, router: Arc<BridgeRouter>) -> Result<()> {
        info!("Starting Discord bot");

        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;

        let handler = DiscordHandler::new(self.clone(), router);

        let mut client = Client::builder(&self.config.bot_token, intents)
            .event_handler(handler)
            .await
            .map_err(|e| Error::Discord(format!("Failed to create client: {}", e)))?;

        {
            let mut http_guard = self.http.write().await;
            *http_guard = Some(client.http.clone());
        }

        client
            .start()
            .await
            .map_err(|e| Error::Discord(format!("Client error: {}", e)))?;

        Ok(())
    }

    async fn deliver(&self, channel_id: u64, text: &str, reply_to: Option<u64>) -> Result<()> {
        if channel_id == 0 {
            return Err(Error::InvalidChannel(channel_id));
        }

        let http_guard = self.http.read().await;
        let http = http_guard.as_ref().ok_or(Error::NotReady)?;

        let channel = ChannelId::new(channel_id);
        let reference = reply_to
            .filter(|id| *id != 0)
            .map(|id| MessageReference::from((channel, MessageId::new(id))));

        let chunks = split_into_chunks(text, DISCORD_MESSAGE_LIMIT);
        debug!(channel_id, chunks = chunks.len(), "Sending Discord message");

        for (i, chunk) in chunks.iter().enumerate() {
            let mut builder = CreateMessage::new().content(chunk);
            // Only the first chunk points at the invoking message
            if let (0, Some(reference)) = (i, reference.clone()) {
                builder = builder.reference_message(reference);
            }

            channel
                .send_message(http, builder)
                .await
                .map_err(|e| Error::Discord(format!("Failed to send message: {}", e)))?;
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl ChatSink for DiscordAdapter {
    async fn send_to_channel(&self, channel_id: u64, text: &str) -> Result<()> {
        self.deliver(channel_id, text, None).await
    }

    async fn reply(&self, message: &InboundMessage, text: &str) -> Result<()> {
        self.deliver(message.channel_id, text, Some(message.message_id))
            .await
    }
}
