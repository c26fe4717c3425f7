use super::adapter::DiscordAdapter;
use crate::bridge::{is_command, BridgeRouter};
use crate::message::InboundMessage;
use crate::util::mask_for_logging;
use serenity::all::{Channel, Context, EventHandler, Message, Ready};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, info};

/// Discord event handler
pub struct DiscordHandler {
    adapter: Arc<DiscordAdapter>,
    router: Arc<BridgeRouter>,
}

impl DiscordHandler {
    /// Create a new Discord event handler.
    pub fn new(adapter: Arc<DiscordAdapter>, router: Arc<BridgeRouter>) -> Self {
        Self { adapter, router }
    }

    /// Parent channel of a thread the bridge has no direct mapping for
    async fn thread_parent(&self, ctx: &Context, msg: &Message) -> Option<u64> {
        if self.router.channels().has_channel(msg.channel_id.get()) {
            return None;
        }
        match msg.channel_id.to_channel(ctx).await {
            Ok(Channel::Guild(channel)) if channel.thread_metadata.is_some() => {
                channel.parent_id.map(|id| id.get())
            }
            Ok(_) => None,
            Err(e) => {
                debug!(channel_id = msg.channel_id.get(), error = %e, "Channel lookup failed");
                None
            }
        }
    }
}

#[serenity::async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        let discriminator = ready
            .user
            .discriminator
            .map(|d| format!("#{}", d))
            .unwrap_or_default();
        info!(
            "Discord bot connected as {}{}",
            ready.user.name, discriminator
        );

        self.adapter
            .bot_user_id
            .store(ready.user.id.get(), Ordering::SeqCst);
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if !is_command(&msg.content) {
            return;
        }

        if let Some(gid) = msg.guild_id.map(|g| g.get()) {
            if !self.adapter.is_guild_allowed(gid) {
                debug!(guild_id = %gid, "Guild not allowed");
                return;
            }
        }

        let mut inbound = InboundMessage::new(
            msg.channel_id.get(),
            msg.author.name.clone(),
            msg.content.clone(),
        )
        .with_message_id(msg.id.get());
        if msg.author.bot || msg.author.id.get() == self.adapter.bot_user_id() {
            inbound = inbound.from_bot();
        } else if let Some(parent) = self.thread_parent(&ctx, &msg).await {
            inbound = inbound.in_thread_of(parent);
        }

        info!(
            channel_id = inbound.channel_id,
            author = %inbound.author_name,
            text = %mask_for_logging(&inbound.content),
            "Received Discord command"
        );

        self.router.on_message(&inbound).await;
    }
}
