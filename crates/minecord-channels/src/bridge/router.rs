use super::commands::{parse_command, BridgeCommand};
use super::format;
use super::mapping::{ChannelMap, Resolution};
use crate::message::{ChatSink, InboundMessage};
use crate::util::mask_for_logging;
use async_trait::async_trait;
use chrono::Utc;
use minecord_core::{ConnectionEvent, ConnectionManager, EventListener, Fleet, ListenerHandle};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Routes chat commands to connection managers and relays their events back
pub struct BridgeRouter {
    fleet: Arc<Fleet>,
    channels: ChannelMap,
    sink: Arc<dyn ChatSink>,
}

impl BridgeRouter {
    /// Create a router over `fleet`, replying through `sink`
    #[must_use]
    pub fn new(fleet: Arc<Fleet>, sink: Arc<dyn ChatSink>) -> Self {
        let channels = ChannelMap::new(fleet.managers().iter().map(|m| m.config()));
        Self {
            fleet,
            channels,
            sink,
        }
    }

    /// Channel mapping in use
    #[must_use]
    pub fn channels(&self) -> &ChannelMap {
        &self.channels
    }

    /// Relay chat and status events of every mapped endpoint to its channel.
    ///
    /// The bus listener only formats and queues. One sender task per channel
    /// performs the sends in order. Unsubscribing a handle lets its sender
    /// drain the queue and exit.
    pub fn spawn_relays(&self) -> Vec<ListenerHandle> {
        let mut handles = Vec::new();
        for manager in self.fleet.managers() {
            let name = manager.name();
            let Some(channel_id) = self.channels.channel_for(name) else {
                debug!(bot = %name, "No Discord channel, events not relayed");
                continue;
            };
            let (queue, pending) = mpsc::unbounded_channel();
            tokio::spawn(relay_sender(self.sink.clone(), channel_id, pending));
            let relay = Relay { queue };
            handles.push(manager.events().listen(format!("relay:{}", name), relay));
            info!(bot = %name, channel_id, "Relaying events to Discord");
        }
        handles
    }

    /// Handle a message and send the reply, if any, through the sink
    pub async fn on_message(&self, message: &InboundMessage) {
        let Some(reply) = self.handle_message(message).await else {
            return;
        };
        if let Err(e) = self.sink.reply(message, &reply).await {
            warn!(channel_id = message.channel_id, error = %e, "Failed to send bridge reply");
        }
    }

    /// Handle a message and return the reply text.
    ///
    /// `None` means the message is not for the bridge (bot author or no
    /// `!mc` prefix). Every command outcome, including errors, is a reply.
    pub async fn handle_message(&self, message: &InboundMessage) -> Option<String> {
        if message.author_is_bot {
            return None;
        }
        let command = parse_command(&message.content, |name| self.fleet.contains(name))?;

        debug!(
            channel_id = message.channel_id,
            author = %message.author_name,
            text = %mask_for_logging(&message.content),
            "Bridge command"
        );

        let reply = match command {
            BridgeCommand::List => {
                let statuses: Vec<_> = self.fleet.managers().iter().map(|m| m.status()).collect();
                format::list_reply(&statuses, Utc::now())
            }
            BridgeCommand::Status => match self.resolve(message) {
                Ok(manager) => format::status_block(&manager.status(), Utc::now()),
                Err(reply) => reply,
            },
            BridgeCommand::Reconnect => match self.resolve(message) {
                Ok(manager) => match manager.reconnect_now().await {
                    Ok(()) => format!("🔄 Reconnecting **{}**...", manager.name()),
                    Err(e) => format!("❌ {}", e),
                },
                Err(reply) => reply,
            },
            BridgeCommand::Say { target, text } => {
                self.forward(message, target, text, Forward::Chat).await
            }
            BridgeCommand::Cmd { target, text } => {
                self.forward(message, target, text, Forward::Command).await
            }
            BridgeCommand::Unknown => format::usage(),
        };
        Some(reply)
    }

    async fn forward(
        &self,
        message: &InboundMessage,
        target: Option<String>,
        text: String,
        kind: Forward,
    ) -> String {
        if text.is_empty() {
            return kind.usage();
        }
        if kind == Forward::Command && !text.starts_with('/') {
            return format::COMMAND_NEEDS_SLASH.to_string();
        }

        let manager = match target {
            Some(name) => match self.fleet.get(&name) {
                Some(manager) => manager,
                None => return format!("❌ Unknown bot: {}", name),
            },
            None => match self.resolve(message) {
                Ok(manager) => manager,
                Err(reply) => return format!("{}\n{}", reply, kind.usage()),
            },
        };

        let report = manager.send_chat(&text).await;
        match (report.ok, report.queued) {
            (true, true) => format!(
                "🕒 Queued for **{}** (not connected yet, {} waiting).",
                manager.name(),
                manager.status().queued
            ),
            (true, false) => kind.sent().to_string(),
            (false, _) => format!(
                "❌ Failed to send to **{}**: {}",
                manager.name(),
                report.error.unwrap_or_default()
            ),
        }
    }

    fn resolve(&self, message: &InboundMessage) -> Result<&Arc<ConnectionManager>, String> {
        match self
            .channels
            .resolve(message.channel_id, message.parent_channel_id)
        {
            Resolution::Single(name) => self
                .fleet
                .get(name)
                .ok_or_else(|| format!("❌ Unknown bot: {}", name)),
            Resolution::Unmapped => Err(format::not_linked()),
            Resolution::Ambiguous(names) => Err(format::ambiguous(names)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Forward {
    Chat,
    Command,
}

impl Forward {
    fn usage(self) -> String {
        match self {
            Self::Chat => format::say_usage(),
            Self::Command => format::cmd_usage(),
        }
    }

    fn sent(self) -> &'static str {
        match self {
            Self::Chat => format::SENT_CHAT,
            Self::Command => format::SENT_COMMAND,
        }
    }
}

struct Relay {
    queue: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl EventListener for Relay {
    async fn on_event(&mut self, event: ConnectionEvent) -> anyhow::Result<()> {
        if let Some(text) = format::relay_text(&event) {
            self.queue
                .send(text)
                .map_err(|_| anyhow::anyhow!("relay sender stopped"))?;
        }
        Ok(())
    }
}

async fn relay_sender(
    sink: Arc<dyn ChatSink>,
    channel_id: u64,
    mut pending: mpsc::UnboundedReceiver<String>,
) {
    while let Some(text) = pending.recv().await {
        if let Err(e) = sink.send_to_channel(channel_id, &text).await {
            warn!(channel_id, error = %e, "Failed to relay to Discord");
        }
    }
    debug!(channel_id, "Relay sender finished");
}
