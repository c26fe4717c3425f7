//! Message - platform-neutral chat types
//!
//! The bridge router only sees [`InboundMessage`]s and talks back through a
//! [`ChatSink`], so it can be driven without a live chat client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A chat message received from the chat platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Channel (or thread) the message was posted in
    pub channel_id: u64,
    /// Parent channel when `channel_id` is a thread
    pub parent_channel_id: Option<u64>,
    /// Platform message id (0 when unknown)
    pub message_id: u64,
    /// Author display name
    pub author_name: String,
    /// Whether the author is a bot account (including this bridge)
    pub author_is_bot: bool,
    /// Raw message text
    pub content: String,
    /// When the message was posted
    pub timestamp: DateTime<Utc>,
}

impl InboundMessage {
    /// Create a message from a human author
    #[must_use]
    pub fn new(channel_id: u64, author_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            channel_id,
            parent_channel_id: None,
            message_id: 0,
            author_name: author_name.into(),
            author_is_bot: false,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Set the platform message id
    #[must_use]
    pub fn with_message_id(mut self, message_id: u64) -> Self {
        self.message_id = message_id;
        self
    }

    /// Mark the message as posted in a thread of `parent`
    #[must_use]
    pub fn in_thread_of(mut self, parent: u64) -> Self {
        self.parent_channel_id = Some(parent);
        self
    }

    /// Mark the author as a bot
    #[must_use]
    pub fn from_bot(mut self) -> Self {
        self.author_is_bot = true;
        self
    }
}

/// Outbound side of the chat platform
#[async_trait]
pub trait ChatSink: Send + Sync {
    /// Send `text` to a channel, split into ordered chunks when too long
    async fn send_to_channel(&self, channel_id: u64, text: &str) -> crate::Result<()>;

    /// Reply to `message` in its channel
    async fn reply(&self, message: &InboundMessage, text: &str) -> crate::Result<()>;
}
