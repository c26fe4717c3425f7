//! Game protocol boundary
//!
//! A [`GameConnector`] opens a [`GameSession`] for an endpoint. The session
//! pairs a [`GameLink`] (outbound operations) with a receiver of
//! [`TransportEvent`]s raised by the game side.

mod tcp;

#[cfg(any(test, feature = "test-util"))]
pub mod memory;

pub use tcp::{JsonLineConnector, DEFAULT_CONNECT_TIMEOUT, MAX_FRAME_LENGTH};

use crate::config::ConnectionConfig;
use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Event raised by a game session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Logged in and spawned in the world; the session is usable
    Spawned,
    /// A rendered chat line
    ChatLine(String),
    /// Kicked by the server
    Kicked(String),
    /// Protocol or network error (the session may still be alive)
    Error(String),
    /// The session ended
    Disconnected,
}

/// Outbound half of a game session
pub trait GameLink: Send + Sync {
    /// Send a chat line (or slash command) to the game
    fn send_chat_line(&self, text: &str) -> Result<()>;

    /// Close the session. Safe to call more than once.
    fn close(&self);

    /// Whether the underlying transport is still up
    fn is_alive(&self) -> bool;
}

/// An open game session
pub struct GameSession {
    /// Outbound operations
    pub link: Box<dyn GameLink>,
    /// Events raised by the game side, in order
    pub events: mpsc::Receiver<TransportEvent>,
}

impl GameSession {
    /// Pair a link with its event stream
    #[must_use]
    pub fn new(link: Box<dyn GameLink>, events: mpsc::Receiver<TransportEvent>) -> Self {
        Self { link, events }
    }
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("alive", &self.link.is_alive())
            .finish()
    }
}

/// Opens game sessions
#[async_trait]
pub trait GameConnector: Send + Sync {
    /// Connect to the endpoint described by `config`
    async fn connect(&self, config: &ConnectionConfig) -> Result<GameSession>;
}
