use crate::connection::Phase;
use serde::Serialize;

/// Events published by a connection manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectionEvent {
    /// A chat line received from the game
    Chat {
        /// Line text as rendered by the game
        text: String,
    },
    /// Human-readable status change (connected, kicked, disconnected, ...)
    Status {
        /// Status text
        text: String,
    },
    /// The manager changed phase
    PhaseChanged {
        /// Previous phase
        from: Phase,
        /// New phase
        to: Phase,
    },
}

impl ConnectionEvent {
    /// Build a chat event
    #[must_use]
    pub fn chat(text: impl Into<String>) -> Self {
        Self::Chat { text: text.into() }
    }

    /// Build a status event
    #[must_use]
    pub fn status(text: impl Into<String>) -> Self {
        Self::Status { text: text.into() }
    }

    /// Short event name (`chat`, `status`, `phase_changed`)
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Chat { .. } => "chat",
            Self::Status { .. } => "status",
            Self::PhaseChanged { .. } => "phase_changed",
        }
    }
}
