use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Connection lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Never started
    Idle,
    /// Connect attempt in flight (transport up, waiting for spawn)
    Connecting,
    /// Spawned in game and usable
    Connected,
    /// Dropped; eligible for automatic retry
    Disconnected,
    /// Stopped on request; only an explicit start leaves this phase
    Stopped,
}

impl Phase {
    /// All phases, in lifecycle order
    pub const ALL: [Phase; 5] = [
        Phase::Idle,
        Phase::Connecting,
        Phase::Connected,
        Phase::Disconnected,
        Phase::Stopped,
    ];

    /// Whether moving from `self` to `next` is a legal transition
    #[must_use]
    pub fn can_transition_to(self, next: Phase) -> bool {
        use Phase::*;
        match (self, next) {
            // Connected -> Connecting only happens through a manual reconnect
            (Idle | Disconnected | Stopped | Connected, Connecting) => true,
            (Connecting, Connected) => true,
            (Connecting | Connected, Disconnected) => true,
            (Stopped, Stopped) => false,
            (_, Stopped) => true,
            _ => false,
        }
    }

    /// Lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Stopped => "stopped",
        }
    }

    /// Connecting or connected
    #[must_use]
    pub fn is_running(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected phase transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal phase transition {from} -> {to}")]
pub struct IllegalTransition {
    /// Current phase
    pub from: Phase,
    /// Requested phase
    pub to: Phase,
}
