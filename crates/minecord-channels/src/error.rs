//! Error types for minecord-channels

use thiserror::Error;

/// Channel error type
#[derive(Debug, Error)]
pub enum Error {
    /// Discord error
    #[error("discord error: {0}")]
    Discord(String),

    /// The chat client has not connected yet
    #[error("chat client is not ready")]
    NotReady,

    /// Channel id is not a valid target
    #[error("invalid channel id: {0}")]
    InvalidChannel(u64),

    /// Error raised by the connection fleet
    #[error(transparent)]
    Core(#[from] minecord_core::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
