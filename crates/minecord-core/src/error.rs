//! Error types for minecord-core

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid endpoint configuration
    #[error("invalid configuration: {field}: {message}")]
    InvalidConfig {
        /// Config field name (prefixed with the endpoint index or name)
        field: String,
        /// Detailed message
        message: String,
    },

    /// Two endpoints share the same name
    #[error("duplicate endpoint name: {0}")]
    DuplicateEndpoint(String),

    /// No endpoint with this name is configured
    #[error("unknown bot: {0}")]
    UnknownEndpoint(String),

    /// Manual action attempted too soon after the previous one
    #[error("Cooldown active for {name}")]
    Cooldown {
        /// Endpoint name
        name: String,
        /// Milliseconds until the next manual action is accepted
        remaining_ms: u64,
    },

    /// Game transport failure (connect, framing, send)
    #[error("transport error: {0}")]
    Transport(String),

    /// The manager task has exited and no longer accepts commands
    #[error("connection manager for {0} is no longer running")]
    ManagerClosed(String),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error is a boot-time configuration problem
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. } | Self::DuplicateEndpoint(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
