//! MineCord Core - connection lifecycle and telemetry
//!
//! This crate owns everything with real state in the bridge:
//! - `connection`: per-endpoint connection manager (state machine, backoff, outbound queue)
//! - `event_bus`: typed publish/subscribe used by each manager
//! - `transport`: the game-protocol collaborator boundary and its TCP implementation
//! - `logs`: bounded per-source log buffers with snapshot + live streaming
//! - `fleet`: the set of all managers plus boot/cooldown policy

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod connection;
pub mod error;
pub mod event_bus;
pub mod fleet;
pub mod logs;
pub mod transport;

pub use config::{validate_endpoints, AuthMode, ConnectionConfig, Credentials, DEFAULT_GAME_PORT};
pub use connection::{
    Backoff, ConnectionManager, ConnectionState, ConnectionStatus, ManagerOptions, OutboundQueue,
    Phase, QueuedMessage, SendReport,
};
pub use error::{Error, Result};
pub use event_bus::{ConnectionEvent, EventBus, EventListener, ListenerHandle, Subscription};
pub use fleet::{ActionReport, EndpointStatus, Fleet, FleetOptions};
pub use logs::{
    LogAggregator, LogCaptureLayer, LogEntry, LogFeed, LogForwarder, LogLevel, LogSnapshot,
    LogSubscription, SYSTEM_SOURCE,
};
pub use transport::{GameConnector, GameLink, GameSession, JsonLineConnector, TransportEvent};
