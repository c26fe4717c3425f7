//! EventBus - broadcast-based event system for connection events.
//!
//! Every connection manager owns one bus. The bridge router, log forwarders
//! and any other subscriber receive the same ordered stream of events.

/// Core event bus implementation (broadcast channel).
pub mod bus;
/// Event type definitions for the connection lifecycle.
pub mod types;

pub use bus::{EventBus, EventListener, ListenerHandle, Subscription};
pub use types::ConnectionEvent;
