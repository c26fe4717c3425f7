//! Connection lifecycle management
//!
//! One [`ConnectionManager`] per configured endpoint. The manager runs as a
//! single task owning its [`ConnectionState`]; handles send it commands and
//! read status through a watch channel.
//!
//! ## Phases
//!
//! ```text
//! idle ──start──▶ connecting ──spawned──▶ connected
//!                   │   ▲                    │
//!       terminated  │   │ retry / start      │ terminated
//!                   ▼   │                    ▼
//!                 disconnected ◀─────────────┘
//!
//! any ──stop──▶ stopped ──start──▶ connecting
//! ```

mod backoff;
mod manager;
mod phase;
mod queue;
mod state;

pub use backoff::{Backoff, BACKOFF_CEILING, BACKOFF_FLOOR, BACKOFF_MULTIPLIER};
pub use manager::{ConnectionManager, ManagerOptions, SendReport};
pub use phase::{IllegalTransition, Phase};
pub use queue::{OutboundQueue, QueuedMessage, DEFAULT_QUEUE_CAPACITY};
pub use state::{ConnectionState, ConnectionStatus};

#[cfg(test)]
mod tests;
