//! Log aggregation
//!
//! A [`LogAggregator`] keeps a bounded ring of [`LogEntry`]s per source
//! (`system` plus one per endpoint) and streams new entries to subscribers.
//! Two feeds write into it:
//!
//! - [`LogForwarder`]: an event-bus listener per connection manager
//! - [`LogCaptureLayer`]: a `tracing_subscriber` layer for process diagnostics
//!
//! Subscribers get a snapshot and a live receiver taken atomically, so the
//! stream continues exactly where the snapshot ends.

mod aggregator;
mod forwarder;
mod layer;

pub use aggregator::{
    LogAggregator, LogEntry, LogFeed, LogLevel, LogSnapshot, LogSubscription,
    DEFAULT_LOG_CAPACITY, SYSTEM_SOURCE,
};
pub use forwarder::LogForwarder;
pub use layer::LogCaptureLayer;
