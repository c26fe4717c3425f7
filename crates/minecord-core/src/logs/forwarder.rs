use super::aggregator::{LogAggregator, LogLevel};
use crate::event_bus::{ConnectionEvent, EventListener};
use async_trait::async_trait;
use std::sync::Arc;

/// Copies one connection's bus events into its log buffer
pub struct LogForwarder {
    aggregator: Arc<LogAggregator>,
    source: String,
}

impl LogForwarder {
    /// Forward into `aggregator` under `source`, creating the buffer now
    #[must_use]
    pub fn new(aggregator: Arc<LogAggregator>, source: impl Into<String>) -> Self {
        let source = source.into();
        aggregator.ensure_source(&source);
        Self { aggregator, source }
    }
}

#[async_trait]
impl EventListener for LogForwarder {
    async fn on_event(&mut self, event: ConnectionEvent) -> anyhow::Result<()> {
        match event {
            ConnectionEvent::Chat { text } => {
                self.aggregator.push(&*self.source, LogLevel::Chat, text);
            }
            ConnectionEvent::Status { text } => {
                self.aggregator.push(&*self.source, LogLevel::Status, text);
            }
            ConnectionEvent::PhaseChanged { to, .. } => {
                self.aggregator
                    .push_parts(&*self.source, LogLevel::Log, ["phase:", to.as_str()]);
            }
        }
        Ok(())
    }
}
