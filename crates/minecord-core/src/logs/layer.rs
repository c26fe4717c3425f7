use super::aggregator::{LogAggregator, LogLevel, SYSTEM_SOURCE};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// Field that routes an event to an endpoint's buffer
const BOT_FIELD: &str = "bot";

/// `tracing_subscriber` layer copying every event into a [`LogAggregator`].
///
/// Events carrying a `bot` field land in that endpoint's buffer, the rest in
/// `system`. A `bot` value with no buffer goes to `system` with the field
/// kept in the text; the layer never creates buffers. ERROR maps to `error`,
/// WARN to `warn`, anything else to `log`.
pub struct LogCaptureLayer {
    aggregator: Arc<LogAggregator>,
}

impl LogCaptureLayer {
    /// Capture into `aggregator`
    #[must_use]
    pub fn new(aggregator: Arc<LogAggregator>) -> Self {
        Self { aggregator }
    }
}

impl<S: Subscriber> Layer<S> for LogCaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let level = match *event.metadata().level() {
            Level::ERROR => LogLevel::Error,
            Level::WARN => LogLevel::Warn,
            _ => LogLevel::Log,
        };
        let source = match visitor.bot.take() {
            Some(bot) if self.aggregator.has_source(&bot) => bot,
            Some(bot) => {
                visitor.fields.insert(0, format!("{}={}", BOT_FIELD, bot));
                SYSTEM_SOURCE.to_string()
            }
            None => SYSTEM_SOURCE.to_string(),
        };

        self.aggregator.push(source, level, visitor.into_text());
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<String>,
    bot: Option<String>,
}

impl FieldVisitor {
    fn record(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = value,
            BOT_FIELD => self.bot = Some(value),
            name => self.fields.push(format!("{}={}", name, value)),
        }
    }

    fn into_text(self) -> String {
        if self.fields.is_empty() {
            return self.message;
        }
        let fields = self.fields.join(" ");
        if self.message.is_empty() {
            fields
        } else {
            format!("{} {}", self.message, fields)
        }
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record(field, format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record(field, value.to_string());
    }
}
