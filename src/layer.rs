use crate::context::{Context as LogContext, TRACE_ID_KEY, USER_ID_KEY};
use crate::logger::Logger;
use crate::record::{Fields, LogLevel};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Targets whose events are never shipped: this crate's own diagnostics
/// and the HTTP stack underneath the sink. Shipping them would feed every
/// delivery back into the buffer.
const IGNORED_TARGETS: &[&str] = &[env!("CARGO_CRATE_NAME"), "hyper", "reqwest", "h2", "rustls"];

/// `tracing_subscriber` layer that turns `tracing` events into shipped
/// entries through a [`Logger`].
///
/// The `message` field becomes the entry message; `trace_id` and `user_id`
/// string fields become correlation ids; every other field is kept as an
/// entry field along with the event target. By default only events at
/// `INFO` and above are forwarded.
pub struct ShipLayer {
    logger: Logger,
    max_verbosity: Level,
}

impl ShipLayer {
    pub fn new(logger: Logger) -> Self {
        ShipLayer {
            logger,
            max_verbosity: Level::INFO,
        }
    }

    /// Forward events at `level` and above (e.g. `Level::WARN` keeps
    /// `WARN` and `ERROR`).
    pub fn with_min_level(mut self, level: Level) -> Self {
        self.max_verbosity = level;
        self
    }

    fn ignored(target: &str) -> bool {
        IGNORED_TARGETS
            .iter()
            .any(|prefix| target == *prefix || target.starts_with(&format!("{prefix}::")))
    }
}

fn to_log_level(level: &Level) -> LogLevel {
    if *level == Level::ERROR {
        LogLevel::Error
    } else if *level == Level::WARN {
        LogLevel::Warn
    } else if *level == Level::INFO {
        LogLevel::Info
    } else {
        LogLevel::Debug
    }
}

impl<S> Layer<S> for ShipLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        // tracing orders levels by verbosity: TRACE is the greatest
        if *meta.level() > self.max_verbosity || Self::ignored(meta.target()) {
            return;
        }

        let mut fields = Fields::new();
        let mut message: Option<String> = None;
        event.record(&mut FieldVisitor {
            fields: &mut fields,
            message: &mut message,
        });

        let mut ctx = LogContext::background();
        for key in [TRACE_ID_KEY, USER_ID_KEY] {
            if let Some(serde_json::Value::String(id)) = fields.remove(key) {
                ctx = ctx.with_value(key, id);
            }
        }
        fields.insert("target".to_string(), serde_json::Value::from(meta.target()));

        self.logger.log(
            &ctx,
            to_log_level(meta.level()),
            message.unwrap_or_default(),
            fields,
        );
    }
}

pub struct FieldVisitor<'a> {
    pub fields: &'a mut Fields,
    pub message: &'a mut Option<String>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(format!("{:?}", value)));
        }
    }
}
