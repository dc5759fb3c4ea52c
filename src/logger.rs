use crate::buffer::{IngestBuffer, Offer};
use crate::config::ShipperConfig;
use crate::context::{lookup_correlation, Context, TRACE_ID_KEY, USER_ID_KEY};
use crate::delivery::Delivery;
use crate::error::LoggerError;
use crate::lifecycle::{Lifecycle, LifecycleCell};
use crate::record::{Fields, LogEntry, LogLevel};
use crate::sink::LogSink;
use crate::stats::{ShipperStats, StatsSnapshot};
use crate::worker::BatchWorker;
use chrono::Utc;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// How often [`Logger::flush`] re-checks the buffer.
const FLUSH_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Handle used by application code to produce log entries.
///
/// Every logger derived from the same root shares one buffer, one worker,
/// one sink and one lifecycle. What each instance owns is its *scope*: the
/// service name, the fields merged into each entry, and a bound
/// [`Context`]. Derivation (`with_fields`, `with_service`, `with_context`,
/// `clone`) copies the scope, so a child and its parent never see each
/// other's later changes.
///
/// The per-level calls (`info`, `error`, ...) return nothing and never
/// block in asynchronous mode: when the buffer is full the entry is
/// dropped. Use [`Logger::offer`] or [`Logger::batch_log`] to observe drops.
pub struct Logger {
    shared: Arc<Shared>,
    scope: RwLock<Scope>,
}

#[derive(Clone, Debug)]
struct Scope {
    service: String,
    fields: Fields,
    context: Context,
}

struct Shared {
    config: Arc<ShipperConfig>,
    delivery: Delivery,
    dispatch: Dispatch,
    lifecycle: Arc<LifecycleCell>,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<ShipperStats>,
}

enum Dispatch {
    /// Asynchronous mode: entries go through the buffer to the worker.
    Buffered(IngestBuffer),
    /// Synchronous mode: entries are delivered on the caller's thread.
    Inline(InlineRuntime),
}

/// Private runtime used to drive inline deliveries.
///
/// Calls are driven from a scoped OS thread so blocking works the same
/// whether or not the caller is itself inside a tokio runtime.
struct InlineRuntime(Option<Runtime>);

impl InlineRuntime {
    fn new() -> Result<Self, LoggerError> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(InlineRuntime(Some(runtime)))
    }

    fn deliver(&self, delivery: &Delivery, batch: &[LogEntry]) -> Result<(), LoggerError> {
        let Some(runtime) = self.0.as_ref() else {
            return Err(LoggerError::Closed);
        };
        std::thread::scope(|scope| {
            scope
                .spawn(|| runtime.block_on(delivery.send(batch)))
                .join()
                .unwrap_or_else(|_| {
                    Err(LoggerError::Delivery {
                        attempts: 0,
                        reason: "inline delivery thread panicked".to_string(),
                    })
                })
        })
    }
}

impl Drop for InlineRuntime {
    fn drop(&mut self) {
        // dropping a runtime from async context panics; this does not
        if let Some(runtime) = self.0.take() {
            runtime.shutdown_background();
        }
    }
}

#[cfg(feature = "victorialogs")]
impl Logger {
    /// Build a logger shipping to the VictoriaLogs endpoint in `config`.
    ///
    /// In asynchronous mode this must be called from within a tokio
    /// runtime, which the background worker is spawned on.
    pub fn new(config: ShipperConfig) -> Result<Self, LoggerError> {
        use crate::victorialogs::{VictoriaLogsConfig, VictoriaLogsSink};

        config.validate()?;
        let sink = VictoriaLogsSink::new(VictoriaLogsConfig {
            url: config.url.clone(),
            stream_fields: config.stream_fields.clone(),
            timeout: config.timeout,
        })
        .map_err(|e| LoggerError::InvalidConfig(format!("cannot build HTTP client: {e}")))?;
        debug!("shipping log entries to {}", sink.endpoint());

        Self::with_sink(config, Arc::new(sink))
    }
}

impl Logger {
    /// Build a logger shipping through an arbitrary [`LogSink`].
    ///
    /// **Errors**
    /// - [`LoggerError::InvalidConfig`] if `config` does not validate.
    /// - [`LoggerError::NoRuntime`] in asynchronous mode outside a tokio
    ///   runtime.
    /// - [`LoggerError::Runtime`] if the synchronous-mode runtime cannot be
    ///   created.
    pub fn with_sink(config: ShipperConfig, sink: Arc<dyn LogSink>) -> Result<Self, LoggerError> {
        config.validate()?;

        let stats = Arc::new(ShipperStats::default());
        let delivery = Delivery::new(
            sink,
            config.max_retries,
            config.retry_backoff,
            config.timeout,
            Arc::clone(&stats),
        );
        let cancel = CancellationToken::new();
        let lifecycle = Arc::new(LifecycleCell::new());

        let (dispatch, worker) = if config.async_mode {
            Handle::try_current().map_err(|_| LoggerError::NoRuntime)?;
            let (buffer, receiver) = IngestBuffer::new(config.buffer_size, Arc::clone(&stats));
            let worker = BatchWorker::new(
                receiver,
                delivery.clone(),
                config.batch_size,
                config.flush_interval,
                config.flush_mode,
                cancel.clone(),
            );
            lifecycle.advance(Lifecycle::Created, Lifecycle::Running);
            (Dispatch::Buffered(buffer), Some(worker.spawn(Arc::clone(&lifecycle))))
        } else {
            let runtime = InlineRuntime::new()?;
            lifecycle.advance(Lifecycle::Created, Lifecycle::Running);
            (Dispatch::Inline(runtime), None)
        };

        debug!(
            "log shipper running for service {} (async: {})",
            config.service_name, config.async_mode
        );

        let scope = Scope {
            service: config.service_name.clone(),
            fields: Fields::new(),
            context: Context::background(),
        };
        let shared = Shared {
            config: Arc::new(config),
            delivery,
            dispatch,
            lifecycle,
            cancel,
            worker: Mutex::new(worker),
            stats,
        };

        Ok(Logger {
            shared: Arc::new(shared),
            scope: RwLock::new(scope),
        })
    }

    pub fn debug(&self, ctx: &Context, message: impl Into<String>, fields: Fields) {
        self.log(ctx, LogLevel::Debug, message, fields);
    }

    pub fn info(&self, ctx: &Context, message: impl Into<String>, fields: Fields) {
        self.log(ctx, LogLevel::Info, message, fields);
    }

    pub fn warn(&self, ctx: &Context, message: impl Into<String>, fields: Fields) {
        self.log(ctx, LogLevel::Warn, message, fields);
    }

    pub fn error(&self, ctx: &Context, message: impl Into<String>, fields: Fields) {
        self.log(ctx, LogLevel::Error, message, fields);
    }

    /// Ship a `FATAL` entry. The process is not terminated.
    pub fn fatal(&self, ctx: &Context, message: impl Into<String>, fields: Fields) {
        self.log(ctx, LogLevel::Fatal, message, fields);
    }

    /// Build an entry from this logger's scope and hand it to the shipper.
    /// Entries below the configured minimum level are discarded.
    pub fn log(&self, ctx: &Context, level: LogLevel, message: impl Into<String>, fields: Fields) {
        if level < self.shared.config.min_level {
            return;
        }
        let entry = self.entry(ctx, level, message, fields);
        let _ = self.offer(entry);
    }

    /// Create an entry stamped now, merging this logger's fields with
    /// `fields` (this logger's values win) and resolving correlation ids from
    /// `ctx`, then from the bound context.
    pub fn entry(&self, ctx: &Context, level: LogLevel, message: impl Into<String>, fields: Fields) -> LogEntry {
        let scope = self.read_scope();

        // instance fields are written last and win over call-site keys
        let mut merged = fields;
        merged.extend(scope.fields.iter().map(|(k, v)| (k.clone(), v.clone())));

        LogEntry {
            level,
            message: message.into(),
            timestamp: Utc::now(),
            service: scope.service.clone(),
            trace_id: correlation(ctx, &scope.context, TRACE_ID_KEY),
            user_id: correlation(ctx, &scope.context, USER_ID_KEY),
            fields: merged,
        }
    }

    /// Hand a finished entry to the shipper.
    ///
    /// In asynchronous mode this never waits and reports whether the entry
    /// made it into the buffer. In synchronous mode it delivers inline and
    /// blocks for up to `max_retries + 1` attempts.
    pub fn offer(&self, entry: LogEntry) -> Offer {
        ShipperStats::incr(&self.shared.stats.offered);
        match &self.shared.dispatch {
            Dispatch::Buffered(buffer) => buffer.offer(entry),
            Dispatch::Inline(runtime) => {
                if !self.shared.lifecycle.is_running() {
                    ShipperStats::incr(&self.shared.stats.dropped);
                    return Offer::Dropped;
                }
                match runtime.deliver(&self.shared.delivery, std::slice::from_ref(&entry)) {
                    Ok(()) => Offer::Delivered,
                    Err(_) => {
                        ShipperStats::incr(&self.shared.stats.dropped);
                        Offer::Dropped
                    }
                }
            }
        }
    }

    /// Submit pre-built entries as they are, without this logger's scope.
    ///
    /// **Errors**
    /// - [`LoggerError::BufferFull`] (asynchronous mode) at the first entry
    ///   the buffer rejects; entries before it stay queued, the rest are
    ///   not submitted.
    /// - [`LoggerError::Delivery`] (synchronous mode) when a chunk of at
    ///   most `batch_size` entries could not be delivered.
    /// - [`LoggerError::Closed`] after [`Logger::close`], or once the
    ///   background worker has stopped on its own.
    pub fn batch_log(&self, entries: Vec<LogEntry>) -> Result<(), LoggerError> {
        if !self.shared.lifecycle.is_running() {
            return Err(LoggerError::Closed);
        }

        match &self.shared.dispatch {
            Dispatch::Buffered(buffer) => {
                for entry in entries {
                    ShipperStats::incr(&self.shared.stats.offered);
                    if buffer.offer(entry) == Offer::Dropped {
                        return Err(LoggerError::BufferFull);
                    }
                }
                Ok(())
            }
            Dispatch::Inline(runtime) => {
                for chunk in entries.chunks(self.shared.config.batch_size) {
                    runtime.deliver(&self.shared.delivery, chunk)?;
                }
                Ok(())
            }
        }
    }

    /// Wait until the buffer has been drained by the worker.
    ///
    /// This does not wait for a delivery already in flight, so it signals
    /// "backlog drained", not "delivered". Returns immediately in
    /// synchronous mode and once the shipper is no longer running.
    pub async fn flush(&self) -> Result<(), LoggerError> {
        let Dispatch::Buffered(buffer) = &self.shared.dispatch else {
            return Ok(());
        };
        while self.shared.lifecycle.is_running() && !buffer.is_empty() {
            tokio::time::sleep(FLUSH_POLL_INTERVAL).await;
        }
        Ok(())
    }

    /// Stop the worker after it flushed what is pending, exactly once.
    ///
    /// Affects every logger sharing this root. Calling it again, from any
    /// of them, is a no-op.
    pub async fn close(&self) -> Result<(), LoggerError> {
        let mut worker = self.shared.worker.lock().await;
        if !self
            .shared
            .lifecycle
            .advance(Lifecycle::Running, Lifecycle::ShuttingDown)
        {
            debug!("log shipper already closed");
            return Ok(());
        }

        self.shared.cancel.cancel();
        if let Some(handle) = worker.take() {
            if let Err(e) = handle.await {
                error!("log shipper worker ended abnormally: {e}");
            }
        }

        self.shared
            .lifecycle
            .advance(Lifecycle::ShuttingDown, Lifecycle::Closed);
        debug!("log shipper closed");
        Ok(())
    }

    /// A child logger with `fields` merged over this logger's fields.
    pub fn with_fields(&self, fields: Fields) -> Logger {
        let mut scope = self.read_scope().clone();
        scope.fields.extend(fields);
        self.derive(scope)
    }

    /// A child logger attributing its entries to `service`.
    pub fn with_service(&self, service: impl Into<String>) -> Logger {
        let mut scope = self.read_scope().clone();
        scope.service = service.into();
        self.derive(scope)
    }

    /// A child logger using `ctx` for correlation ids the call-site context
    /// does not provide.
    pub fn with_context(&self, ctx: &Context) -> Logger {
        let mut scope = self.read_scope().clone();
        scope.context = ctx.clone();
        self.derive(scope)
    }

    /// Add or replace one field on this logger only.
    pub fn set_field(&self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.write_scope().fields.insert(key.into(), value.into());
    }

    pub fn service(&self) -> String {
        self.read_scope().service.clone()
    }

    pub fn fields(&self) -> Fields {
        self.read_scope().fields.clone()
    }

    pub fn config(&self) -> &ShipperConfig {
        &self.shared.config
    }

    pub fn state(&self) -> Lifecycle {
        self.shared.lifecycle.get()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Entries waiting in the buffer; always zero in synchronous mode.
    pub fn pending(&self) -> usize {
        match &self.shared.dispatch {
            Dispatch::Buffered(buffer) => buffer.len(),
            Dispatch::Inline(_) => 0,
        }
    }

    fn derive(&self, scope: Scope) -> Logger {
        Logger {
            shared: Arc::clone(&self.shared),
            scope: RwLock::new(scope),
        }
    }

    fn read_scope(&self) -> RwLockReadGuard<'_, Scope> {
        self.scope.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_scope(&self) -> RwLockWriteGuard<'_, Scope> {
        self.scope.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("scope", &*self.read_scope())
            .finish_non_exhaustive()
    }
}

impl Clone for Logger {
    fn clone(&self) -> Self {
        self.derive(self.read_scope().clone())
    }
}

fn correlation(call: &Context, bound: &Context, key: &str) -> Option<String> {
    lookup_correlation(call, key)
        .or_else(|| lookup_correlation(bound, key))
        .map(str::to_string)
}
