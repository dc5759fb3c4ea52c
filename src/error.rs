/// Errors surfaced by the shipper's construction and its synchronous or
/// batch-submission paths.
///
/// The per-level logging calls never return one of these; once an entry is
/// accepted into the buffer, failures are only reported through `tracing`
/// diagnostics and [`crate::stats::StatsSnapshot`].
#[derive(thiserror::Error, Debug)]
pub enum LoggerError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("asynchronous mode requires a running tokio runtime")]
    NoRuntime,

    #[error("failed to build inline delivery runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("buffer full")]
    BufferFull,

    #[error("log shipper is closed")]
    Closed,

    #[error("delivery failed after {attempts} attempts: {reason}")]
    Delivery { attempts: u32, reason: String },

    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(String),
}
