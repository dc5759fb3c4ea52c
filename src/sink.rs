use async_trait::async_trait;
use std::error::Error;

/// Asynchronous transport for encoded log batches.
///
/// Implementations move an already-encoded NDJSON payload to a concrete
/// backend (VictoriaLogs, stdout, a test double). The shipper calls `send`
/// once per delivery attempt from its background task, or from the inline
/// runtime in synchronous mode, and never from an application thread in
/// asynchronous mode.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Deliver one payload to the underlying backend.
    ///
    /// **Parameters**
    /// - `payload`: newline-delimited JSON, one line per entry, each line
    ///   terminated by `\n`.
    ///
    /// **Returns**
    /// - `Ok(())` if the backend accepted the payload.
    /// - `Err(..)` if the backend failed (network error, HTTP status, etc.).
    ///   The shipper treats this as a transient failure and retries the
    ///   same payload on its fixed backoff schedule.
    ///
    /// Each call is bounded by the configured per-attempt timeout; an
    /// implementation does not need to enforce its own.
    async fn send(&self, payload: &str) -> Result<(), Box<dyn Error + Send + Sync>>;
}
