use crate::error::LoggerError;
use crate::record::LogEntry;
use crate::sink::LogSink;
use crate::stats::ShipperStats;
use crate::wire::encode_batch;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, warn};

/// Encodes batches and pushes them through a [`LogSink`] with bounded,
/// linearly backed-off retries.
///
/// A batch gets one initial attempt plus up to `max_retries` more. After
/// failed attempt `i` (counting from zero) the sender waits
/// `(i + 1) * backoff` before trying again; there is no wait after the last
/// attempt. A batch that still fails is dropped, never re-queued.
#[derive(Clone)]
pub struct Delivery {
    sink: Arc<dyn LogSink>,
    max_retries: u32,
    backoff: Duration,
    attempt_timeout: Duration,
    stats: Arc<ShipperStats>,
}

impl Delivery {
    pub fn new(
        sink: Arc<dyn LogSink>,
        max_retries: u32,
        backoff: Duration,
        attempt_timeout: Duration,
        stats: Arc<ShipperStats>,
    ) -> Self {
        Delivery {
            sink,
            max_retries,
            backoff,
            attempt_timeout,
            stats,
        }
    }

    /// Delay slept after failed attempt `attempt` (zero-based), saturating
    /// at `Duration::MAX`.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        self.backoff
            .checked_mul(attempt.saturating_add(1))
            .unwrap_or(Duration::MAX)
    }

    /// Encode `batch` and deliver it.
    ///
    /// **Returns**
    /// - `Ok(())` once the sink accepted the payload, or when nothing in the
    ///   batch could be encoded.
    /// - `Err(LoggerError::Delivery)` after `max_retries + 1` failed attempts.
    pub async fn send(&self, batch: &[LogEntry]) -> Result<(), LoggerError> {
        if batch.is_empty() {
            return Ok(());
        }

        let (payload, lines) = encode_batch(batch);
        if lines == 0 {
            warn!("no entry of a {}-entry batch could be encoded, nothing sent", batch.len());
            return Ok(());
        }
        debug!("sending log batch of {lines} entries");

        let attempts = self.max_retries.saturating_add(1);
        let mut last_err = String::new();
        for attempt in 0..attempts {
            ShipperStats::incr(&self.stats.attempts);
            match timeout(self.attempt_timeout, self.sink.send(&payload)).await {
                Ok(Ok(())) => {
                    ShipperStats::incr(&self.stats.delivered_batches);
                    return Ok(());
                }
                Ok(Err(e)) => last_err = e.to_string(),
                Err(_) => last_err = format!("attempt timed out after {:?}", self.attempt_timeout),
            }

            if attempt + 1 < attempts {
                let delay = self.backoff_after(attempt);
                warn!("log batch delivery failed ({last_err}), retrying in {delay:?}");
                sleep(delay).await;
            }
        }

        ShipperStats::incr(&self.stats.failed_batches);
        error!("dropping log batch of {lines} entries after {attempts} attempts: {last_err}");
        Err(LoggerError::Delivery {
            attempts,
            reason: last_err,
        })
    }
}
