use crate::config::FlushMode;
use crate::delivery::Delivery;
use crate::lifecycle::{Lifecycle, LifecycleCell};
use crate::record::LogEntry;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// The single consumer of the ingestion buffer.
///
/// Owns the receiving half of the buffer and the in-progress batch. It waits
/// on three things at once: cancellation, the next buffered entry, and the
/// flush interval tick. Batches leave in exactly the order entries were
/// dequeued.
pub struct BatchWorker {
    receiver: mpsc::Receiver<LogEntry>,
    delivery: Delivery,
    batch_size: usize,
    flush_interval: Duration,
    flush_mode: FlushMode,
    cancel: CancellationToken,
}

impl BatchWorker {
    pub fn new(
        receiver: mpsc::Receiver<LogEntry>,
        delivery: Delivery,
        batch_size: usize,
        flush_interval: Duration,
        flush_mode: FlushMode,
        cancel: CancellationToken,
    ) -> Self {
        BatchWorker {
            receiver,
            delivery,
            batch_size: batch_size.max(1),
            flush_interval,
            flush_mode,
            cancel,
        }
    }

    /// Spawn the worker on the current tokio runtime.
    ///
    /// If the worker ends without being asked to (its task panicked, or
    /// every producer went away) a still-running `lifecycle` moves to
    /// `Closed`.
    pub(crate) fn spawn(self, lifecycle: Arc<LifecycleCell>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut exit = WorkerExit {
                lifecycle,
                finished: false,
            };
            self.run().await;
            exit.finished = true;
        })
    }

    pub async fn run(mut self) {
        let mut ticker = interval(self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;

        let mut batch = self.new_batch();

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break,

                maybe = self.receiver.recv() => match maybe {
                    Some(entry) => {
                        batch.push(entry);
                        if self.flush_mode == FlushMode::PerEntry || batch.len() >= self.batch_size {
                            self.flush(&mut batch).await;
                        }
                    }
                    // every producer handle is gone
                    None => break,
                },

                _ = ticker.tick() => {
                    if !batch.is_empty() {
                        debug!("flush interval elapsed with {} pending entries", batch.len());
                        self.flush(&mut batch).await;
                    }
                }
            }
        }

        self.shutdown(batch).await;
    }

    /// Final pass: pull whatever is still queued behind the in-progress
    /// batch and flush it once, then release the receiver.
    async fn shutdown(mut self, mut batch: Vec<LogEntry>) {
        self.receiver.close();
        while let Ok(entry) = self.receiver.try_recv() {
            batch.push(entry);
        }

        if !batch.is_empty() {
            debug!("flushing {} entries on shutdown", batch.len());
            for chunk in batch.chunks(self.batch_size) {
                // failures are already reported by the delivery path
                let _ = self.delivery.send(chunk).await;
            }
        }
        debug!("log shipper worker stopped");
    }

    async fn flush(&self, batch: &mut Vec<LogEntry>) {
        let full = std::mem::replace(batch, self.new_batch());
        let _ = self.delivery.send(&full).await;
    }

    fn new_batch(&self) -> Vec<LogEntry> {
        Vec::with_capacity(self.batch_size.min(1024))
    }
}

/// Dropped with the worker task, whether it returned, panicked or was
/// aborted.
struct WorkerExit {
    lifecycle: Arc<LifecycleCell>,
    finished: bool,
}

impl Drop for WorkerExit {
    fn drop(&mut self) {
        if !self.lifecycle.advance(Lifecycle::Running, Lifecycle::Closed) {
            return;
        }
        if self.finished {
            debug!("log shipper worker stopped after every producer went away");
        } else {
            error!("log shipper worker ended abnormally, entries are no longer shipped");
        }
    }
}
