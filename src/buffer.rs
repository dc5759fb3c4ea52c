use crate::record::LogEntry;
use crate::stats::ShipperStats;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Outcome of handing an entry to the shipper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// Queued for the background worker.
    Enqueued,
    /// Delivered inline (synchronous mode).
    Delivered,
    /// Discarded: the buffer was full, the shipper was closed, or inline
    /// delivery failed.
    Dropped,
}

/// Bounded, multi-producer queue between call sites and the worker.
///
/// `offer` never waits: when the queue is at capacity the entry is dropped
/// and counted. Cloning shares the same queue.
#[derive(Clone)]
pub struct IngestBuffer {
    sender: mpsc::Sender<LogEntry>,
    stats: Arc<ShipperStats>,
}

impl IngestBuffer {
    /// Create a buffer holding at most `capacity` entries, returning the
    /// receiving half for the worker.
    pub fn new(capacity: usize, stats: Arc<ShipperStats>) -> (Self, mpsc::Receiver<LogEntry>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (IngestBuffer { sender, stats }, receiver)
    }

    pub fn offer(&self, entry: LogEntry) -> Offer {
        match self.sender.try_send(entry) {
            Ok(()) => {
                ShipperStats::incr(&self.stats.enqueued);
                Offer::Enqueued
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => {
                ShipperStats::incr(&self.stats.dropped);
                Offer::Dropped
            }
        }
    }

    /// Entries currently waiting for the worker.
    pub fn len(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured maximum number of queued entries.
    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }
}
