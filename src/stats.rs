use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every logger derived from the same root.
#[derive(Debug, Default)]
pub struct ShipperStats {
    /// Entries handed to the shipper, before any filtering by capacity.
    pub offered: AtomicU64,
    /// Successfully placed into the buffer.
    pub enqueued: AtomicU64,
    /// Dropped because the buffer was full or already released.
    pub dropped: AtomicU64,
    /// Batches accepted by the sink.
    pub delivered_batches: AtomicU64,
    /// Batches dropped after exhausting retries.
    pub failed_batches: AtomicU64,
    /// Individual send attempts, including retries.
    pub attempts: AtomicU64,
}

impl ShipperStats {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            offered: self.offered.load(Ordering::Relaxed),
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            delivered_batches: self.delivered_batches.load(Ordering::Relaxed),
            failed_batches: self.failed_batches.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ShipperStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub offered: u64,
    pub enqueued: u64,
    pub dropped: u64,
    pub delivered_batches: u64,
    pub failed_batches: u64,
    pub attempts: u64,
}
