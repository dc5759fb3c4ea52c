use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a shipper. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Lifecycle {
    Created,
    Running,
    ShuttingDown,
    Closed,
}

impl Lifecycle {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Lifecycle::Created,
            1 => Lifecycle::Running,
            2 => Lifecycle::ShuttingDown,
            _ => Lifecycle::Closed,
        }
    }
}

#[derive(Debug)]
pub(crate) struct LifecycleCell(AtomicU8);

impl LifecycleCell {
    pub(crate) fn new() -> Self {
        LifecycleCell(AtomicU8::new(Lifecycle::Created as u8))
    }

    pub(crate) fn get(&self) -> Lifecycle {
        Lifecycle::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move from `from` to `to`. Returns `false` if the current state was not
    /// `from`, leaving it untouched.
    pub(crate) fn advance(&self, from: Lifecycle, to: Lifecycle) -> bool {
        debug_assert!(from < to);
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn is_running(&self) -> bool {
        self.get() == Lifecycle::Running
    }
}
