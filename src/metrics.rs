use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing import activity.
#[derive(Default)]
pub struct ImportMetrics {
    items_completed: AtomicU64,
    items_failed: AtomicU64,
    bulk_batches: AtomicU64,
}

impl ImportMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an item that reached a terminal status.
    pub fn record_item(&self, completed: bool) {
        let counter = if completed {
            &self.items_completed
        } else {
            &self.items_failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the start of a bulk import.
    pub fn record_batch(&self) {
        self.bulk_batches.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            items_completed: self.items_completed.load(Ordering::Relaxed),
            items_failed: self.items_failed.load(Ordering::Relaxed),
            bulk_batches: self.bulk_batches.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of import counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Items that finished with `COMPLETED` since startup.
    pub items_completed: u64,
    /// Items that finished with `FAILED` since startup.
    pub items_failed: u64,
    /// Bulk imports started since startup.
    pub bulk_batches: u64,
}
