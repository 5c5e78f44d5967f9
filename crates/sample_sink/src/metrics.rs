//! Per-consumer counters.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters for one consumer worker
#[derive(Debug, Default)]
pub struct ConsumerMetrics {
    /// Approximate queue depth at last send/recv
    queue_depth: AtomicUsize,
    /// Samples written successfully
    writes: AtomicU64,
    /// Failed writes
    write_failures: AtomicU64,
    /// Samples dropped because the queue was full
    dropped: AtomicU64,
}

impl ConsumerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_depth(&self) -> usize {
        self.queue_depth.load(Ordering::Relaxed)
    }

    pub fn set_queue_depth(&self, depth: usize) {
        self.queue_depth.store(depth, Ordering::Relaxed);
    }

    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn write_failures(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn record_write(&self, ok: bool) {
        if ok {
            self.writes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.write_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy for reporting
    pub fn snapshot(&self) -> ConsumerSnapshot {
        ConsumerSnapshot {
            queue_depth: self.queue_depth(),
            writes: self.writes(),
            write_failures: self.write_failures(),
            dropped: self.dropped(),
        }
    }
}

/// Reporting copy of [`ConsumerMetrics`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsumerSnapshot {
    pub queue_depth: usize,
    pub writes: u64,
    pub write_failures: u64,
    pub dropped: u64,
}
