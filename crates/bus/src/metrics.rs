//! Per-subscription delivery metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Delivery counters for a single subscription
#[derive(Debug, Default)]
pub struct DeliveryMetrics {
    /// Messages enqueued for this subscriber
    delivered: AtomicU64,
    /// Messages lost to a full best-effort queue
    dropped: AtomicU64,
    /// Messages withheld by min-separation throttling
    filtered: AtomicU64,
}

impl DeliveryMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get delivered count
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Increment delivered count
    pub fn inc_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Get dropped count
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Increment dropped count
    pub fn inc_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get filtered count
    pub fn filtered(&self) -> u64 {
        self.filtered.load(Ordering::Relaxed)
    }

    /// Increment filtered count
    pub fn inc_filtered(&self) {
        self.filtered.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> DeliverySnapshot {
        DeliverySnapshot {
            delivered: self.delivered(),
            dropped: self.dropped(),
            filtered: self.filtered(),
        }
    }
}

/// Snapshot of delivery counters (for reporting)
#[derive(Debug, Clone, Copy, Default)]
pub struct DeliverySnapshot {
    pub delivered: u64,
    pub dropped: u64,
    pub filtered: u64,
}
