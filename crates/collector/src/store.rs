//! MetricsStore - latency samples, windowed throughput, counters

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use contracts::{CountMessage, LatencySample, ThroughputWindow};

/// Process-wide metrics state
///
/// Created once at collector start and mutated only by the collector's
/// receive loop. Everyone else reads through [`MetricsHandle::snapshot`];
/// nothing is ever deleted except the bounded eviction of the oldest
/// throughput window.
#[derive(Debug)]
pub struct MetricsStore {
    latencies: Vec<LatencySample>,
    windows: VecDeque<ThroughputWindow>,
    history_capacity: usize,
    window_seconds: f64,
    window_started_at: f64,
    messages_in_window: u64,
    total_received: u64,
    skewed_samples: u64,
}

impl MetricsStore {
    /// Open the store with an empty first window starting `now`.
    pub fn new(window_seconds: f64, history_capacity: usize, now: f64) -> Self {
        Self {
            latencies: Vec::new(),
            windows: VecDeque::with_capacity(history_capacity),
            history_capacity,
            window_seconds,
            window_started_at: now,
            messages_in_window: 0,
            total_received: 0,
            skewed_samples: 0,
        }
    }

    /// Fold one message in: append its latency sample, close the current
    /// throughput window if it has run its course, then count the message.
    ///
    /// A message arriving past the window boundary closes the window and
    /// counts toward the next one; counting it into the window it closes
    /// would bias phase-aligned streams upward (6/1.0 instead of 5/1.0 at
    /// a steady 5 messages per second).
    ///
    /// Returns the sample and, when one closed, the finished window.
    pub fn record(
        &mut self,
        msg: &CountMessage,
        now: f64,
    ) -> (LatencySample, Option<ThroughputWindow>) {
        let sample = LatencySample::observed(msg.produced_at, now);
        if sample.clock_skewed {
            self.skewed_samples += 1;
        }
        self.latencies.push(sample);
        self.total_received += 1;

        let elapsed = now - self.window_started_at;
        let finished = if elapsed >= self.window_seconds {
            let window = ThroughputWindow {
                window_started_at: self.window_started_at,
                message_count: self.messages_in_window,
                elapsed_seconds: elapsed,
            };
            if self.windows.len() >= self.history_capacity {
                self.windows.pop_front();
            }
            self.windows.push_back(window);
            self.messages_in_window = 0;
            self.window_started_at = now;
            Some(window)
        } else {
            None
        };

        self.messages_in_window += 1;
        (sample, finished)
    }

    fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            latencies: self.latencies.clone(),
            windows: self.windows.iter().copied().collect(),
            total_received: self.total_received,
            skewed_samples: self.skewed_samples,
            messages_in_window: self.messages_in_window,
            window_started_at: self.window_started_at,
        }
    }
}

/// Point-in-time copy of the store (for the display consumer)
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Every latency sample observed so far, in arrival order
    pub latencies: Vec<LatencySample>,

    /// Completed throughput windows, oldest first, bounded by capacity
    pub windows: Vec<ThroughputWindow>,

    /// Messages received over the whole run
    pub total_received: u64,

    /// Samples flagged as clock skew
    pub skewed_samples: u64,

    /// Messages counted toward the currently open window
    pub messages_in_window: u64,

    /// When the open window started
    pub window_started_at: f64,
}

impl MetricsSnapshot {
    /// Mean latency over all samples, in milliseconds.
    pub fn mean_latency_ms(&self) -> Option<f64> {
        if self.latencies.is_empty() {
            return None;
        }
        Some(self.latencies.iter().map(|s| s.value_ms).sum::<f64>() / self.latencies.len() as f64)
    }

    /// Rate of the most recently completed window.
    pub fn last_rate(&self) -> Option<f64> {
        self.windows.last().map(ThroughputWindow::rate)
    }
}

/// Shared, lock-guarded access to one `MetricsStore`
///
/// The collector holds a clone for writes; display consumers hold clones
/// for `snapshot()`. Critical sections are short (one message or one
/// copy), so a snapshot may lag the loop by at most the message being
/// folded in - acceptable for a display-only reader.
#[derive(Debug, Clone)]
pub struct MetricsHandle {
    store: Arc<Mutex<MetricsStore>>,
}

impl MetricsHandle {
    /// Wrap a fresh store.
    pub fn new(store: MetricsStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    /// Fold one message in (collector loop only).
    pub fn record(&self, msg: &CountMessage, now: f64) -> (LatencySample, Option<ThroughputWindow>) {
        self.store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(msg, now)
    }

    /// Point-in-time copy for readers.
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(produced_at: f64) -> CountMessage {
        CountMessage {
            source_id: "cam_1".to_string(),
            count: 1,
            label: "test".to_string(),
            produced_at,
        }
    }

    #[test]
    fn test_window_rate_is_count_over_elapsed() {
        let mut store = MetricsStore::new(1.0, 10, 0.0);

        // 10 messages at a steady 5 msg/s, phase-aligned with the window
        let mut finished = None;
        for i in 0..10 {
            let now = i as f64 * 0.2;
            let (_, w) = store.record(&msg(now - 0.01), now);
            if w.is_some() {
                finished = w;
            }
        }

        let window = finished.expect("a window should have closed");
        // 5 messages landed inside the 1-second window
        assert_eq!(window.message_count, 5);
        assert!((window.rate() - 5.0).abs() / 5.0 < 0.01);
    }

    #[test]
    fn test_history_capacity_evicts_oldest() {
        let mut store = MetricsStore::new(1.0, 10, 0.0);

        // messages 1s apart: every arrival after the first closes a window
        for i in 0..=11 {
            let now = i as f64;
            let (_, finished) = store.record(&msg(now), now);
            assert_eq!(finished.is_some(), i >= 1);
        }

        let snapshot = store.snapshot();
        // 11 closed windows, bounded to the 10 most recent
        assert_eq!(snapshot.windows.len(), 10);
        // the first window (started at 0.0) was evicted
        assert!(snapshot.windows[0].window_started_at >= 1.0);
        assert!(snapshot.windows.iter().all(|w| w.message_count == 1));
    }

    #[test]
    fn test_negative_latency_flagged_not_clamped() {
        let mut store = MetricsStore::new(1.0, 10, 0.0);
        let (sample, _) = store.record(&msg(10.5), 10.0);

        assert!(sample.clock_skewed);
        assert!((sample.value_ms - -500.0).abs() < 1e-6);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.skewed_samples, 1);
        assert_eq!(snapshot.latencies.len(), 1);
        assert!(snapshot.latencies[0].value_ms < 0.0);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let handle = MetricsHandle::new(MetricsStore::new(1.0, 10, 0.0));
        let before = handle.snapshot();
        handle.record(&msg(0.5), 0.6);
        let after = handle.snapshot();

        assert_eq!(before.total_received, 0);
        assert_eq!(after.total_received, 1);
    }
}
