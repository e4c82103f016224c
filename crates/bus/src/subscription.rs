//! Subscription - per-subscriber queue with non-blocking reads

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use contracts::{DropPolicy, Reliability, TopicQos};
use tracing::trace;

use crate::metrics::DeliveryMetrics;
use crate::topic::BusMessage;

/// Mutable per-subscriber state, all under one lock so a publisher's
/// deliveries to this subscriber serialize in publish order.
struct SubState<M> {
    queue: VecDeque<M>,
    latest: Option<M>,
    last_delivered: Option<Instant>,
}

/// Shared half of a subscription, owned jointly by the `Subscription`
/// handle and the topic's subscriber list.
pub(crate) struct SubShared<M> {
    state: Mutex<SubState<M>>,
    metrics: Arc<DeliveryMetrics>,
    closed: AtomicBool,
    topic_name: String,
}

impl<M: BusMessage> SubShared<M> {
    pub(crate) fn new(topic_name: String, seed: Option<M>) -> Self {
        let mut queue = VecDeque::new();
        let latest = seed.clone();
        if let Some(msg) = seed {
            queue.push_back(msg);
        }
        Self {
            state: Mutex::new(SubState {
                queue,
                latest,
                last_delivered: None,
            }),
            metrics: Arc::new(DeliveryMetrics::new()),
            closed: AtomicBool::new(false),
            topic_name,
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    /// Deliver one message under the topic's QoS. Called by publishers.
    pub(crate) fn deliver(&self, msg: M, qos: &TopicQos) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if qos.min_separation_seconds > 0.0 {
            if let Some(last) = state.last_delivered {
                if last.elapsed().as_secs_f64() < qos.min_separation_seconds {
                    self.metrics.inc_filtered();
                    trace!(topic = %self.topic_name, "delivery filtered (min separation)");
                    return;
                }
            }
        }

        if qos.reliability == Reliability::BestEffort && state.queue.len() >= qos.queue_depth {
            match qos.drop_policy {
                DropPolicy::DropNewest => {
                    self.metrics.inc_dropped();
                    trace!(topic = %self.topic_name, "message dropped (newest)");
                    return;
                }
                DropPolicy::DropOldest => {
                    state.queue.pop_front();
                    self.metrics.inc_dropped();
                    trace!(topic = %self.topic_name, "message dropped (oldest)");
                }
            }
        }

        state.latest = Some(msg.clone());
        state.queue.push_back(msg);
        state.last_delivered = Some(Instant::now());
        self.metrics.inc_delivered();
    }
}

/// Handle to one subscriber's view of a topic
///
/// Dropping the handle unregisters the subscriber; messages published
/// afterwards are no longer delivered to it.
pub struct Subscription<M> {
    shared: Arc<SubShared<M>>,
}

impl<M: BusMessage> Subscription<M> {
    pub(crate) fn from_shared(shared: Arc<SubShared<M>>) -> Self {
        Self { shared }
    }

    /// Name of the topic this subscription reads.
    pub fn topic_name(&self) -> &str {
        &self.shared.topic_name
    }

    /// Remove and return everything currently queued. Never blocks; an
    /// empty result is normal, not an error.
    pub fn take(&self) -> Vec<M> {
        let mut state = self
            .shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.queue.drain(..).collect()
    }

    /// The most recently delivered message, without removing anything.
    /// Re-reading the same message is acceptable to callers of this mode.
    pub fn peek_latest(&self) -> Option<M> {
        let state = self
            .shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.latest.clone()
    }

    /// Number of messages currently queued.
    pub fn queued(&self) -> usize {
        let state = self
            .shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.queue.len()
    }

    /// Delivery counters for this subscription.
    pub fn metrics(&self) -> Arc<DeliveryMetrics> {
        Arc::clone(&self.shared.metrics)
    }
}

impl<M> Drop for Subscription<M> {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::Relaxed);
    }
}
