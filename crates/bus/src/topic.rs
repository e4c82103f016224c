//! Topic - typed channel shared by publishers and subscriptions

use std::sync::{Arc, Mutex, PoisonError};

use contracts::{Durability, TopicQos};
use tracing::debug;

use crate::subscription::{SubShared, Subscription};

/// Marker for types that can travel over the bus
///
/// Delivery hands messages to each subscriber by clone, so payloads that
/// share their backing storage (e.g. `bytes::Bytes`) stay cheap to fan out.
pub trait BusMessage: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> BusMessage for T {}

pub(crate) struct TopicInner<M> {
    name: String,
    qos: TopicQos,
    subs: Mutex<Vec<Arc<SubShared<M>>>>,
    /// Most recent message, kept only under persistent durability
    retained: Mutex<Option<M>>,
}

impl<M: BusMessage> TopicInner<M> {
    fn publish(&self, msg: M) {
        if self.qos.durability == Durability::Persistent {
            *self
                .retained
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(msg.clone());
        }

        let mut subs = self.subs.lock().unwrap_or_else(PoisonError::into_inner);
        subs.retain(|sub| !sub.is_closed());
        for sub in subs.iter() {
            sub.deliver(msg.clone(), &self.qos);
        }
    }

    fn subscribe(self: &Arc<Self>) -> Subscription<M> {
        let seed = if self.qos.durability == Durability::Persistent {
            self.retained
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        } else {
            None
        };

        let shared = Arc::new(SubShared::new(self.name.clone(), seed));
        self.subs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&shared));

        debug!(topic = %self.name, "subscriber joined");
        Subscription::from_shared(shared)
    }
}

/// Handle to a registered topic
///
/// Cheap to clone; all handles for one name share the same delivery state.
pub struct Topic<M> {
    pub(crate) inner: Arc<TopicInner<M>>,
}

impl<M> Clone for Topic<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M> std::fmt::Debug for Topic<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Topic")
            .field("name", &self.inner.name)
            .finish()
    }
}

impl<M: BusMessage> Topic<M> {
    pub(crate) fn new(name: String, qos: TopicQos) -> Self {
        Self {
            inner: Arc::new(TopicInner {
                name,
                qos,
                subs: Mutex::new(Vec::new()),
                retained: Mutex::new(None),
            }),
        }
    }

    /// Topic name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// QoS policy the topic was registered with.
    pub fn qos(&self) -> TopicQos {
        self.inner.qos
    }

    /// Create a publisher handle.
    pub fn publisher(&self) -> Publisher<M> {
        Publisher {
            topic: Arc::clone(&self.inner),
        }
    }

    /// Join as a subscriber. Under volatile durability the new
    /// subscription starts empty regardless of what was published before.
    pub fn subscribe(&self) -> Subscription<M> {
        self.inner.subscribe()
    }

    /// Number of live subscriptions (closed handles are counted until the
    /// next publish prunes them).
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| !s.is_closed())
            .count()
    }
}

/// Writing end of a topic
///
/// `publish` never blocks: each current subscriber either gets the message
/// queued or loses it to the topic's QoS policy.
pub struct Publisher<M> {
    topic: Arc<TopicInner<M>>,
}

impl<M: BusMessage> Publisher<M> {
    /// Deliver a message to every current subscriber.
    pub fn publish(&self, msg: M) {
        self.topic.publish(msg);
    }

    /// Name of the topic this publisher writes.
    pub fn topic_name(&self) -> &str {
        &self.topic.name
    }
}

impl<M> Clone for Publisher<M> {
    fn clone(&self) -> Self {
        Self {
            topic: Arc::clone(&self.topic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{DropPolicy, Reliability};

    fn volatile_qos() -> TopicQos {
        TopicQos::default()
    }

    #[test]
    fn test_publish_fans_out_to_all_subscribers() {
        let topic: Topic<u32> = Topic::new("t".to_string(), volatile_qos());
        let sub_a = topic.subscribe();
        let sub_b = topic.subscribe();

        let publisher = topic.publisher();
        publisher.publish(1);
        publisher.publish(2);

        assert_eq!(sub_a.take(), vec![1, 2]);
        assert_eq!(sub_b.take(), vec![1, 2]);
    }

    #[test]
    fn test_volatile_late_joiner_sees_no_history() {
        let topic: Topic<u32> = Topic::new("t".to_string(), volatile_qos());
        let publisher = topic.publisher();
        publisher.publish(1);

        let late = topic.subscribe();
        assert!(late.take().is_empty());
        assert_eq!(late.peek_latest(), None);
    }

    #[test]
    fn test_persistent_late_joiner_gets_retained_message() {
        let qos = TopicQos {
            durability: Durability::Persistent,
            ..TopicQos::default()
        };
        let topic: Topic<u32> = Topic::new("t".to_string(), qos);
        let publisher = topic.publisher();
        publisher.publish(1);
        publisher.publish(2);

        let late = topic.subscribe();
        assert_eq!(late.take(), vec![2]);
    }

    #[test]
    fn test_dropped_subscription_is_pruned() {
        let topic: Topic<u32> = Topic::new("t".to_string(), volatile_qos());
        let sub = topic.subscribe();
        assert_eq!(topic.subscriber_count(), 1);

        drop(sub);
        assert_eq!(topic.subscriber_count(), 0);

        // publish after close must not panic or deliver
        topic.publisher().publish(1);
    }

    #[test]
    fn test_single_publisher_order_preserved_across_threads() {
        let qos = TopicQos {
            reliability: Reliability::Reliable,
            drop_policy: DropPolicy::DropNewest,
            ..TopicQos::default()
        };
        let topic: Topic<u32> = Topic::new("t".to_string(), qos);
        let sub = topic.subscribe();
        let publisher = topic.publisher();

        let handle = std::thread::spawn(move || {
            for i in 0..1000 {
                publisher.publish(i);
            }
        });
        handle.join().unwrap();

        let got = sub.take();
        assert_eq!(got.len(), 1000);
        assert!(got.windows(2).all(|w| w[0] < w[1]));
    }
}
