//! MessageBus - idempotent topic registry

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use contracts::{ContractError, TopicQos};
use tracing::{debug, instrument};

use crate::topic::{BusMessage, Topic};

struct TopicEntry {
    type_id: TypeId,
    type_name: &'static str,
    /// Type-erased `Topic<M>`; downcast on lookup
    handle: Box<dyn Any + Send + Sync>,
}

/// Topic registry shared by every node in the process
///
/// Cheap to clone; all clones see the same topics.
#[derive(Clone, Default)]
pub struct MessageBus {
    topics: Arc<Mutex<HashMap<String, TopicEntry>>>,
}

impl MessageBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up or create a topic.
    ///
    /// Creation is idempotent: an existing name with the same payload type
    /// returns the existing topic (the QoS it was first registered with
    /// wins). The same name with a different payload type is a schema
    /// mismatch, fatal at the call site.
    #[instrument(name = "bus_topic", skip(self, qos), fields(topic = %name))]
    pub fn topic<M: BusMessage>(
        &self,
        name: &str,
        qos: TopicQos,
    ) -> Result<Topic<M>, ContractError> {
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(entry) = topics.get(name) {
            if entry.type_id != TypeId::of::<M>() {
                return Err(ContractError::TopicSchemaMismatch {
                    topic: name.to_string(),
                    registered: entry.type_name.to_string(),
                    requested: std::any::type_name::<M>().to_string(),
                });
            }
            let topic = entry
                .handle
                .downcast_ref::<Topic<M>>()
                .ok_or_else(|| ContractError::Other(format!("corrupt registry entry for '{name}'")))?;
            return Ok(topic.clone());
        }

        let topic = Topic::<M>::new(name.to_string(), qos);
        debug!(topic = %name, %qos, schema = std::any::type_name::<M>(), "topic registered");
        topics.insert(
            name.to_string(),
            TopicEntry {
                type_id: TypeId::of::<M>(),
                type_name: std::any::type_name::<M>(),
                handle: Box::new(topic.clone()),
            },
        );
        Ok(topic)
    }

    /// Number of registered topics.
    pub fn topic_count(&self) -> usize {
        self.topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_creation_is_idempotent() {
        let bus = MessageBus::new();
        let a = bus.topic::<u32>("counts", TopicQos::default()).unwrap();
        let b = bus.topic::<u32>("counts", TopicQos::default()).unwrap();
        assert_eq!(bus.topic_count(), 1);

        // distinct subscriptions on the same underlying topic
        let sub_a = a.subscribe();
        let sub_b = b.subscribe();
        a.publisher().publish(9);
        assert_eq!(sub_a.take(), vec![9]);
        assert_eq!(sub_b.take(), vec![9]);
    }

    #[test]
    fn test_schema_mismatch_is_an_error() {
        let bus = MessageBus::new();
        bus.topic::<u32>("frames", TopicQos::default()).unwrap();

        let err = bus
            .topic::<String>("frames", TopicQos::default())
            .unwrap_err();
        assert!(matches!(err, ContractError::TopicSchemaMismatch { .. }));
        assert_eq!(bus.topic_count(), 1);
    }

    #[test]
    fn test_first_registration_qos_wins() {
        let bus = MessageBus::new();
        let first = TopicQos {
            queue_depth: 7,
            ..TopicQos::default()
        };
        bus.topic::<u32>("frames", first).unwrap();

        let again = bus
            .topic::<u32>("frames", TopicQos::default())
            .unwrap();
        assert_eq!(again.qos().queue_depth, 7);
    }
}
