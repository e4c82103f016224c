//! MetricsCollector - counts in, metrics and log rows out

use std::sync::Arc;
use std::time::Duration;

use bus::Subscription;
use contracts::{
    now_secs, ContractError, CountMessage, CountSink, NodeState, NodeStateCell, ShutdownToken,
};
use metrics::{counter, gauge, histogram};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{info, instrument, trace, warn};

use crate::store::{MetricsHandle, MetricsStore};

/// Collector configuration
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Throughput window length (seconds)
    pub throughput_window_seconds: f64,

    /// Completed windows retained before eviction
    pub throughput_history_capacity: usize,

    /// Sleep when the counts queue is empty
    pub idle: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            throughput_window_seconds: 1.0,
            throughput_history_capacity: 10,
            idle: Duration::from_millis(2),
        }
    }
}

/// Subscriber computing latency/throughput metrics and persisting counts
///
/// Runs on its own task (`spawn`) so display consumers can poll
/// [`MetricsHandle::snapshot`] on their own schedule.
pub struct MetricsCollector<S: CountSink> {
    counts: Subscription<CountMessage>,
    store: MetricsHandle,
    /// Shared with any other writer to the same log
    sink: Arc<Mutex<S>>,
    config: CollectorConfig,
    token: ShutdownToken,
    state: Arc<NodeStateCell>,
}

impl<S: CountSink + Send + 'static> MetricsCollector<S> {
    pub fn new(
        counts: Subscription<CountMessage>,
        sink: Arc<Mutex<S>>,
        config: CollectorConfig,
        token: ShutdownToken,
    ) -> Self {
        let store = MetricsHandle::new(MetricsStore::new(
            config.throughput_window_seconds,
            config.throughput_history_capacity,
            now_secs(),
        ));
        Self {
            counts,
            store,
            sink,
            config,
            token,
            state: Arc::new(NodeStateCell::new()),
        }
    }

    /// Read handle for display consumers; clones stay valid after `spawn`.
    pub fn metrics_handle(&self) -> MetricsHandle {
        self.store.clone()
    }

    /// Observable lifecycle state.
    pub fn state_cell(&self) -> Arc<NodeStateCell> {
        Arc::clone(&self.state)
    }

    /// Shared persistence lock, for any additional writer to the same log.
    pub fn sink(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.sink)
    }

    /// Run the collector loop on a dedicated task.
    pub fn spawn(self) -> JoinHandle<u64> {
        tokio::spawn(async move { self.run().await })
    }

    /// Run the collector loop until shutdown.
    ///
    /// Returns the number of messages folded into the store.
    #[instrument(name = "collector_run", skip(self))]
    pub async fn run(self) -> u64 {
        info!(
            topic = %self.counts.topic_name(),
            window_seconds = self.config.throughput_window_seconds,
            history_capacity = self.config.throughput_history_capacity,
            "metrics collector started"
        );

        let mut received = 0u64;

        loop {
            if self.token.is_shutdown() {
                break;
            }

            let messages = self.counts.take();
            if messages.is_empty() {
                self.state.set(NodeState::Waiting);
                trace!("no samples received");
                sleep(self.config.idle).await;
                continue;
            }

            self.state.set(NodeState::Processing);
            for msg in &messages {
                self.observe(msg).await;
                received += 1;
            }
        }

        // in-flight work is done; leave the log flushed
        if let Err(e) = self.close_sink().await {
            warn!(error = %e, "count log close failed");
        }

        self.state.set(NodeState::Stopped);
        info!(messages = received, "metrics collector stopped");
        received
    }

    async fn observe(&self, msg: &CountMessage) {
        let now = now_secs();
        let (sample, finished) = self.store.record(msg, now);

        counter!("crowdmeter_counts_received_total").increment(1);
        histogram!("crowdmeter_latency_ms").record(sample.value_ms);
        if sample.clock_skewed {
            counter!("crowdmeter_skewed_samples_total").increment(1);
            warn!(
                source_id = %msg.source_id,
                latency_ms = format!("{:.2}", sample.value_ms),
                "negative latency sample (clock skew)"
            );
        }

        if let Some(window) = finished {
            gauge!("crowdmeter_throughput_rate").set(window.rate());
            info!(
                rate = format!("{:.2}", window.rate()),
                messages = window.message_count,
                "throughput window closed"
            );
        }

        if !msg.source_id.is_empty() {
            if let Err(e) = self.persist(msg).await {
                warn!(source_id = %msg.source_id, error = %e, "count log append failed");
            }
        }
    }

    async fn persist(&self, msg: &CountMessage) -> Result<(), ContractError> {
        let mut sink = self.sink.lock().await;
        sink.append(&msg.source_id, msg.count).await
    }

    async fn close_sink(&self) -> Result<(), ContractError> {
        let mut sink = self.sink.lock().await;
        sink.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bus::MessageBus;
    use contracts::TopicQos;

    /// In-memory sink for testing
    #[derive(Default)]
    struct MemorySink {
        rows: Vec<(String, u32)>,
        fail: bool,
    }

    impl CountSink for MemorySink {
        fn name(&self) -> &str {
            "memory"
        }

        async fn append(&mut self, device_id: &str, count: u32) -> Result<(), ContractError> {
            if self.fail {
                return Err(ContractError::sink_write("memory", "forced failure"));
            }
            self.rows.push((device_id.to_string(), count));
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    fn count_msg(source_id: &str, count: u32) -> CountMessage {
        CountMessage {
            source_id: source_id.to_string(),
            count,
            label: "test".to_string(),
            produced_at: now_secs(),
        }
    }

    #[tokio::test]
    async fn test_collects_and_persists() {
        let bus = MessageBus::new();
        let topic = bus
            .topic::<CountMessage>("counts", TopicQos::default())
            .unwrap();

        let sink = Arc::new(Mutex::new(MemorySink::default()));
        let token = ShutdownToken::new();
        let collector = MetricsCollector::new(
            topic.subscribe(),
            Arc::clone(&sink),
            CollectorConfig::default(),
            token.clone(),
        );
        let handle_metrics = collector.metrics_handle();
        let handle = collector.spawn();

        let publisher = topic.publisher();
        publisher.publish(count_msg("cam_1", 3));
        publisher.publish(count_msg("cam_1", 5));
        publisher.publish(count_msg("", 9)); // anonymous: metrics only

        sleep(Duration::from_millis(100)).await;
        token.shutdown();
        let received = handle.await.unwrap();

        assert_eq!(received, 3);
        let snapshot = handle_metrics.snapshot();
        assert_eq!(snapshot.total_received, 3);
        assert_eq!(snapshot.latencies.len(), 3);

        let guard = sink.lock().await;
        assert_eq!(
            guard.rows,
            vec![("cam_1".to_string(), 3), ("cam_1".to_string(), 5)]
        );
    }

    #[tokio::test]
    async fn test_sink_lock_is_shared_with_other_writers() {
        let bus = MessageBus::new();
        let topic = bus
            .topic::<CountMessage>("counts", TopicQos::default())
            .unwrap();

        let token = ShutdownToken::new();
        let collector = MetricsCollector::new(
            topic.subscribe(),
            Arc::new(Mutex::new(MemorySink::default())),
            CollectorConfig::default(),
            token.clone(),
        );
        let shared_sink = collector.sink();
        let handle = collector.spawn();

        // another writer appends through the same lock while the loop runs
        topic.publisher().publish(count_msg("cam_1", 4));
        shared_sink.lock().await.append("door_2", 1).await.unwrap();

        sleep(Duration::from_millis(100)).await;
        token.shutdown();
        handle.await.unwrap();

        let guard = shared_sink.lock().await;
        assert_eq!(guard.rows.len(), 2);
        assert!(guard.rows.contains(&("door_2".to_string(), 1)));
        assert!(guard.rows.contains(&("cam_1".to_string(), 4)));
    }

    #[tokio::test]
    async fn test_sink_failure_is_recoverable() {
        let bus = MessageBus::new();
        let topic = bus
            .topic::<CountMessage>("counts", TopicQos::default())
            .unwrap();

        let sink = Arc::new(Mutex::new(MemorySink {
            fail: true,
            ..Default::default()
        }));
        let token = ShutdownToken::new();
        let collector = MetricsCollector::new(
            topic.subscribe(),
            sink,
            CollectorConfig::default(),
            token.clone(),
        );
        let handle_metrics = collector.metrics_handle();
        let handle = collector.spawn();

        topic.publisher().publish(count_msg("cam_1", 1));
        topic.publisher().publish(count_msg("cam_1", 2));

        sleep(Duration::from_millis(100)).await;
        token.shutdown();
        handle.await.unwrap();

        // metrics still recorded even though every append failed
        assert_eq!(handle_metrics.snapshot().total_received, 2);
    }
}
