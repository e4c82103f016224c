//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - Full source -> detection -> collector flow over the bus
//! - Traceability of derived messages
//! - Best-effort loss behavior
//! - Count log on-disk format

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        let qos = contracts::TopicQos::default();
        assert_eq!(qos.reliability, contracts::Reliability::BestEffort);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bus::MessageBus;
    use capture::{open_source, FrameSource, FrameSourceConfig};
    use collector::{CollectorConfig, CsvCountLog, MetricsCollector};
    use contracts::{
        now_secs, CountMessage, FrameCodec, FrameMessage, ModelVariant, RawBytesCodec,
        ShutdownToken, TopicQos,
    };
    use detection::{build_detector, DetectionNode, DetectionNodeConfig};
    use tokio::sync::Mutex;
    use tokio::time::sleep;

    /// End-to-end: SyntheticGrabber -> FrameSource -> DetectionNode ->
    /// MetricsCollector, 10 frames paced at 5 fps (about 2 seconds).
    ///
    /// Verifies:
    /// 1. every frame becomes exactly one count message
    /// 2. derived messages carry the source camera id (end to end)
    /// 3. at least one throughput window lands near 5 msg/s
    /// 4. the count log holds a header plus one row per message
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_e2e_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("counts.csv");

        let message_bus = MessageBus::new();
        let frames_topic = message_bus
            .topic::<FrameMessage>("frames", TopicQos::default())
            .unwrap();
        let counts_topic = message_bus
            .topic::<CountMessage>("counts", TopicQos::default())
            .unwrap();

        let token = ShutdownToken::new();
        let codec = Arc::new(RawBytesCodec);

        let grabber = open_source("synthetic://?fps=5&frames=10&width=16&height=16").unwrap();
        let source = FrameSource::new(
            grabber,
            codec.clone(),
            frames_topic.publisher(),
            FrameSourceConfig {
                source_id: "cam_1".to_string(),
                target_fps: None,
                max_frames: None,
            },
            token.clone(),
        )
        .unwrap();

        let node = DetectionNode::new(
            frames_topic.subscribe(),
            counts_topic.publisher(),
            codec,
            build_detector(ModelVariant::Face).unwrap(),
            DetectionNodeConfig::default(),
            token.clone(),
        );

        let count_log = CsvCountLog::open("e2e_log", &log_path).unwrap();
        let metrics_collector = MetricsCollector::new(
            counts_topic.subscribe(),
            Arc::new(Mutex::new(count_log)),
            CollectorConfig::default(),
            token.clone(),
        );
        let metrics = metrics_collector.metrics_handle();

        let source_handle = tokio::spawn(source.run());
        let node_handle = tokio::spawn(node.run());
        let collector_handle = metrics_collector.spawn();

        // the source paces itself; 10 frames at 5 fps is about 2 seconds
        let frames_published =
            tokio::time::timeout(Duration::from_secs(10), source_handle)
                .await
                .expect("source timed out")
                .unwrap();
        assert_eq!(frames_published, 10);

        // let the downstream drain, then stop
        sleep(Duration::from_millis(300)).await;
        token.shutdown();

        let counts_published = tokio::time::timeout(Duration::from_secs(5), node_handle)
            .await
            .expect("detection timed out")
            .unwrap();
        let samples = tokio::time::timeout(Duration::from_secs(5), collector_handle)
            .await
            .expect("collector timed out")
            .unwrap();

        assert_eq!(counts_published, 10);
        assert_eq!(samples, 10);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_received, 10);
        assert_eq!(snapshot.latencies.len(), 10);
        // in-process transit under synchronized clocks: non-negative
        assert_eq!(snapshot.skewed_samples, 0);

        // at least one window near the 5 msg/s pace (scheduling jitter allowed)
        assert!(!snapshot.windows.is_empty(), "no throughput window closed");
        let in_range = snapshot
            .windows
            .iter()
            .any(|w| (4.5..=5.5).contains(&w.rate()));
        assert!(
            in_range,
            "no window within [4.5, 5.5] msg/s: {:?}",
            snapshot
                .windows
                .iter()
                .map(|w| w.rate())
                .collect::<Vec<_>>()
        );

        // the run-summary aggregation sees the same picture
        let mut aggregator = observability::LatencyThroughputAggregator::new();
        for sample in &snapshot.latencies {
            aggregator.update_sample(sample);
        }
        for window in &snapshot.windows {
            aggregator.update_window(window);
        }
        let summary = aggregator.summary();
        assert_eq!(summary.samples, 10);
        assert_eq!(summary.skewed_samples, 0);
        assert!(summary.latency_ms.mean >= 0.0);

        // count log: header plus one row per message, all for cam_1
        let content = std::fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 11);
        assert_eq!(lines[0], "device_id,count");
        assert!(lines[1..].iter().all(|l| l.starts_with("cam_1,")));
    }

    /// A best-effort subscriber that misses messages still processes the
    /// remainder without error.
    #[tokio::test]
    async fn test_best_effort_loss_is_survivable() {
        let message_bus = MessageBus::new();
        let qos = TopicQos {
            queue_depth: 7,
            ..TopicQos::default()
        };
        let counts_topic = message_bus.topic::<CountMessage>("counts", qos).unwrap();

        // subscribe first (volatile durability), then burst past the depth
        let subscription = counts_topic.subscribe();
        let publisher = counts_topic.publisher();
        for i in 0..10u32 {
            publisher.publish(CountMessage {
                source_id: "cam_1".to_string(),
                count: i,
                label: "burst".to_string(),
                produced_at: now_secs(),
            });
        }
        assert_eq!(subscription.metrics().dropped(), 3);

        let token = ShutdownToken::new();
        let metrics_collector = MetricsCollector::new(
            subscription,
            Arc::new(Mutex::new(NullSink)),
            CollectorConfig::default(),
            token.clone(),
        );
        let metrics = metrics_collector.metrics_handle();
        let handle = metrics_collector.spawn();

        sleep(Duration::from_millis(100)).await;
        token.shutdown();
        let processed = handle.await.unwrap();

        assert_eq!(processed, 7);
        assert_eq!(metrics.snapshot().total_received, 7);
    }

    /// Frame messages surviving a lossy frames topic still produce counts.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_lossy_frames_topic_end_to_end() {
        let message_bus = MessageBus::new();
        let qos = TopicQos {
            queue_depth: 3,
            ..TopicQos::default()
        };
        let frames_topic = message_bus.topic::<FrameMessage>("frames", qos).unwrap();
        let counts_topic = message_bus
            .topic::<CountMessage>("counts", TopicQos::default())
            .unwrap();

        let frames_sub = frames_topic.subscribe();
        let delivery = frames_sub.metrics();

        // fill the subscriber queue past its depth before the node starts
        use contracts::FrameGrabber as _;
        let codec = Arc::new(RawBytesCodec);
        let mut grabber = capture::SyntheticGrabber::new(capture::SyntheticGrabberConfig {
            fps: 100.0,
            width: 8,
            height: 8,
            max_frames: Some(10),
        });
        let publisher = frames_topic.publisher();
        while let Some(raw) = grabber.grab().unwrap() {
            publisher.publish(FrameMessage {
                source_id: "cam_9".to_string(),
                payload: codec.encode(&raw).unwrap(),
                captured_at: now_secs(),
            });
        }
        assert_eq!(delivery.dropped(), 7);

        let token = ShutdownToken::new();
        let node = DetectionNode::new(
            frames_sub,
            counts_topic.publisher(),
            codec,
            build_detector(ModelVariant::Face).unwrap(),
            DetectionNodeConfig::default(),
            token.clone(),
        );
        let counts_sub = counts_topic.subscribe();
        let handle = tokio::spawn(node.run());

        sleep(Duration::from_millis(100)).await;
        token.shutdown();
        let published = handle.await.unwrap();

        assert_eq!(published, 3);
        let counts = counts_sub.take();
        assert_eq!(counts.len(), 3);
        assert!(counts.iter().all(|c| c.source_id == "cam_9"));
    }

    /// Null sink for tests that only care about metrics
    struct NullSink;

    impl contracts::CountSink for NullSink {
        fn name(&self) -> &str {
            "null"
        }

        async fn append(&mut self, _: &str, _: u32) -> Result<(), contracts::ContractError> {
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), contracts::ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), contracts::ContractError> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod config_tests {
    use config_loader::{ConfigFormat, ConfigLoader};

    #[test]
    fn test_full_config_round_trip() {
        let content = r#"
[source]
uri = "synthetic://?fps=5&frames=10"
camera_id = "cam_front"
target_fps = 5.0

[detection]
model = "face"
target_class = 0
confidence_threshold = 0.3
label = "Crowd detected"

[qos]
reliability = "best_effort"
durability = "volatile"
min_separation_seconds = 0.0
queue_depth = 100
drop_policy = "drop_newest"

[topics]
frames = "frames"
counts = "counts"

[metrics]
throughput_window_seconds = 1.0
throughput_history_capacity = 10

[log]
path = "crowd_counts.csv"
"#;
        let blueprint = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap();
        assert_eq!(blueprint.source.camera_id, "cam_front");

        let toml = ConfigLoader::to_toml(&blueprint).unwrap();
        let reparsed = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        assert_eq!(reparsed.qos, blueprint.qos);
    }
}
