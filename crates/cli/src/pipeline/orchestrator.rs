//! Pipeline orchestrator - coordinates all components.
//!
//! Wires the bus, frame source, detection node, and metrics collector
//! together, owns their lifecycle, and propagates shutdown. Components
//! are consumed by value when spawned, so a stopped pipeline cannot be
//! restarted without being rebuilt.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bus::MessageBus;
use capture::{open_source, FrameSource, FrameSourceConfig};
use collector::{CollectorConfig, CsvCountLog, MetricsCollector};
use contracts::{
    ClassFilter, CountMessage, FrameMessage, ModelVariant, NodeState, NodeStateCell,
    PipelineBlueprint, RawBytesCodec, ShutdownToken,
};
use detection::{build_detector, DetectionNode, DetectionNodeConfig};
use observability::record_delivery_counters;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::PipelineStats;

/// How long the downstream nodes get to drain after the source stops
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// How long a node task gets to observe shutdown before being abandoned
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The pipeline blueprint
    pub blueprint: PipelineBlueprint,

    /// Maximum number of frames to publish (None = unlimited)
    pub max_frames: Option<u64>,

    /// Run time limit (None = no limit)
    pub duration: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Cadence of the metrics display consumer
    pub display_interval: Duration,
}

impl PipelineConfig {
    /// Wrap a blueprint with no limits and the default display cadence.
    pub fn new(blueprint: PipelineBlueprint) -> Self {
        Self {
            blueprint,
            max_frames: None,
            duration: None,
            metrics_port: None,
            display_interval: Duration::from_millis(200),
        }
    }
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline to completion.
    ///
    /// Ends when the source finishes (end of stream or frame limit) and
    /// the downstream nodes drain, when the optional duration elapses, or
    /// when `token` fires externally (interrupt). All components release
    /// their resources before this returns.
    pub async fn run(self, token: ShutdownToken) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Open the capture resource - unopenable source is fatal
        info!(uri = %blueprint.source.uri, "Opening video source...");
        let grabber = open_source(&blueprint.source.uri)
            .with_context(|| format!("Failed to open video source {}", blueprint.source.uri))?;
        info!(fps = grabber.native_fps(), "Video source opened");

        // Register topics - schema mismatch is fatal
        let message_bus = MessageBus::new();
        let frames_topic = message_bus
            .topic::<FrameMessage>(&blueprint.topics.frames, blueprint.qos)
            .context("Failed to register frames topic")?;
        let counts_topic = message_bus
            .topic::<CountMessage>(&blueprint.topics.counts, blueprint.qos)
            .context("Failed to register counts topic")?;

        info!(
            frames = %frames_topic.name(),
            counts = %counts_topic.name(),
            qos = %blueprint.qos,
            "Topics registered"
        );

        // Subscriptions are created before the nodes move them, so their
        // delivery counters stay observable from here
        let frames_sub = frames_topic.subscribe();
        let counts_sub = counts_topic.subscribe();
        let frames_delivery = frames_sub.metrics();
        let counts_delivery = counts_sub.metrics();

        let codec = Arc::new(RawBytesCodec);

        // Frame source
        let source = FrameSource::new(
            grabber,
            codec.clone(),
            frames_topic.publisher(),
            FrameSourceConfig {
                source_id: blueprint.source.camera_id.clone(),
                target_fps: blueprint.source.target_fps,
                max_frames: self.config.max_frames,
            },
            token.clone(),
        )
        .context("Failed to configure frame source")?;

        // Detection node - unsupported model variant is fatal
        let variant = ModelVariant::parse(&blueprint.detection.model)?;
        let detector = build_detector(variant)?;
        let detection_node = DetectionNode::new(
            frames_sub,
            counts_topic.publisher(),
            codec,
            detector,
            DetectionNodeConfig {
                label: blueprint.detection.label.clone(),
                filter: ClassFilter {
                    class_id: blueprint.detection.target_class,
                    confidence_threshold: blueprint.detection.confidence_threshold,
                },
                ..Default::default()
            },
            token.clone(),
        );
        let detection_state = detection_node.state_cell();

        info!(model = variant.as_str(), "Detection node configured");

        // Metrics collector with the count log
        let count_log = CsvCountLog::open("count_log", &blueprint.log.path)
            .with_context(|| format!("Failed to open count log {}", blueprint.log.path.display()))?;
        let metrics_collector = MetricsCollector::new(
            counts_sub,
            Arc::new(Mutex::new(count_log)),
            CollectorConfig {
                throughput_window_seconds: blueprint.metrics.throughput_window_seconds,
                throughput_history_capacity: blueprint.metrics.throughput_history_capacity,
                ..Default::default()
            },
            token.clone(),
        );
        let metrics_handle = metrics_collector.metrics_handle();
        let collector_state = metrics_collector.state_cell();

        info!(log = %blueprint.log.path.display(), "Metrics collector configured");

        // Start everything
        let source_handle = tokio::spawn(source.run());
        let detection_handle = tokio::spawn(detection_node.run());
        let collector_handle = metrics_collector.spawn();

        // Optional run-time limit
        if let Some(limit) = self.config.duration {
            let limit_token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                if !limit_token.is_shutdown() {
                    info!(limit_secs = limit.as_secs_f64(), "Run time limit reached");
                    limit_token.shutdown();
                }
            });
        }

        // Display consumer: polls snapshots on its own schedule
        {
            let display_token = token.clone();
            let display_handle = metrics_handle.clone();
            let frames_name = frames_topic.name().to_string();
            let counts_name = counts_topic.name().to_string();
            let frames_delivery = Arc::clone(&frames_delivery);
            let counts_delivery = Arc::clone(&counts_delivery);
            let interval = self.config.display_interval;
            tokio::spawn(async move {
                while !display_token.is_shutdown() {
                    let snapshot = display_handle.snapshot();
                    let f = frames_delivery.snapshot();
                    let c = counts_delivery.snapshot();
                    record_delivery_counters(&frames_name, f.delivered, f.dropped, f.filtered);
                    record_delivery_counters(&counts_name, c.delivered, c.dropped, c.filtered);
                    debug!(
                        samples = snapshot.latencies.len(),
                        mean_latency_ms = snapshot.mean_latency_ms().unwrap_or(0.0),
                        last_rate = snapshot.last_rate().unwrap_or(0.0),
                        "metrics snapshot"
                    );
                    tokio::time::sleep(interval).await;
                }
            });
        }

        info!(max_frames = ?self.config.max_frames, "Pipeline running");

        // Phase 1: the source runs to end-of-stream, frame limit, or shutdown
        let frames_published = source_handle.await.unwrap_or_else(|e| {
            warn!(error = ?e, "Frame source task panicked");
            0
        });

        // Phase 2: let the downstream drain before stopping it
        if !token.is_shutdown() {
            Self::await_drain(&detection_state, &collector_state).await;
            token.shutdown();
        }

        // Phase 3: every loop observes the token and stops
        let counts_published = match tokio::time::timeout(STOP_TIMEOUT, detection_handle).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => {
                warn!(error = ?e, "Detection task panicked");
                0
            }
            Err(_) => {
                warn!("Detection node did not stop in time");
                0
            }
        };
        let samples_collected = match tokio::time::timeout(STOP_TIMEOUT, collector_handle).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => {
                warn!(error = ?e, "Collector task panicked");
                0
            }
            Err(_) => {
                warn!("Metrics collector did not stop in time");
                0
            }
        };

        let stats = PipelineStats {
            frames_published,
            counts_published,
            samples_collected,
            frames_delivery: frames_delivery.snapshot(),
            counts_delivery: counts_delivery.snapshot(),
            duration: start_time.elapsed(),
            snapshot: metrics_handle.snapshot(),
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            fps = format!("{:.2}", stats.fps()),
            dropped = stats.total_dropped(),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }

    /// Wait (bounded) until both downstream nodes report WAITING, meaning
    /// everything the source published has been pulled and processed.
    async fn await_drain(detection: &NodeStateCell, collector: &NodeStateCell) {
        let deadline = Instant::now() + DRAIN_TIMEOUT;
        // require two consecutive idle observations: a single one can race
        // with a message that was delivered but not yet pulled
        let mut idle_polls = 0;
        while Instant::now() < deadline {
            if detection.get() == NodeState::Waiting && collector.get() == NodeState::Waiting {
                idle_polls += 1;
                if idle_polls >= 2 {
                    debug!("downstream nodes drained");
                    return;
                }
            } else {
                idle_polls = 0;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        warn!("drain timeout, stopping with work possibly in flight");
    }
}
