//! DetectionNode - frames in, counts out

use std::sync::Arc;
use std::time::{Duration, Instant};

use bus::{Publisher, Subscription};
use contracts::{
    now_secs, ClassFilter, ContractError, CountMessage, Detector, FrameCodec, FrameMessage,
    NodeState, NodeStateCell, ShutdownToken,
};
use metrics::histogram;
use tokio::time::sleep;
use tracing::{debug, info, instrument, trace, warn};

/// Detection node configuration
#[derive(Debug, Clone)]
pub struct DetectionNodeConfig {
    /// Classification description stamped on every count message
    pub label: String,

    /// Class/confidence filter applied to model output
    pub filter: ClassFilter,

    /// Sleep when the frames queue is empty, bounding both CPU use and
    /// shutdown latency
    pub idle: Duration,
}

impl Default for DetectionNodeConfig {
    fn default() -> Self {
        Self {
            label: "Crowd detected".to_string(),
            filter: ClassFilter::default(),
            idle: Duration::from_millis(2),
        }
    }
}

/// Subscriber/re-publisher turning frames into occupancy counts
pub struct DetectionNode {
    frames: Subscription<FrameMessage>,
    counts: Publisher<CountMessage>,
    codec: Arc<dyn FrameCodec>,
    detector: Box<dyn Detector>,
    config: DetectionNodeConfig,
    token: ShutdownToken,
    state: Arc<NodeStateCell>,
}

impl DetectionNode {
    pub fn new(
        frames: Subscription<FrameMessage>,
        counts: Publisher<CountMessage>,
        codec: Arc<dyn FrameCodec>,
        detector: Box<dyn Detector>,
        config: DetectionNodeConfig,
        token: ShutdownToken,
    ) -> Self {
        Self {
            frames,
            counts,
            codec,
            detector,
            config,
            token,
            state: Arc::new(NodeStateCell::new()),
        }
    }

    /// Observable lifecycle state (WAITING / PROCESSING / STOPPED).
    pub fn state_cell(&self) -> Arc<NodeStateCell> {
        Arc::clone(&self.state)
    }

    /// Run the detection loop until shutdown.
    ///
    /// Returns the number of count messages published. In-flight frames
    /// from the current drain finish before the loop observes the token.
    #[instrument(name = "detection_run", skip(self))]
    pub async fn run(self) -> u64 {
        info!(
            frames_topic = %self.frames.topic_name(),
            counts_topic = %self.counts.topic_name(),
            filter_class = self.config.filter.class_id,
            confidence_threshold = self.config.filter.confidence_threshold,
            "detection node started"
        );

        let mut published = 0u64;

        loop {
            if self.token.is_shutdown() {
                break;
            }

            let frames = self.frames.take();
            if frames.is_empty() {
                self.state.set(NodeState::Waiting);
                trace!("no frames queued");
                sleep(self.config.idle).await;
                continue;
            }

            self.state.set(NodeState::Processing);
            for frame in frames {
                match self.process(&frame) {
                    Ok(()) => published += 1,
                    Err(e) => {
                        warn!(source_id = %frame.source_id, error = %e, "frame processing failed");
                    }
                }
            }
        }

        self.state.set(NodeState::Stopped);
        info!(counts = published, "detection node stopped");
        published
    }

    fn process(&self, frame: &FrameMessage) -> Result<(), ContractError> {
        let raw = self.codec.decode(&frame.payload)?;

        let started = Instant::now();
        let detections = self.detector.infer(&raw)?;
        let inference_ms = started.elapsed().as_secs_f64() * 1000.0;
        histogram!("crowdmeter_inference_ms").record(inference_ms);

        let count = detections
            .iter()
            .filter(|d| self.config.filter.accepts(d))
            .count() as u32;

        debug!(
            source_id = %frame.source_id,
            inference_ms = format!("{inference_ms:.2}"),
            count,
            "frame processed"
        );

        self.counts.publish(CountMessage {
            source_id: frame.source_id.clone(),
            count,
            label: self.config.label.clone(),
            produced_at: now_secs(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bus::MessageBus;
    use bytes::Bytes;
    use contracts::{
        BoundingBox, Detection, PixelFormat, RawBytesCodec, RawFrame, TopicQos,
    };

    /// Fixed-output detector for testing
    struct StubDetector {
        detections: Vec<Detection>,
        fail: bool,
    }

    impl Detector for StubDetector {
        fn infer(&self, _frame: &RawFrame) -> Result<Vec<Detection>, ContractError> {
            if self.fail {
                return Err(ContractError::inference("stub", "forced failure"));
            }
            Ok(self.detections.clone())
        }
    }

    fn person(confidence: f32) -> Detection {
        Detection {
            bbox: BoundingBox {
                x1: 0.0,
                y1: 0.0,
                x2: 1.0,
                y2: 1.0,
            },
            class_id: 0,
            confidence,
        }
    }

    fn encoded_frame(source_id: &str) -> FrameMessage {
        let raw = RawFrame {
            width: 4,
            height: 4,
            format: PixelFormat::Gray8,
            data: Bytes::from(vec![1u8; 16]),
        };
        FrameMessage {
            source_id: source_id.to_string(),
            payload: RawBytesCodec.encode(&raw).unwrap(),
            captured_at: now_secs(),
        }
    }

    struct Harness {
        frames: Publisher<FrameMessage>,
        counts: Subscription<CountMessage>,
        node: DetectionNode,
        token: ShutdownToken,
    }

    fn harness(detector: StubDetector) -> Harness {
        let bus = MessageBus::new();
        let frames_topic = bus
            .topic::<FrameMessage>("frames", TopicQos::default())
            .unwrap();
        let counts_topic = bus
            .topic::<CountMessage>("counts", TopicQos::default())
            .unwrap();

        let token = ShutdownToken::new();
        let node = DetectionNode::new(
            frames_topic.subscribe(),
            counts_topic.publisher(),
            Arc::new(RawBytesCodec),
            Box::new(detector),
            DetectionNodeConfig::default(),
            token.clone(),
        );

        Harness {
            frames: frames_topic.publisher(),
            counts: counts_topic.subscribe(),
            node,
            token,
        }
    }

    async fn run_until_counts(h: Harness, expected: usize) -> Vec<CountMessage> {
        let counts = h.counts;
        let token = h.token;
        let handle = tokio::spawn(h.node.run());

        let mut got = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(2);
        while got.len() < expected && Instant::now() < deadline {
            got.extend(counts.take());
            sleep(Duration::from_millis(5)).await;
        }

        token.shutdown();
        handle.await.unwrap();
        got
    }

    #[tokio::test]
    async fn test_counts_carry_source_id_and_filtered_count() {
        let h = harness(StubDetector {
            detections: vec![person(0.9), person(0.5), person(0.2), person(0.31)],
            fail: false,
        });
        h.frames.publish(encoded_frame("cam_7"));

        let got = run_until_counts(h, 1).await;
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].source_id, "cam_7");
        // 0.2 rejected by the default 0.3 threshold
        assert_eq!(got[0].count, 3);
        assert_eq!(got[0].label, "Crowd detected");
    }

    #[tokio::test]
    async fn test_bad_payload_does_not_kill_the_loop() {
        let h = harness(StubDetector {
            detections: vec![person(0.9)],
            fail: false,
        });

        h.frames.publish(FrameMessage {
            source_id: "cam_1".to_string(),
            payload: Bytes::from_static(b"not a frame"),
            captured_at: now_secs(),
        });
        h.frames.publish(encoded_frame("cam_1"));

        let got = run_until_counts(h, 1).await;
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].count, 1);
    }

    #[tokio::test]
    async fn test_inference_failure_is_recoverable() {
        let h = harness(StubDetector {
            detections: vec![],
            fail: true,
        });
        h.frames.publish(encoded_frame("cam_1"));

        let counts = h.counts;
        let token = h.token;
        let state = h.node.state_cell();
        let handle = tokio::spawn(h.node.run());

        sleep(Duration::from_millis(50)).await;
        assert!(counts.take().is_empty());
        assert_ne!(state.get(), NodeState::Stopped);

        token.shutdown();
        handle.await.unwrap();
        assert_eq!(state.get(), NodeState::Stopped);
    }
}
