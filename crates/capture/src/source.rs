//! FrameSource - paced frame publisher

use std::sync::Arc;
use std::time::Duration;

use bus::Publisher;
use contracts::{now_secs, ContractError, FrameCodec, FrameGrabber, FrameMessage, ShutdownToken};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// Frame source configuration
#[derive(Debug, Clone)]
pub struct FrameSourceConfig {
    /// Camera identity stamped on every published frame
    pub source_id: String,

    /// Publish rate override; None = the grabber's native rate
    pub target_fps: Option<f64>,

    /// Stop after publishing this many frames; None = run to end of stream
    pub max_frames: Option<u64>,
}

/// Paced publisher over one capture resource
///
/// Owns the grabber for its whole life and releases it exactly once when
/// the loop ends, whether by end-of-stream or shutdown.
pub struct FrameSource {
    grabber: Box<dyn FrameGrabber>,
    codec: Arc<dyn FrameCodec>,
    publisher: Publisher<FrameMessage>,
    source_id: String,
    interval: Duration,
    max_frames: Option<u64>,
    token: ShutdownToken,
    released: bool,
}

impl FrameSource {
    /// Build a source around an already-open grabber.
    ///
    /// # Errors
    /// A non-positive effective rate is a configuration error.
    pub fn new(
        grabber: Box<dyn FrameGrabber>,
        codec: Arc<dyn FrameCodec>,
        publisher: Publisher<FrameMessage>,
        config: FrameSourceConfig,
        token: ShutdownToken,
    ) -> Result<Self, ContractError> {
        let fps = config.target_fps.unwrap_or_else(|| grabber.native_fps());
        if !(fps > 0.0) {
            return Err(ContractError::config_validation(
                "source.target_fps",
                format!("effective rate must be positive, got {fps}"),
            ));
        }

        Ok(Self {
            grabber,
            codec,
            publisher,
            source_id: config.source_id,
            interval: Duration::from_secs_f64(1.0 / fps),
            max_frames: config.max_frames,
            token,
            released: false,
        })
    }

    /// Run the capture loop to end-of-stream or shutdown.
    ///
    /// Returns the number of frames published. Pacing is best-effort: the
    /// loop sleeps `1/fps` between frames, it does not compensate for
    /// encode time.
    #[instrument(name = "frame_source_run", skip(self), fields(source_id = %self.source_id))]
    pub async fn run(mut self) -> u64 {
        info!(
            topic = %self.publisher.topic_name(),
            interval_ms = self.interval.as_millis() as u64,
            "frame source started"
        );

        let mut published = 0u64;

        loop {
            if self.token.is_shutdown() {
                info!(frames = published, "frame source stopping on shutdown");
                break;
            }
            if self.max_frames.is_some_and(|max| published >= max) {
                info!(frames = published, "frame limit reached");
                break;
            }

            match self.grabber.grab() {
                Ok(Some(raw)) => {
                    match self.codec.encode(&raw) {
                        Ok(payload) => {
                            self.publisher.publish(FrameMessage {
                                source_id: self.source_id.clone(),
                                payload,
                                captured_at: now_secs(),
                            });
                            published += 1;
                        }
                        Err(e) => {
                            warn!(error = %e, "frame encode failed, skipping frame");
                        }
                    }
                    sleep(self.interval).await;
                }
                Ok(None) => {
                    info!(frames = published, "end of stream");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "frame grab failed");
                    sleep(self.interval).await;
                }
            }
        }

        self.release();
        published
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.grabber.release();
            debug!(source_id = %self.source_id, "capture resource released");
        }
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.release();
    }
}
