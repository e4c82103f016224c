//! Bus message records
//!
//! Plain tagged data records exchanged over the bus. Serialization is a
//! pluggable boundary, not baked into delivery: in-process topics hand
//! messages over by clone, the serde derives exist for sinks and tooling.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Encoded video frame
///
/// Published by the frame source. Immutable once published.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameMessage {
    /// Identifies the originating camera
    pub source_id: String,

    /// Codec-specific encoded payload (opaque to the bus)
    pub payload: Bytes,

    /// Wall-clock capture timestamp (seconds, f64)
    pub captured_at: f64,
}

/// Occupancy count derived from one frame
///
/// `source_id` must equal the `source_id` of the frame it was derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountMessage {
    /// Camera the source frame came from
    pub source_id: String,

    /// Number of detections that passed the class/confidence filter
    pub count: u32,

    /// Free-text classification description
    pub label: String,

    /// Wall-clock timestamp at publish time (seconds, f64)
    pub produced_at: f64,
}

/// One measured production-to-observation delay
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LatencySample {
    /// Delay in milliseconds; negative only under clock skew
    pub value_ms: f64,

    /// Wall-clock time the sample was observed (seconds)
    pub observed_at: f64,

    /// True when `value_ms` is negative. Skewed samples are kept as a
    /// data-quality signal rather than clamped to zero.
    pub clock_skewed: bool,
}

impl LatencySample {
    /// Build a sample from a message's production stamp and the observation time.
    pub fn observed(produced_at: f64, observed_at: f64) -> Self {
        let value_ms = (observed_at - produced_at) * 1000.0;
        Self {
            value_ms,
            observed_at,
            clock_skewed: value_ms < 0.0,
        }
    }
}

/// A completed fixed-interval throughput measurement
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThroughputWindow {
    /// Wall-clock time the window opened (seconds)
    pub window_started_at: f64,

    /// Messages received inside the window
    pub message_count: u64,

    /// Window length actually elapsed (seconds)
    pub elapsed_seconds: f64,
}

impl ThroughputWindow {
    /// Messages per second over the window.
    pub fn rate(&self) -> f64 {
        if self.elapsed_seconds > 0.0 {
            self.message_count as f64 / self.elapsed_seconds
        } else {
            0.0
        }
    }
}
