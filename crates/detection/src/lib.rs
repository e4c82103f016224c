//! # Detection
//!
//! The detection node: consumes encoded frames, runs the detection
//! capability over each, and republishes filtered occupancy counts.
//!
//! Per-frame decode and inference failures are recoverable; the loop logs
//! them and moves on. Only construction (unsupported model variant) and
//! topic setup can fail fatally.

mod node;
mod synthetic;

pub use node::{DetectionNode, DetectionNodeConfig};
pub use synthetic::{build_detector, SyntheticDetector};
