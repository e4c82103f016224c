//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Wall-clock seconds since the UNIX epoch (f64) is the primary clock,
//!   stamped by publishers and compared by consumers
//! - Latency across nodes assumes roughly synchronized clocks; negative
//!   deltas are flagged as skew, never discarded

mod blueprint;
mod clock;
mod codec;
mod detector;
mod error;
mod message;
mod qos;
mod runtime;
mod sink;
mod source;

pub use blueprint::{
    DetectionConfig, LogConfig, MetricsConfig, PipelineBlueprint, SourceConfig, TopicsConfig,
};
pub use clock::now_secs;
pub use codec::{FrameCodec, PixelFormat, RawBytesCodec, RawFrame};
pub use detector::{BoundingBox, ClassFilter, Detection, Detector, ModelVariant};
pub use error::ContractError;
pub use message::{CountMessage, FrameMessage, LatencySample, ThroughputWindow};
pub use qos::{DropPolicy, Durability, Reliability, TopicQos};
pub use runtime::{NodeState, NodeStateCell, ShutdownToken};
pub use sink::CountSink;
pub use source::FrameGrabber;
