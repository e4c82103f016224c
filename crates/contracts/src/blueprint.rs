//! PipelineBlueprint - Config Loader output
//!
//! Describes a complete pipeline run: capture source, detection settings,
//! topic names and QoS, metrics windowing, count log destination. Every
//! per-run value lives here rather than as a literal in the node logic.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::TopicQos;

/// Complete pipeline configuration blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineBlueprint {
    /// Capture source settings
    pub source: SourceConfig,

    /// Detection node settings
    #[serde(default)]
    pub detection: DetectionConfig,

    /// QoS applied to both pipeline topics
    #[serde(default)]
    pub qos: TopicQos,

    /// Topic names
    #[serde(default)]
    pub topics: TopicsConfig,

    /// Metrics windowing
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Count log destination
    #[serde(default)]
    pub log: LogConfig,
}

/// Capture source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Source path or URI (e.g. `synthetic://?fps=20&frames=100`)
    pub uri: String,

    /// Camera identity stamped on published frames
    #[serde(default = "default_camera_id")]
    pub camera_id: String,

    /// Publish rate override; None = the source's native rate
    #[serde(default)]
    pub target_fps: Option<f64>,
}

fn default_camera_id() -> String {
    "camera_1".to_string()
}

/// Detection node settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Model variant selector
    #[serde(default = "default_model")]
    pub model: String,

    /// Class index kept by the filter
    #[serde(default)]
    pub target_class: u32,

    /// Minimum confidence kept by the filter
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// Classification description stamped on count messages
    #[serde(default = "default_label")]
    pub label: String,
}

fn default_model() -> String {
    "face".to_string()
}

fn default_confidence_threshold() -> f32 {
    0.3
}

fn default_label() -> String {
    "Crowd detected".to_string()
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            target_class: 0,
            confidence_threshold: default_confidence_threshold(),
            label: default_label(),
        }
    }
}

/// Topic names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicsConfig {
    /// Encoded-frame topic
    #[serde(default = "default_frames_topic")]
    pub frames: String,

    /// Occupancy-count topic
    #[serde(default = "default_counts_topic")]
    pub counts: String,
}

fn default_frames_topic() -> String {
    "frames".to_string()
}

fn default_counts_topic() -> String {
    "counts".to_string()
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            frames: default_frames_topic(),
            counts: default_counts_topic(),
        }
    }
}

/// Metrics windowing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Throughput window length (seconds)
    #[serde(default = "default_window_seconds")]
    pub throughput_window_seconds: f64,

    /// Completed windows retained before eviction
    #[serde(default = "default_history_capacity")]
    pub throughput_history_capacity: usize,
}

fn default_window_seconds() -> f64 {
    1.0
}

fn default_history_capacity() -> usize {
    10
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            throughput_window_seconds: default_window_seconds(),
            throughput_history_capacity: default_history_capacity(),
        }
    }
}

/// Count log destination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Append-only CSV path
    #[serde(default = "default_log_path")]
    pub path: PathBuf,
}

fn default_log_path() -> PathBuf {
    PathBuf::from("crowd_counts.csv")
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: default_log_path(),
        }
    }
}
