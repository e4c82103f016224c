//! Detector trait - object detection boundary
//!
//! The real model (YOLO or similar) is an external collaborator; the
//! detection node only sees `infer` plus the class/confidence filter
//! applied to its output.

use serde::{Deserialize, Serialize};

use crate::{ContractError, RawFrame};

/// Axis-aligned bounding box in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// One model detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Location in the frame
    pub bbox: BoundingBox,

    /// Model class index (0 = person for the bundled variants)
    pub class_id: u32,

    /// Model confidence in [0, 1]
    pub confidence: f32,
}

/// Detection capability boundary
pub trait Detector: Send + Sync {
    /// Run the model over a decoded frame
    ///
    /// # Errors
    /// Per-frame failures are recoverable; the calling loop logs and
    /// continues with the next frame.
    fn infer(&self, frame: &RawFrame) -> Result<Vec<Detection>, ContractError>;
}

/// Selects which bundled model the detection node loads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelVariant {
    /// Person/face counting model
    Face,
}

impl ModelVariant {
    /// Parse a CLI/config selector string.
    pub fn parse(value: &str) -> Result<Self, ContractError> {
        match value {
            "face" => Ok(Self::Face),
            other => Err(ContractError::ModelInit {
                variant: other.to_string(),
                message: "supported variants: face".to_string(),
            }),
        }
    }

    /// Selector string as written in config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Face => "face",
        }
    }
}

/// Class + confidence filter applied to model output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassFilter {
    /// Class index to keep
    pub class_id: u32,

    /// Minimum confidence to keep
    pub confidence_threshold: f32,
}

impl Default for ClassFilter {
    fn default() -> Self {
        Self {
            class_id: 0,
            confidence_threshold: 0.3,
        }
    }
}

impl ClassFilter {
    /// Whether a detection survives the filter.
    pub fn accepts(&self, detection: &Detection) -> bool {
        detection.class_id == self.class_id && detection.confidence >= self.confidence_threshold
    }
}
