//! Synthetic detector
//!
//! Deterministic stand-in for the real model: the number of detections is
//! derived from the frame content, so identical frames always yield the
//! same count. Used for testing and development without model weights.

use contracts::{
    BoundingBox, ContractError, Detection, Detector, ModelVariant, RawFrame,
};

/// Build the detector for a model variant.
///
/// # Errors
/// `ModelVariant::parse` already rejects unknown selectors; this is the
/// point where a real implementation would load weights and can fail.
pub fn build_detector(variant: ModelVariant) -> Result<Box<dyn Detector>, ContractError> {
    match variant {
        ModelVariant::Face => Ok(Box::new(SyntheticDetector::default())),
    }
}

/// Content-derived detector
#[derive(Debug, Clone)]
pub struct SyntheticDetector {
    /// Upper bound on confident detections per frame
    pub max_count: u32,
}

impl Default for SyntheticDetector {
    fn default() -> Self {
        Self { max_count: 8 }
    }
}

impl Detector for SyntheticDetector {
    fn infer(&self, frame: &RawFrame) -> Result<Vec<Detection>, ContractError> {
        if frame.data.is_empty() {
            return Err(ContractError::inference("synthetic", "empty frame"));
        }

        // fold the frame bytes into a stable per-frame count
        let digest: u32 = frame
            .data
            .iter()
            .step_by((frame.data.len() / 64).max(1))
            .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(*b as u32));
        let confident = digest % (self.max_count + 1);

        let mut detections = Vec::with_capacity(confident as usize + 2);
        for i in 0..confident {
            detections.push(Detection {
                bbox: BoundingBox {
                    x1: (i * 10) as f32,
                    y1: 0.0,
                    x2: (i * 10 + 8) as f32,
                    y2: 16.0,
                },
                class_id: 0,
                confidence: 0.9,
            });
        }
        // noise the class/confidence filter must reject
        detections.push(Detection {
            bbox: BoundingBox {
                x1: 0.0,
                y1: 0.0,
                x2: 4.0,
                y2: 4.0,
            },
            class_id: 0,
            confidence: 0.1,
        });
        detections.push(Detection {
            bbox: BoundingBox {
                x1: 0.0,
                y1: 0.0,
                x2: 4.0,
                y2: 4.0,
            },
            class_id: 7,
            confidence: 0.95,
        });

        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::{ClassFilter, PixelFormat};

    fn frame(fill: u8) -> RawFrame {
        RawFrame {
            width: 8,
            height: 8,
            format: PixelFormat::Gray8,
            data: Bytes::from(vec![fill; 64]),
        }
    }

    #[test]
    fn test_deterministic_per_frame() {
        let detector = SyntheticDetector::default();
        let a = detector.infer(&frame(3)).unwrap();
        let b = detector.infer(&frame(3)).unwrap();
        assert_eq!(a.len(), b.len());
    }

    #[test]
    fn test_always_emits_filterable_noise() {
        let detector = SyntheticDetector::default();
        let filter = ClassFilter::default();
        let detections = detector.infer(&frame(0)).unwrap();

        let rejected = detections.iter().filter(|d| !filter.accepts(d)).count();
        assert_eq!(rejected, 2);
    }
}
