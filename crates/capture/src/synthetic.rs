//! Synthetic frame generator
//!
//! Implements `FrameGrabber`, producing gradient frames at a fixed rate.
//! Used for testing and development without a camera or video file.

use bytes::Bytes;
use contracts::{ContractError, FrameGrabber, PixelFormat, RawFrame};
use tracing::debug;

/// Synthetic grabber configuration
#[derive(Debug, Clone)]
pub struct SyntheticGrabberConfig {
    /// Native rate the generator reports (Hz)
    pub fps: f64,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Frames before end-of-stream (None = endless)
    pub max_frames: Option<u64>,
}

impl Default for SyntheticGrabberConfig {
    fn default() -> Self {
        Self {
            fps: 20.0,
            width: 64,
            height: 48,
            max_frames: None,
        }
    }
}

impl SyntheticGrabberConfig {
    /// Parse a `synthetic://?fps=..&frames=..&width=..&height=..` URI.
    pub fn from_uri(uri: &str) -> Result<Self, ContractError> {
        let mut config = Self::default();
        let Some(query) = uri.splitn(2, '?').nth(1) else {
            return Ok(config);
        };

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| ContractError::source_open(uri, format!("bad parameter '{pair}'")))?;
            let parse_err =
                |e: &dyn std::fmt::Display| ContractError::source_open(uri, format!("{key}: {e}"));
            match key {
                "fps" => config.fps = value.parse().map_err(|e| parse_err(&e))?,
                "width" => config.width = value.parse().map_err(|e| parse_err(&e))?,
                "height" => config.height = value.parse().map_err(|e| parse_err(&e))?,
                "frames" => config.max_frames = Some(value.parse().map_err(|e| parse_err(&e))?),
                other => {
                    return Err(ContractError::source_open(
                        uri,
                        format!("unknown parameter '{other}'"),
                    ));
                }
            }
        }

        if !(config.fps > 0.0) {
            return Err(ContractError::source_open(uri, "fps must be positive"));
        }
        Ok(config)
    }
}

/// Deterministic frame generator
#[derive(Debug)]
pub struct SyntheticGrabber {
    config: SyntheticGrabberConfig,
    next_frame: u64,
    released: bool,
}

impl SyntheticGrabber {
    /// Create a generator from explicit configuration.
    pub fn new(config: SyntheticGrabberConfig) -> Self {
        Self {
            config,
            next_frame: 0,
            released: false,
        }
    }

    fn generate(&self, index: u64) -> RawFrame {
        let w = self.config.width as usize;
        let h = self.config.height as usize;
        let mut data = vec![0u8; w * h * 3];
        // gradient shifted per frame, so consecutive frames differ
        for y in 0..h {
            for x in 0..w {
                let base = (y * w + x) * 3;
                data[base] = (x as u64 + index) as u8;
                data[base + 1] = (y as u64 + index) as u8;
                data[base + 2] = index as u8;
            }
        }
        RawFrame {
            width: self.config.width,
            height: self.config.height,
            format: PixelFormat::Bgr8,
            data: Bytes::from(data),
        }
    }
}

impl FrameGrabber for SyntheticGrabber {
    fn native_fps(&self) -> f64 {
        self.config.fps
    }

    fn grab(&mut self) -> Result<Option<RawFrame>, ContractError> {
        if self.released {
            return Ok(None);
        }
        if let Some(max) = self.config.max_frames {
            if self.next_frame >= max {
                return Ok(None);
            }
        }
        let frame = self.generate(self.next_frame);
        self.next_frame += 1;
        Ok(Some(frame))
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            debug!(frames = self.next_frame, "synthetic grabber released");
        }
    }
}
