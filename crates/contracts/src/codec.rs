//! FrameCodec trait - image codec boundary
//!
//! The real compressor (JPEG or similar) is an external collaborator; the
//! pipeline only sees `encode`/`decode`. `RawBytesCodec` is the in-tree
//! stand-in used by tests and mock runs.

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Decoded image exchanged across the codec/detector boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFrame {
    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Pixel layout
    pub format: PixelFormat,

    /// Packed pixel data, row-major
    pub data: Bytes,
}

impl RawFrame {
    /// Expected byte length for the declared dimensions and format.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

/// Pixel layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    Bgr8,
    Rgb8,
    Gray8,
}

impl PixelFormat {
    /// Bytes per pixel for this layout.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::Bgr8 | Self::Rgb8 => 3,
            Self::Gray8 => 1,
        }
    }
}

impl PixelFormat {
    fn to_tag(self) -> u8 {
        match self {
            Self::Bgr8 => 0,
            Self::Rgb8 => 1,
            Self::Gray8 => 2,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Bgr8),
            1 => Some(Self::Rgb8),
            2 => Some(Self::Gray8),
            _ => None,
        }
    }
}

/// Image codec boundary
///
/// # Errors
/// Failures surface as recoverable encode/decode errors, not crashes; the
/// calling loop logs and moves to the next frame.
pub trait FrameCodec: Send + Sync {
    /// Compress a raw frame into an opaque payload
    fn encode(&self, frame: &RawFrame) -> Result<Bytes, ContractError>;

    /// Decompress a payload back into a raw frame
    fn decode(&self, payload: &[u8]) -> Result<RawFrame, ContractError>;
}

/// Header-prefixed passthrough codec
///
/// Wire layout: `width: u32 LE | height: u32 LE | format: u8 | pixels`.
/// No compression; exists so the pipeline runs end-to-end without a real
/// image library.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawBytesCodec;

const HEADER_LEN: usize = 9;

impl FrameCodec for RawBytesCodec {
    fn encode(&self, frame: &RawFrame) -> Result<Bytes, ContractError> {
        if frame.data.len() != frame.expected_len() {
            return Err(ContractError::encode(format!(
                "pixel buffer is {} bytes, expected {} for {}x{}",
                frame.data.len(),
                frame.expected_len(),
                frame.width,
                frame.height
            )));
        }

        let mut buf = BytesMut::with_capacity(HEADER_LEN + frame.data.len());
        buf.put_u32_le(frame.width);
        buf.put_u32_le(frame.height);
        buf.put_u8(frame.format.to_tag());
        buf.extend_from_slice(&frame.data);
        Ok(buf.freeze())
    }

    fn decode(&self, payload: &[u8]) -> Result<RawFrame, ContractError> {
        if payload.len() < HEADER_LEN {
            return Err(ContractError::decode(format!(
                "payload too short: {} bytes",
                payload.len()
            )));
        }

        let mut word = [0u8; 4];
        word.copy_from_slice(&payload[0..4]);
        let width = u32::from_le_bytes(word);
        word.copy_from_slice(&payload[4..8]);
        let height = u32::from_le_bytes(word);
        let format = PixelFormat::from_tag(payload[8])
            .ok_or_else(|| ContractError::decode(format!("unknown format tag {}", payload[8])))?;

        let frame = RawFrame {
            width,
            height,
            format,
            data: Bytes::copy_from_slice(&payload[HEADER_LEN..]),
        };

        if frame.data.len() != frame.expected_len() {
            return Err(ContractError::decode(format!(
                "pixel buffer is {} bytes, expected {} for {}x{}",
                frame.data.len(),
                frame.expected_len(),
                width,
                height
            )));
        }

        Ok(frame)
    }
}
