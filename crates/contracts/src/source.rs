//! FrameGrabber trait - capture resource boundary
//!
//! Abstracts the upstream camera/video handle so the paced publisher works
//! the same against a real capture device or the synthetic grabber.

use crate::{ContractError, RawFrame};

/// Frame-producing resource with a known native capture rate
pub trait FrameGrabber: Send + std::fmt::Debug {
    /// Native capture rate of the source (frames per second)
    fn native_fps(&self) -> f64;

    /// Pull the next raw frame
    ///
    /// Returns `Ok(None)` at end of stream - a normal terminal condition,
    /// not an error.
    fn grab(&mut self) -> Result<Option<RawFrame>, ContractError>;

    /// Release the underlying capture resource
    ///
    /// Must be idempotent: the source calls it once on shutdown, and a
    /// defensive caller may call it again.
    fn release(&mut self);
}
