//! # Capture
//!
//! Frame acquisition and the paced frame publisher.
//!
//! Responsibilities:
//! - Open a frame-producing resource from a source URI
//! - Pace encoded frames onto the bus at the source's native rate
//! - Release the capture resource exactly once on shutdown

mod source;
mod synthetic;

pub use source::{FrameSource, FrameSourceConfig};
pub use synthetic::{SyntheticGrabber, SyntheticGrabberConfig};

use contracts::{ContractError, FrameGrabber};

/// Open a capture resource from a URI.
///
/// `synthetic:` URIs (e.g. `synthetic://?fps=20&frames=100&width=64&height=48`)
/// open the in-tree generator; anything else needs a real capture backend
/// and is rejected here.
///
/// # Errors
/// An unopenable source is fatal at startup.
pub fn open_source(uri: &str) -> Result<Box<dyn FrameGrabber>, ContractError> {
    if uri.starts_with("synthetic:") {
        let config = SyntheticGrabberConfig::from_uri(uri)?;
        return Ok(Box::new(SyntheticGrabber::new(config)));
    }
    Err(ContractError::source_open(
        uri,
        "no capture backend for this URI scheme (expected synthetic://...)",
    ))
}
