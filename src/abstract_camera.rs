use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use canonical_error::{CanonicalError, invalid_argument_error};
use image::RgbImage;

/// Capture size requested from (and granted by) a camera, in pixels.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Resolution {
        assert!(width > 0);
        assert!(height > 0);
        Resolution{width, height}
    }
}

/// Parses "640x480".
impl FromStr for Resolution {
    type Err = CanonicalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || invalid_argument_error(
            format!("Resolution must look like 640x480, got {:?}", s).as_str());
        let (w, h) = s.split_once(['x', 'X']).ok_or_else(bad)?;
        let width: u32 = w.trim().parse().map_err(|_| bad())?;
        let height: u32 = h.trim().parse().map_err(|_| bad())?;
        if width == 0 || height == 0 {
            return Err(bad());
        }
        Ok(Resolution::new(width, height))
    }
}

#[derive(Clone)]
pub struct CapturedImage {
    /// Decoded RGB frame. Shared so that a frame can be handed to several
    /// consumers without copying the pixels.
    pub image: Arc<RgbImage>,

    /// Increments with every frame the camera produces.
    pub frame_id: u64,

    pub readout_time: SystemTime,
}

/// AbstractCamera models a colour camera that can stream preview frames and
/// persist full-resolution stills. Implementations own their device
/// lifecycle; callers treat every error as recoverable.
#[async_trait]
pub trait AbstractCamera: Send {
    /// Returns a string identifying what kind of camera this is, e.g.
    /// "USB Camera: HD Webcam", "ImageCamera".
    fn model(&self) -> String;

    /// Returns the (width, height) frames are currently delivered at.
    fn dimensions(&self) -> (u32, u32);

    /// Requests a capture resolution. The implementation may adjust it to
    /// something the device supports; the granted resolution is returned.
    /// Takes effect at the next start().
    fn configure(&mut self, resolution: Resolution)
                 -> Result<Resolution, CanonicalError>;

    /// Begins streaming. Calling start() on a started camera is a no-op.
    async fn start(&mut self) -> Result<(), CanonicalError>;

    /// Obtains the next preview frame. Blocks (asynchronously) until a frame
    /// newer than the previous call's is available.
    async fn capture_frame(&mut self) -> Result<CapturedImage, CanonicalError>;

    /// Writes a full-resolution JPEG still to `path`. The file must not be
    /// left behind partially written on error.
    async fn capture_still(&mut self, path: &Path) -> Result<(), CanonicalError>;

    /// Shuts down streaming. A subsequent capture re-starts the camera.
    async fn stop(&mut self);
}
