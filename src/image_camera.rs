// Fake camera that yields a fixed image. For testing and for running the booth
// without camera hardware.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use async_trait::async_trait;
use canonical_error::{CanonicalError, failed_precondition_error, internal_error};
use image::RgbImage;
use image::imageops::{FilterType, resize, rotate180};

use crate::abstract_camera::{AbstractCamera, CapturedImage, Resolution};

pub struct ImageCamera {
    image: Arc<RgbImage>,
    resolution: Resolution,
    inverted: bool,
    started: bool,

    // When set, capture_still() fails. Lets callers exercise the capture
    // failure path.
    fail_stills: bool,

    // Zero means go fast as frames are requested.
    update_interval: Duration,

    frame_id: u64,
    last_frame_time: Instant,
}

impl ImageCamera {
    pub fn new(image: RgbImage) -> Result<Self, CanonicalError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(failed_precondition_error("ImageCamera image is empty"));
        }
        let resolution = Resolution::new(image.width(), image.height());
        Ok(ImageCamera{image: Arc::new(image),
                       resolution,
                       inverted: false,
                       started: false,
                       fail_stills: false,
                       update_interval: Duration::ZERO,
                       frame_id: 0,
                       last_frame_time: Instant::now(),})
    }

    pub fn set_inverted(&mut self, inverted: bool) {
        self.inverted = inverted;
    }

    pub fn set_update_interval(&mut self, update_interval: Duration) {
        self.update_interval = update_interval;
    }

    pub fn set_fail_stills(&mut self, fail_stills: bool) {
        self.fail_stills = fail_stills;
    }

    // Renders the source image at the configured resolution.
    fn render(&self) -> RgbImage {
        let mut image = if self.image.dimensions() ==
            (self.resolution.width, self.resolution.height)
        {
            self.image.as_ref().clone()
        } else {
            resize(self.image.as_ref(), self.resolution.width,
                   self.resolution.height, FilterType::Triangle)
        };
        if self.inverted {
            image = rotate180(&image);
        }
        image
    }
}

#[async_trait]
impl AbstractCamera for ImageCamera {
    fn model(&self) -> String {
        "ImageCamera".to_string()
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.resolution.width, self.resolution.height)
    }

    fn configure(&mut self, resolution: Resolution)
                 -> Result<Resolution, CanonicalError> {
        self.resolution = resolution;
        Ok(resolution)
    }

    async fn start(&mut self) -> Result<(), CanonicalError> {
        self.started = true;
        Ok(())
    }

    async fn capture_frame(&mut self) -> Result<CapturedImage, CanonicalError> {
        if !self.started {
            self.start().await?;
        }
        let next_frame_time = self.last_frame_time + self.update_interval;
        let sleep_interval = next_frame_time.saturating_duration_since(Instant::now());
        if sleep_interval > Duration::ZERO {
            tokio::time::sleep(sleep_interval).await;
        }
        self.frame_id += 1;
        self.last_frame_time = Instant::now();
        Ok(CapturedImage{image: Arc::new(self.render()),
                         frame_id: self.frame_id,
                         readout_time: SystemTime::now()})
    }

    async fn capture_still(&mut self, path: &Path) -> Result<(), CanonicalError> {
        if self.fail_stills {
            return Err(failed_precondition_error("ImageCamera still capture disabled"));
        }
        if let Err(e) = self.render().save(path) {
            // Don't leave a truncated file behind.
            let _ = std::fs::remove_file(path);
            return Err(internal_error(
                format!("Could not write {}: {}", path.display(), e).as_str()));
        }
        Ok(())
    }

    async fn stop(&mut self) {
        self.started = false;
    }
}
