use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use canonical_error::{CanonicalError, failed_precondition_error, internal_error,
                      not_found_error, unavailable_error};
use image::ImageFormat;
use log::{debug, info, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream as MmapStream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, Format, FourCC};

use crate::abstract_camera::{AbstractCamera, CapturedImage, Resolution};

const BUFFER_COUNT: u32 = 4;

#[derive(Debug)]
pub struct EnumeratedCameraInfo {
    pub index: usize,
    pub path: PathBuf,
    pub name: String,
}

/// A V4L2 camera (USB webcam, or the Raspberry Pi camera through the
/// bcm2835-v4l2 / libcamera V4L2 compatibility layer) streaming MJPG.
pub struct V4lCamera {
    device: Device,
    name: String,
    resolution: Resolution,

    // Present while streaming.
    stream: Option<MmapStream<'static>>,
    frame_id: u64,
}

impl V4lCamera {
    pub fn enumerate_cameras() -> Vec<EnumeratedCameraInfo> {
        let mut answer = vec![];
        for node in v4l::context::enum_devices() {
            answer.push(EnumeratedCameraInfo{
                index: node.index(),
                path: node.path().to_path_buf(),
                name: node.name().unwrap_or_else(|| "unknown".to_string())});
        }
        answer
    }

    // Returns a V4lCamera instance that implements the AbstractCamera API.
    // `camera_index` is the N of /dev/videoN.
    pub fn new(camera_index: usize) -> Result<Self, CanonicalError> {
        let device = match Device::new(camera_index) {
            Ok(d) => d,
            Err(e) => return Err(not_found_error(
                format!("Could not open /dev/video{}: {}", camera_index, e).as_str())),
        };
        let name = match device.query_caps() {
            Ok(caps) => caps.card,
            Err(e) => return Err(failed_precondition_error(&e.to_string())),
        };
        let format = match device.format() {
            Ok(f) => f,
            Err(e) => return Err(failed_precondition_error(&e.to_string())),
        };
        info!("Opened {} at {}x{}", name, format.width, format.height);
        Ok(V4lCamera{device,
                     name,
                     resolution: Resolution::new(format.width.max(1), format.height.max(1)),
                     stream: None,
                     frame_id: 0})
    }

    // Pulls the next compressed frame off the stream, starting it if needed.
    // The dequeue ioctl blocks until the sensor delivers, so it runs on the
    // blocking pool with the stream moved in and handed back afterwards.
    async fn next_jpeg(&mut self) -> Result<Vec<u8>, CanonicalError> {
        if self.stream.is_none() {
            self.start().await?;
        }
        let Some(mut stream) = self.stream.take() else {
            return Err(unavailable_error("Camera stream not running"));
        };
        let dequeued = tokio::task::spawn_blocking(move || {
            let frame = dequeue_jpeg(&mut stream);
            (stream, frame)
        }).await;
        match dequeued {
            Ok((stream, Ok(jpeg))) => {
                self.stream = Some(stream);
                self.frame_id += 1;
                Ok(jpeg)
            },
            // The stream is dropped so the next call re-negotiates it.
            Ok((_stream, Err(e))) => Err(unavailable_error(&e.to_string())),
            Err(e) => Err(internal_error(
                format!("Frame dequeue task failed: {}", e).as_str())),
        }
    }
}

fn dequeue_jpeg(stream: &mut MmapStream<'static>) -> std::io::Result<Vec<u8>> {
    let (buf, meta) = stream.next()?;
    Ok(frame_payload(buf, meta.bytesused))
}

// Mapped buffers are sized for the largest frame; only `bytesused` of them
// is the JPEG.
fn frame_payload(buf: &[u8], bytesused: u32) -> Vec<u8> {
    let used = (bytesused as usize).min(buf.len());
    buf[..used].to_vec()
}

#[async_trait]
impl AbstractCamera for V4lCamera {
    fn model(&self) -> String {
        self.name.clone()
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.resolution.width, self.resolution.height)
    }

    fn configure(&mut self, resolution: Resolution)
                 -> Result<Resolution, CanonicalError> {
        let requested = Format::new(resolution.width, resolution.height,
                                    FourCC::new(b"MJPG"));
        let granted = match self.device.set_format(&requested) {
            Ok(f) => f,
            Err(e) => return Err(failed_precondition_error(&e.to_string())),
        };
        if granted.fourcc != FourCC::new(b"MJPG") {
            return Err(failed_precondition_error(
                format!("{} does not deliver MJPG (got {})",
                        self.name, granted.fourcc).as_str()));
        }
        if granted.width != resolution.width || granted.height != resolution.height {
            warn!("Requested {} but camera granted {}x{}",
                  resolution, granted.width, granted.height);
        }
        self.resolution = Resolution::new(granted.width.max(1), granted.height.max(1));
        // Buffers are sized for the old format.
        self.stream = None;
        Ok(self.resolution)
    }

    async fn start(&mut self) -> Result<(), CanonicalError> {
        if self.stream.is_some() {
            return Ok(());
        }
        match MmapStream::with_buffers(&self.device, Type::VideoCapture, BUFFER_COUNT) {
            Ok(stream) => {
                debug!("Started streaming from {}", self.name);
                self.stream = Some(stream);
                Ok(())
            },
            Err(e) => Err(unavailable_error(&e.to_string())),
        }
    }

    async fn capture_frame(&mut self) -> Result<CapturedImage, CanonicalError> {
        let jpeg = self.next_jpeg().await?;
        let decoded = match image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg) {
            Ok(d) => d,
            Err(e) => return Err(unavailable_error(
                format!("Undecodable frame: {}", e).as_str())),
        };
        Ok(CapturedImage{image: Arc::new(decoded.to_rgb8()),
                         frame_id: self.frame_id,
                         readout_time: SystemTime::now()})
    }

    async fn capture_still(&mut self, path: &Path) -> Result<(), CanonicalError> {
        let jpeg = self.next_jpeg().await?;
        // The MJPG payload is already a complete JPEG file.
        if let Err(e) = tokio::fs::write(path, &jpeg).await {
            let _ = tokio::fs::remove_file(path).await;
            return Err(internal_error(
                format!("Could not write {}: {}", path.display(), e).as_str()));
        }
        Ok(())
    }

    async fn stop(&mut self) {
        if self.stream.take().is_some() {
            debug!("Stopped streaming from {}", self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_payload() {
        let buf = [0xff, 0xd8, 0xff, 0xd9, 0, 0, 0, 0];
        assert_eq!(frame_payload(&buf, 4), vec![0xff, 0xd8, 0xff, 0xd9]);
        // A driver over-reporting bytesused cannot read past the buffer.
        assert_eq!(frame_payload(&buf, 100).len(), buf.len());
        assert!(frame_payload(&buf, 0).is_empty());
    }
}
