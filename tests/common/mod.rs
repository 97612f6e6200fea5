//! Test doubles and helpers shared by the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use async_trait::async_trait;
use canonical_error::{CanonicalError, internal_error, unavailable_error};
use image::{Rgb, RgbImage};
use tokio::sync::Notify;

use photobooth::abstract_camera::{AbstractCamera, CapturedImage, Resolution};
use photobooth::booth::Photobooth;
use photobooth::config::BoothConfig;
use photobooth::printer::PrinterSink;
use photobooth::session::{BoothEvent, EventReceiver};

/// Switches for a [`FlakyCamera`] that stay reachable after the camera has
/// been handed to the booth.
#[derive(Clone, Default)]
pub struct CameraControl {
    pub fail_frames: Arc<AtomicBool>,
    pub fail_stills: Arc<AtomicBool>,
    pub stills_taken: Arc<AtomicUsize>,
}

pub struct FlakyCamera {
    control: CameraControl,
    resolution: Resolution,
    frame_id: u64,
}

impl FlakyCamera {
    pub fn new() -> (Self, CameraControl) {
        let control = CameraControl::default();
        (FlakyCamera{control: control.clone(),
                     resolution: Resolution::new(64, 48),
                     frame_id: 0},
         control)
    }

    fn image(&self) -> RgbImage {
        RgbImage::from_fn(self.resolution.width, self.resolution.height,
                          |x, y| Rgb([(x * 3) as u8, (y * 5) as u8, 90]))
    }
}

#[async_trait]
impl AbstractCamera for FlakyCamera {
    fn model(&self) -> String {
        "FlakyCamera".to_string()
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.resolution.width, self.resolution.height)
    }

    fn configure(&mut self, resolution: Resolution) -> Result<Resolution, CanonicalError> {
        self.resolution = resolution;
        Ok(resolution)
    }

    async fn start(&mut self) -> Result<(), CanonicalError> {
        Ok(())
    }

    async fn capture_frame(&mut self) -> Result<CapturedImage, CanonicalError> {
        if self.control.fail_frames.load(Ordering::SeqCst) {
            return Err(unavailable_error("camera unplugged"));
        }
        self.frame_id += 1;
        Ok(CapturedImage{image: Arc::new(self.image()),
                         frame_id: self.frame_id,
                         readout_time: SystemTime::now()})
    }

    async fn capture_still(&mut self, path: &Path) -> Result<(), CanonicalError> {
        if self.control.fail_stills.load(Ordering::SeqCst) {
            return Err(internal_error("sensor timeout"));
        }
        self.image().save(path).map_err(|e| internal_error(&e.to_string()))?;
        self.control.stills_taken.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&mut self) {}
}

/// Records every print request. Optionally fails, or holds each request until
/// released.
#[derive(Clone, Default)]
pub struct RecordingPrinter {
    pub calls: Arc<Mutex<Vec<(PathBuf, String)>>>,
    pub fail: Arc<AtomicBool>,
    pub gate: Option<Arc<Notify>>,
}

impl RecordingPrinter {
    pub fn gated() -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        (RecordingPrinter{gate: Some(gate.clone()), ..Default::default()}, gate)
    }

    pub fn calls(&self) -> Vec<(PathBuf, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PrinterSink for RecordingPrinter {
    async fn print(&self, artifact: &Path, device_id: &str) -> Result<(), CanonicalError> {
        self.calls.lock().unwrap().push((artifact.to_path_buf(), device_id.to_string()));
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(internal_error("printer.py exited with status 1"));
        }
        Ok(())
    }
}

pub fn test_config(photo_dir: &Path) -> BoothConfig {
    let mut config = BoothConfig::default();
    config.photo_dir = photo_dir.to_path_buf();
    // Deterministic captions regardless of installed fonts.
    config.captions.font_path = None;
    config
}

pub async fn booth_with(photo_dir: &Path, printer: RecordingPrinter)
                        -> (Photobooth, EventReceiver, CameraControl) {
    let (camera, control) = FlakyCamera::new();
    let (booth, events) = Photobooth::new(test_config(photo_dir), Box::new(camera),
                                          Arc::new(printer))
        .await
        .unwrap();
    (booth, events, control)
}

pub fn drain(events: &mut EventReceiver) -> Vec<BoothEvent> {
    let mut out = vec![];
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

pub fn files_with_extension(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir).unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == extension))
        .collect();
    files.sort();
    files
}
