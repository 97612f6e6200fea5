//! Live camera preview.
//!
//! The preview loop pulls one frame per tick and hands it, scaled to the
//! preview region, to a [`PreviewSink`]. It never waits on the capture or
//! print path: while a still is being taken it simply skips ticks, and camera
//! errors are logged and retried on the next tick.

use std::time::Duration;

use fast_image_resize::Resizer;
use image::RgbImage;
use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::abstract_camera::Resolution;
use crate::capture_session::SharedCamera;
use crate::error::BoothError;
use crate::scaling::scale_rgb;
use crate::session::{SessionHandle, SessionState};

/// Where preview frames end up (a window, a framebuffer, a test recorder).
pub trait PreviewSink: Send {
    fn render(&mut self, frame: &RgbImage, frame_id: u64);
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Rendered,
    /// Camera busy with a still; nothing acquired this tick.
    Paused,
    Failed,
}

pub struct PreviewLoop {
    camera: SharedCamera,
    session: SessionHandle,
    region: Resolution,
    interval: Duration,
    resizer: Resizer,
    consecutive_failures: u32,
}

impl PreviewLoop {
    pub fn new(camera: SharedCamera, session: SessionHandle, region: Resolution,
               interval: Duration) -> Self {
        PreviewLoop{camera, session, region, interval,
                    resizer: Resizer::new(),
                    consecutive_failures: 0}
    }

    /// Acquires and renders one frame.
    pub async fn tick(&mut self, sink: &mut dyn PreviewSink) -> TickOutcome {
        if self.session.state() == SessionState::Capturing {
            return TickOutcome::Paused;
        }
        let captured = {
            let Ok(mut camera) = self.camera.try_lock() else {
                return TickOutcome::Paused;
            };
            camera.capture_frame().await
        };
        let captured = match captured {
            Ok(c) => c,
            Err(e) => {
                self.consecutive_failures += 1;
                // Don't flood the log while the camera is unplugged.
                if self.consecutive_failures == 1 || self.consecutive_failures % 100 == 0 {
                    warn!("{} ({} in a row)", BoothError::camera_unavailable(e),
                          self.consecutive_failures);
                }
                return TickOutcome::Failed;
            }
        };
        if self.consecutive_failures > 0 {
            info!("Camera recovered after {} failed frames", self.consecutive_failures);
            self.consecutive_failures = 0;
        }
        match scale_rgb(&mut self.resizer, &captured.image,
                        self.region.width, self.region.height) {
            Ok(frame) => {
                sink.render(&frame, captured.frame_id);
                TickOutcome::Rendered
            },
            Err(e) => {
                warn!("Preview frame dropped: {}", e);
                TickOutcome::Failed
            }
        }
    }

    /// Ticks every `interval` until `shutdown` becomes true (or its sender is
    /// dropped). Late ticks are skipped rather than bunched up.
    pub async fn run(mut self, sink: &mut dyn PreviewSink,
                     mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!("Preview loop running every {:?}", self.interval);
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick(sink).await;
                },
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                },
            }
        }
        debug!("Preview loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture_session::share_camera;
    use crate::image_camera::ImageCamera;

    #[derive(Default)]
    struct CountingSink {
        frames: Vec<(u32, u32)>,
    }

    impl PreviewSink for CountingSink {
        fn render(&mut self, frame: &RgbImage, _frame_id: u64) {
            self.frames.push(frame.dimensions());
        }
    }

    fn preview(session: SessionHandle) -> (PreviewLoop, SharedCamera) {
        let camera = share_camera(Box::new(ImageCamera::new(RgbImage::new(64, 48)).unwrap()));
        let preview = PreviewLoop::new(camera.clone(), session, Resolution::new(80, 60),
                                       Duration::from_millis(33));
        (preview, camera)
    }

    #[tokio::test]
    async fn test_tick_scales_to_region() {
        let (mut preview, _camera) = preview(SessionHandle::new());
        let mut sink = CountingSink::default();
        assert_eq!(preview.tick(&mut sink).await, TickOutcome::Rendered);
        assert_eq!(sink.frames, vec![(80, 60)]);
    }

    #[tokio::test]
    async fn test_paused_while_capturing() {
        let session = SessionHandle::new();
        let (mut preview, _camera) = preview(session.clone());
        let mut sink = CountingSink::default();

        let guard = session.try_begin(SessionState::CountingDown).unwrap();
        // The countdown overlay sits on top of a live preview.
        assert_eq!(preview.tick(&mut sink).await, TickOutcome::Rendered);
        guard.advance(SessionState::Capturing);
        assert_eq!(preview.tick(&mut sink).await, TickOutcome::Paused);
        drop(guard);
        assert_eq!(preview.tick(&mut sink).await, TickOutcome::Rendered);
        assert_eq!(sink.frames.len(), 2);
    }

    #[tokio::test]
    async fn test_paused_while_camera_locked() {
        let (mut preview, camera) = preview(SessionHandle::new());
        let mut sink = CountingSink::default();
        let held = camera.lock().await;
        assert_eq!(preview.tick(&mut sink).await, TickOutcome::Paused);
        drop(held);
        assert_eq!(preview.tick(&mut sink).await, TickOutcome::Rendered);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_shutdown() {
        let (preview, _camera) = preview(SessionHandle::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut sink = CountingSink::default();
            preview.run(&mut sink, shutdown_rx).await;
            sink.frames.len()
        });
        tokio::time::sleep(Duration::from_millis(330)).await;
        shutdown_tx.send(true).unwrap();
        let frames = task.await.unwrap();
        assert!(frames >= 5, "only {} frames", frames);
    }
}
