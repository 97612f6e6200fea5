use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Local, NaiveDateTime};
use log::{info, warn};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::abstract_camera::AbstractCamera;
use crate::config::CountdownConfig;
use crate::error::{BoothError, Result};
use crate::session::{BoothEvent, EventSender, LastPhoto, SessionGuard, SessionHandle,
                     SessionState, emit};

/// The camera, shared between the preview loop (which only ever try-locks it)
/// and still capture (which waits for it).
pub type SharedCamera = Arc<Mutex<Box<dyn AbstractCamera + Send>>>;

pub fn share_camera(camera: Box<dyn AbstractCamera + Send>) -> SharedCamera {
    Arc::new(Mutex::new(camera))
}

/// `photo_2025-06-15_14-30-00.jpg`
pub fn photo_file_name(timestamp: &NaiveDateTime) -> String {
    format!("photo_{}.jpg", timestamp.format("%Y-%m-%d_%H-%M-%S"))
}

// Photos are never overwritten. A second capture within the same second gets
// a numeric suffix.
fn unused_photo_path(photo_dir: &Path, timestamp: &NaiveDateTime) -> PathBuf {
    let path = photo_dir.join(photo_file_name(timestamp));
    if !path.exists() {
        return path;
    }
    let stem = format!("photo_{}", timestamp.format("%Y-%m-%d_%H-%M-%S"));
    let mut n = 1;
    loop {
        let candidate = photo_dir.join(format!("{}_{}.jpg", stem, n));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Runs the countdown -> shutter -> still capture sequence and owns the
/// LastPhoto record.
pub struct CaptureSession {
    camera: SharedCamera,
    session: SessionHandle,
    photo_dir: PathBuf,
    countdown: CountdownConfig,
    events: EventSender,

    captures_started: AtomicU64,
}

impl CaptureSession {
    pub fn new(camera: SharedCamera,
               session: SessionHandle,
               photo_dir: PathBuf,
               countdown: CountdownConfig,
               events: EventSender) -> Self {
        CaptureSession{camera, session, photo_dir, countdown, events,
                       captures_started: AtomicU64::new(0)}
    }

    pub fn photo_dir(&self) -> &Path {
        &self.photo_dir
    }

    /// Number of capture sequences that have been started.
    pub fn captures_started(&self) -> u64 {
        self.captures_started.load(Ordering::SeqCst)
    }

    /// Starts a capture sequence in the background if the session is Idle.
    /// Returns None, and does nothing else, if the session is busy.
    pub fn request_capture(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let guard = self.session.try_begin(SessionState::CountingDown)?;
        self.captures_started.fetch_add(1, Ordering::SeqCst);
        let this = Arc::clone(self);
        Some(tokio::spawn(async move {
            this.run_sequence(guard).await;
        }))
    }

    // `guard` returns the session to Idle when this returns, whatever the
    // outcome.
    async fn run_sequence(&self, guard: SessionGuard) {
        for n in (1..=self.countdown.ticks).rev() {
            emit(&self.events, BoothEvent::CountdownTick(n));
            tokio::time::sleep(self.countdown.tick).await;
        }
        emit(&self.events, BoothEvent::Shutter);
        tokio::time::sleep(self.countdown.shutter_hold).await;

        guard.advance(SessionState::Capturing);
        match self.capture_still().await {
            Ok(photo) => {
                info!("Photo saved: {}", photo.path.display());
                emit(&self.events, BoothEvent::PhotoSaved(photo.path.clone()));
                self.session.set_last_photo(photo);
            },
            Err(e) => {
                warn!("{}", e);
                emit(&self.events, BoothEvent::CaptureFailed(e.to_string()));
            }
        }
    }

    // Persists a still to a fresh PhotoAsset path.
    async fn capture_still(&self) -> Result<LastPhoto> {
        tokio::fs::create_dir_all(&self.photo_dir).await?;
        let captured_at: DateTime<Local> = Local::now();
        let path = unused_photo_path(&self.photo_dir, &captured_at.naive_local());
        let mut camera = self.camera.lock().await;
        camera.capture_still(&path).await.map_err(BoothError::capture_failed)?;
        if !path.exists() {
            return Err(BoothError::CaptureFailed(
                format!("camera reported success but {} is missing", path.display())));
        }
        Ok(LastPhoto{path, captured_at})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap().and_hms_opt(14, 30, 0).unwrap()
    }

    #[test]
    fn test_photo_file_name() {
        assert_eq!(photo_file_name(&timestamp()), "photo_2025-06-15_14-30-00.jpg");
    }

    #[test]
    fn test_unused_photo_path_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let first = unused_photo_path(dir.path(), &timestamp());
        assert_eq!(first, dir.path().join("photo_2025-06-15_14-30-00.jpg"));
        std::fs::write(&first, b"jpeg").unwrap();

        let second = unused_photo_path(dir.path(), &timestamp());
        assert_eq!(second, dir.path().join("photo_2025-06-15_14-30-00_1.jpg"));
        std::fs::write(&second, b"jpeg").unwrap();

        let third = unused_photo_path(dir.path(), &timestamp());
        assert_eq!(third, dir.path().join("photo_2025-06-15_14-30-00_2.jpg"));
    }
}
