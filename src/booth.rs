use std::sync::Arc;

use log::info;
use tokio::sync::mpsc;

use crate::abstract_camera::AbstractCamera;
use crate::capture_session::{CaptureSession, SharedCamera, share_camera};
use crate::config::BoothConfig;
use crate::controller::InteractionController;
use crate::error::{BoothError, Result};
use crate::frame_composer::{FrameComposer, FrameLayout};
use crate::preview::PreviewLoop;
use crate::printer::PrinterSink;
use crate::session::{EventReceiver, SessionHandle};

/// A fully wired booth: one camera, one session, one controller.
pub struct Photobooth {
    pub controller: InteractionController,
    pub capture: Arc<CaptureSession>,
    pub camera: SharedCamera,
    pub session: SessionHandle,
    config: BoothConfig,
}

impl Photobooth {
    /// Configures and starts `camera`, creates the photo directory, and
    /// builds the components. Returns the booth and the receiving end of its
    /// event channel, to be drained by the rendering loop.
    pub async fn new(mut config: BoothConfig,
                     mut camera: Box<dyn AbstractCamera + Send>,
                     printer: Arc<dyn PrinterSink>)
                     -> Result<(Photobooth, EventReceiver)> {
        std::fs::create_dir_all(&config.photo_dir)?;
        // Photo and print paths are handed to the printer driver, which may
        // run from its own working directory.
        config.photo_dir = config.photo_dir.canonicalize()?;
        let granted = camera.configure(config.resolution)
            .map_err(BoothError::camera_unavailable)?;
        camera.start().await.map_err(BoothError::camera_unavailable)?;
        info!("Camera {} running at {}", camera.model(), granted);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let session = SessionHandle::new();
        let camera = share_camera(camera);
        let capture = Arc::new(CaptureSession::new(camera.clone(),
                                                   session.clone(),
                                                   config.photo_dir.clone(),
                                                   config.countdown.clone(),
                                                   events_tx.clone()));
        let composer = Arc::new(FrameComposer::new(FrameLayout::default(), &config.captions));
        let controller = InteractionController::new(session.clone(),
                                                    capture.clone(),
                                                    composer,
                                                    printer,
                                                    config.printer.device_id.clone(),
                                                    events_tx);
        Ok((Photobooth{controller, capture, camera, session, config}, events_rx))
    }

    pub fn preview_loop(&self) -> PreviewLoop {
        PreviewLoop::new(self.camera.clone(), self.session.clone(),
                         self.config.preview.region, self.config.preview.interval)
    }

    /// Waits for any running sequence to finish, then stops the camera.
    pub async fn shutdown(&self) {
        self.session.wait_idle().await;
        self.camera.lock().await.stop().await;
        info!("Booth stopped");
    }
}
