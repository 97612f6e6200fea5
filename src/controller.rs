//! Trigger handling.
//!
//! Capture and print requests may come from the on-screen controls or from
//! physical buttons; both are routed here and treated identically. A trigger
//! is only acted on when the session is Idle. Busy triggers are dropped, never
//! queued, so a double press cannot stack captures or prints.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use log::{info, warn};

use crate::capture_session::CaptureSession;
use crate::error::BoothError;
use crate::frame_composer::FrameComposer;
use crate::printer::PrinterSink;
use crate::session::{BoothEvent, EventSender, SessionGuard, SessionHandle, SessionState,
                     emit};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TriggerSource {
    /// On-screen control or keyboard.
    Screen,
    /// Discrete hardware input.
    Button,
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerSource::Screen => write!(f, "screen"),
            TriggerSource::Button => write!(f, "button"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Trigger {
    Capture(TriggerSource),
    Print(TriggerSource),
}

impl Trigger {
    /// Maps an input word ("c"/"capture"/" ", "p"/"print") to a trigger.
    pub fn from_command(command: &str, source: TriggerSource) -> Option<Trigger> {
        let command = command.trim_matches(['\r', '\n']);
        if command == " " {
            return Some(Trigger::Capture(source));
        }
        match command.trim().to_ascii_lowercase().as_str() {
            "c" | "capture" => Some(Trigger::Capture(source)),
            "p" | "print" => Some(Trigger::Print(source)),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A capture or print sequence is now running.
    Started,
    /// Another sequence holds the session; the trigger was ignored.
    Busy,
    /// Print requested before any successful capture.
    NothingToPrint,
}

pub struct InteractionController {
    session: SessionHandle,
    capture: Arc<CaptureSession>,
    composer: Arc<FrameComposer>,
    printer: Arc<dyn PrinterSink>,
    device_id: String,
    events: EventSender,
}

impl InteractionController {
    pub fn new(session: SessionHandle,
               capture: Arc<CaptureSession>,
               composer: Arc<FrameComposer>,
               printer: Arc<dyn PrinterSink>,
               device_id: String,
               events: EventSender) -> Self {
        InteractionController{session, capture, composer, printer, device_id, events}
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn handle(&self, trigger: Trigger) -> TriggerOutcome {
        match trigger {
            Trigger::Capture(source) => self.on_capture_trigger(source),
            Trigger::Print(source) => self.on_print_trigger(source),
        }
    }

    pub fn on_capture_trigger(&self, source: TriggerSource) -> TriggerOutcome {
        match self.capture.request_capture() {
            Some(_) => {
                info!("Capture triggered from {}", source);
                TriggerOutcome::Started
            },
            None => {
                info!("Capture trigger from {} ignored: {}", source, self.session.state());
                TriggerOutcome::Busy
            }
        }
    }

    pub fn on_print_trigger(&self, source: TriggerSource) -> TriggerOutcome {
        if !self.session.is_idle() {
            info!("Print trigger from {} ignored: {}", source, self.session.state());
            return TriggerOutcome::Busy;
        }
        if self.session.last_photo().is_none() {
            info!("Print trigger from {}: nothing to print", source);
            emit(&self.events, BoothEvent::NothingToPrint);
            return TriggerOutcome::NothingToPrint;
        }
        let Some(guard) = self.session.try_begin(SessionState::Printing) else {
            info!("Print trigger from {} lost the race: {}", source, self.session.state());
            return TriggerOutcome::Busy;
        };
        // Read under the token: no capture can replace it now. LastPhoto is
        // never cleared once set.
        let Some(photo) = self.session.last_photo() else {
            return TriggerOutcome::NothingToPrint;
        };
        info!("Print triggered from {} for {}", source, photo.path.display());
        self.spawn_print(guard, photo.path);
        TriggerOutcome::Started
    }

    fn spawn_print(&self, guard: SessionGuard, photo_path: PathBuf) {
        let composer = Arc::clone(&self.composer);
        let printer = Arc::clone(&self.printer);
        let device_id = self.device_id.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            // Back to Idle whatever happens below.
            let _guard = guard;
            let composed = tokio::task::spawn_blocking(move || composer.compose(&photo_path))
                .await;
            let artifact = match composed {
                Ok(Ok(artifact)) => artifact,
                Ok(Err(e)) => {
                    warn!("Not printing: {}", e);
                    emit(&events, BoothEvent::NothingToPrint);
                    return;
                },
                Err(e) => {
                    warn!("Compose task failed: {}", e);
                    emit(&events, BoothEvent::NothingToPrint);
                    return;
                }
            };
            emit(&events, BoothEvent::PrintStarted(artifact.clone()));
            let ok = match printer.print(&artifact, &device_id).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("{}", BoothError::printer_dispatch_failed(e));
                    false
                }
            };
            emit(&events, BoothEvent::PrintFinished{artifact, ok});
        });
    }
}
