//! Session state shared by the capture, print and preview paths.
//!
//! The booth has one mutual-exclusion token: the session is either Idle or
//! busy with exactly one capture or print sequence. [`SessionHandle::try_begin`]
//! takes the token with an atomic Idle -> X check-and-set and hands back a
//! [`SessionGuard`]; dropping the guard returns the session to Idle, so a
//! failing or panicking sequence can never lock the booth out.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local};
use log::debug;
use tokio::sync::{mpsc, watch};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Preview running, ready for a trigger.
    Idle,
    /// Countdown in progress.
    CountingDown,
    /// Still capture in progress. Preview acquisition pauses.
    Capturing,
    /// Composing and dispatching a print.
    Printing,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            SessionState::Idle => "Idle",
            SessionState::CountingDown => "CountingDown",
            SessionState::Capturing => "Capturing",
            SessionState::Printing => "Printing",
        };
        write!(f, "{}", state_str)
    }
}

/// The most recent successful capture.
#[derive(Clone, Debug, PartialEq)]
pub struct LastPhoto {
    pub path: PathBuf,
    pub captured_at: DateTime<Local>,
}

/// User-visible progress, sent from background sequences to the rendering
/// loop.
#[derive(Clone, Debug, PartialEq)]
pub enum BoothEvent {
    /// Countdown overlay value, from `ticks` down to 1.
    CountdownTick(u32),
    /// Shutter cue (beep/flash).
    Shutter,
    PhotoSaved(PathBuf),
    CaptureFailed(String),
    /// A print was requested but there is no usable photo.
    NothingToPrint,
    PrintStarted(PathBuf),
    /// The artifact was handed to the printer; `ok` reflects its exit status.
    PrintFinished { artifact: PathBuf, ok: bool },
}

pub type EventSender = mpsc::UnboundedSender<BoothEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<BoothEvent>;

// Nobody listening is fine: events are advisory.
pub(crate) fn emit(events: &EventSender, event: BoothEvent) {
    let _ = events.send(event);
}

#[derive(Clone)]
pub struct SessionHandle {
    state: Arc<watch::Sender<SessionState>>,
    last_photo: Arc<Mutex<Option<LastPhoto>>>,
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHandle {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        SessionHandle{state: Arc::new(state),
                      last_photo: Arc::new(Mutex::new(None))}
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn is_idle(&self) -> bool {
        self.state() == SessionState::Idle
    }

    /// Receives every state transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Resolves once the session is Idle.
    pub async fn wait_idle(&self) {
        let mut rx = self.subscribe();
        // Only fails if the sender is gone, and we hold it.
        let _ = rx.wait_for(|s| *s == SessionState::Idle).await;
    }

    /// Takes the session token if Idle, moving to `next`. Returns None (and
    /// changes nothing) if another sequence holds it.
    pub fn try_begin(&self, next: SessionState) -> Option<SessionGuard> {
        debug_assert!(next != SessionState::Idle);
        let taken = self.state.send_if_modified(|state| {
            if *state == SessionState::Idle {
                *state = next;
                true
            } else {
                false
            }
        });
        if !taken {
            debug!("Session busy ({}), not entering {}", self.state(), next);
            return None;
        }
        debug!("Session Idle -> {}", next);
        Some(SessionGuard{session: self.clone()})
    }

    pub fn last_photo(&self) -> Option<LastPhoto> {
        self.last_photo.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    // Only the capture path records photos.
    pub(crate) fn set_last_photo(&self, photo: LastPhoto) {
        // Whole-value writes only, so a poisoned lock is still consistent.
        *self.last_photo.lock().unwrap_or_else(|e| e.into_inner()) = Some(photo);
    }
}

/// Proof of holding the session token. Releases it (back to Idle) on drop.
pub struct SessionGuard {
    session: SessionHandle,
}

impl SessionGuard {
    /// Moves between busy sub-states, e.g. CountingDown -> Capturing.
    pub fn advance(&self, next: SessionState) {
        debug_assert!(next != SessionState::Idle);
        let prev = self.session.state.send_replace(next);
        debug!("Session {} -> {}", prev, next);
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let prev = self.session.state.send_replace(SessionState::Idle);
        debug!("Session {} -> Idle", prev);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_is_exclusive() {
        let session = SessionHandle::new();
        let guard = session.try_begin(SessionState::CountingDown).unwrap();
        assert_eq!(session.state(), SessionState::CountingDown);
        assert!(session.try_begin(SessionState::Printing).is_none());
        assert!(session.try_begin(SessionState::CountingDown).is_none());
        // The failed attempts left the state alone.
        assert_eq!(session.state(), SessionState::CountingDown);

        guard.advance(SessionState::Capturing);
        assert_eq!(guard.state(), SessionState::Capturing);
        drop(guard);
        assert!(session.is_idle());
        assert!(session.try_begin(SessionState::Printing).is_some());
        assert!(session.is_idle());
    }

    #[test]
    fn test_guard_released_on_panic() {
        let session = SessionHandle::new();
        let cloned = session.clone();
        let result = std::thread::spawn(move || {
            let _guard = cloned.try_begin(SessionState::Capturing).unwrap();
            panic!("capture blew up");
        }).join();
        assert!(result.is_err());
        assert!(session.is_idle());
    }

    #[test]
    fn test_last_photo() {
        let session = SessionHandle::new();
        assert!(session.last_photo().is_none());
        let photo = LastPhoto{path: PathBuf::from("photos/photo_a.jpg"),
                              captured_at: Local::now()};
        session.set_last_photo(photo.clone());
        assert_eq!(session.last_photo(), Some(photo));
    }

    #[test]
    fn test_last_photo_survives_poisoned_lock() {
        let session = SessionHandle::new();
        let photo = LastPhoto{path: PathBuf::from("photos/photo_a.jpg"),
                              captured_at: Local::now()};
        session.set_last_photo(photo.clone());
        let cloned = session.clone();
        let _ = std::thread::spawn(move || {
            let _held = cloned.last_photo.lock().unwrap();
            panic!("panicked while holding LastPhoto");
        }).join();
        assert!(session.last_photo.is_poisoned());
        assert_eq!(session.last_photo(), Some(photo.clone()));
        let newer = LastPhoto{path: PathBuf::from("photos/photo_b.jpg"), ..photo};
        session.set_last_photo(newer.clone());
        assert_eq!(session.last_photo(), Some(newer));
    }

    #[tokio::test]
    async fn test_wait_idle() {
        let session = SessionHandle::new();
        let guard = session.try_begin(SessionState::Printing).unwrap();
        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.wait_idle().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        drop(guard);
        waiter.await.unwrap();
    }

    #[test]
    fn test_display() {
        assert_eq!(SessionState::CountingDown.to_string(), "CountingDown");
    }
}
