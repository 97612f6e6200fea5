use std::path::PathBuf;

use canonical_error::CanonicalError;
use thiserror::Error;

/// Failures of the capture/print workflow. None of these is fatal: each is
/// absorbed where it happens, reported to the user, and the session goes back
/// to Idle.
#[derive(Debug, Error)]
pub enum BoothError {
    /// The camera could not deliver a frame. Retried on the next tick.
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),

    /// The still could not be persisted. LastPhoto is left unchanged.
    #[error("capture failed: {0}")]
    CaptureFailed(String),

    /// The photo to compose is missing or unreadable; nothing gets printed.
    #[error("source photo {path} unavailable: {reason}")]
    SourceUnavailable { path: PathBuf, reason: String },

    /// The print layout could not be produced or written.
    #[error("compose failed: {0}")]
    ComposeFailed(String),

    /// The printer command failed. LastPhoto is kept so printing can be retried.
    #[error("printer dispatch failed: {0}")]
    PrinterDispatchFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BoothError {
    pub fn camera_unavailable(e: CanonicalError) -> Self {
        BoothError::CameraUnavailable(e.to_string())
    }

    pub fn capture_failed(e: CanonicalError) -> Self {
        BoothError::CaptureFailed(e.to_string())
    }

    pub fn printer_dispatch_failed(e: CanonicalError) -> Self {
        BoothError::PrinterDispatchFailed(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BoothError>;
