//! Host integration seams.
//!
//! The engine never talks to a window system, a screen grabber or an audio
//! session directly. The host process hands it implementations of these
//! traits and the engine stays portable (and trivially testable).

use async_trait::async_trait;
use thiserror::Error;

use crate::catalog::Frame;

/// Failure reported by a presentation backend.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct PresentationError {
    message: String,
}

impl PresentationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Receives each frame the engine decides to show.
///
/// Called from the engine's own task, once per frame advance. Implementations
/// should return quickly; a slow sink stretches every frame it presents.
pub trait PresentationSink: Send {
    fn present(&mut self, frame: &Frame) -> Result<(), PresentationError>;
}

/// Fire-and-forget screenshot trigger.
///
/// The engine calls this at the moment the screenshot pose becomes visible
/// (or immediately, when the catalog has no pose clip). Capture failures are
/// the host's problem to report.
pub trait ScreenshotCapture: Send {
    fn capture(&mut self);
}

/// Default capture hook until the host installs a real one.
pub struct NoopCapture;

impl ScreenshotCapture for NoopCapture {
    fn capture(&mut self) {}
}

/// Asks the platform which application, if any, is playing audio.
///
/// Answering may block on an out-of-process query, so the probe is async and
/// runs on its own polling task rather than the engine loop.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn playing_app(&self) -> anyhow::Result<Option<String>>;
}
