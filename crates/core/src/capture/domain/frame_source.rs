use thiserror::Error;

use crate::capture::session_preset::SessionPreset;
use crate::shared::frame::Frame;
use crate::shared::orientation::DeviceOrientation;

#[derive(Error, Debug)]
pub enum FrameSourceError {
    #[error("camera access denied: {0}")]
    NotAuthorized(String),
    #[error("capture device could not be configured: {0}")]
    Configuration(String),
    #[error("media services were reset: {0}")]
    Reset(String),
    #[error("capture interrupted: {0}")]
    Interrupted(String),
    #[error("capture failed: {0}")]
    Runtime(String),
}

/// Stream properties reported once a source is open.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub name: String,
}

/// A frame as delivered by the capture layer, stamped with the device
/// orientation observed at delivery time.
#[derive(Clone, Debug)]
pub struct CapturedFrame {
    pub frame: Frame,
    pub orientation: DeviceOrientation,
}

/// Best-effort supplier of live video frames.
///
/// `next_frame` blocks until a frame is available and returns `Ok(None)` at
/// end of stream. Implementations are driven from a single delivery thread.
pub trait FrameSource: Send {
    fn open(&mut self) -> Result<SourceInfo, FrameSourceError>;

    fn next_frame(&mut self) -> Result<Option<Frame>, FrameSourceError>;

    fn close(&mut self);

    /// Whether the source can deliver the given capture preset.
    fn supports_preset(&self, _preset: SessionPreset) -> bool {
        true
    }
}
