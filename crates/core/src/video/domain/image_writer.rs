use std::path::Path;

use crate::shared::frame::Frame;

/// Persists frames and already-encoded images.
pub trait ImageWriter: Send {
    /// Encodes `frame` in the format implied by the path's extension.
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Writes bytes that are already an image file (for example a JPEG crop).
    fn write_encoded(&self, path: &Path, bytes: &[u8]) -> Result<(), Box<dyn std::error::Error>>;
}
