use std::fs;
use std::path::Path;

use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

/// Writes image files with the `image` crate, creating parent directories.
#[derive(Default)]
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        ensure_parent(path)?;
        frame.image().save(path)?;
        Ok(())
    }

    fn write_encoded(&self, path: &Path, bytes: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
        ensure_parent(path)?;
        fs::write(path, bytes)?;
        Ok(())
    }
}
