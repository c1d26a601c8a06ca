use image::codecs::jpeg::JpegEncoder;
use thiserror::Error;

use crate::shared::constants::{CROP_JPEG_QUALITY, CROP_MARGIN};
use crate::shared::frame::Frame;
use crate::shared::geometry::{CropMargin, NormalizedRect, PixelBounds};
use crate::shared::orientation::ExifOrientation;

#[derive(Error, Debug)]
pub enum CropError {
    #[error("failed to encode crop: {0}")]
    Encode(#[from] image::ImageError),
}

/// A JPEG-encoded face crop ready for submission.
#[derive(Clone, Debug)]
pub struct EncodedCrop {
    pub jpeg: Vec<u8>,
    /// Crop rectangle within the upright source frame.
    pub bounds: PixelBounds,
    pub frame_index: usize,
}

/// Cuts a padded face region out of a raw sensor frame.
///
/// The raw frame is first turned upright with the EXIF orientation it was
/// detected under, so the face box (normalized, lower-left origin, relative
/// to the upright image) lands on the pixels the detector saw. For the back
/// camera held in portrait that is a 90° clockwise rotation.
pub struct FaceCropper {
    margin: CropMargin,
    jpeg_quality: u8,
}

impl FaceCropper {
    pub fn new(margin: CropMargin, jpeg_quality: u8) -> Self {
        Self {
            margin,
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    /// Returns the cropped image, or `None` when the padded box misses the
    /// frame entirely.
    pub fn crop(
        &self,
        frame: &Frame,
        orientation: ExifOrientation,
        face: &NormalizedRect,
    ) -> Option<(Frame, PixelBounds)> {
        let upright = orientation.apply(frame);
        let bounds = face
            .to_pixel_rect(upright.width(), upright.height())
            .expanded(&self.margin)
            .clamped(upright.width(), upright.height())?;
        let crop = upright.crop(bounds.x, bounds.y, bounds.width, bounds.height);
        Some((crop, bounds))
    }

    pub fn encode(&self, crop: &Frame) -> Result<Vec<u8>, CropError> {
        let mut jpeg = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, self.jpeg_quality);
        encoder.encode_image(crop.image())?;
        Ok(jpeg)
    }

    pub fn extract(
        &self,
        frame: &Frame,
        orientation: ExifOrientation,
        face: &NormalizedRect,
    ) -> Result<Option<EncodedCrop>, CropError> {
        let Some((crop, bounds)) = self.crop(frame, orientation, face) else {
            return Ok(None);
        };
        let jpeg = self.encode(&crop)?;
        Ok(Some(EncodedCrop {
            jpeg,
            bounds,
            frame_index: frame.index(),
        }))
    }
}

impl Default for FaceCropper {
    fn default() -> Self {
        Self::new(CROP_MARGIN, CROP_JPEG_QUALITY)
    }
}
