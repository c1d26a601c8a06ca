use image::{imageops, RgbImage};
use ndarray::ArrayView3;

/// A single captured frame: tightly packed RGB bytes in row-major order.
///
/// Pixel transforms (rotation, flips, crops) go through the `image` crate;
/// the rest of the pipeline treats the pixels as opaque.
#[derive(Clone, Debug)]
pub struct Frame {
    image: RgbImage,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        let image = RgbImage::from_raw(width, height, data)
            .expect("data length must equal width * height * 3");
        Self { image, index }
    }

    pub fn from_image(image: RgbImage, index: usize) -> Self {
        Self { image, index }
    }

    pub fn data(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        let shape = (self.height() as usize, self.width() as usize, 3);
        ArrayView3::from_shape(shape, self.image.as_raw())
            .expect("Frame data length must match dimensions")
    }

    /// Copies out the `width`×`height` region at (`x`, `y`).
    ///
    /// The caller must keep the rectangle inside the frame.
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Frame {
        debug_assert!(x + width <= self.width() && y + height <= self.height());
        let cropped = imageops::crop_imm(&self.image, x, y, width, height).to_image();
        Frame::from_image(cropped, self.index)
    }
}
