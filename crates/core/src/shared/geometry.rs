//! Rectangles in the three coordinate spaces a face crop passes through:
//! normalized (lower-left origin), pixel (upper-left origin, fractional),
//! and integral bounds clamped to an image.

/// Rectangle in fractions of image width/height, origin at the lower-left.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a normalized rect from pixel corners given in upper-left origin.
    pub fn from_pixel_corners(
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        image_width: u32,
        image_height: u32,
    ) -> Self {
        let w = image_width as f64;
        let h = image_height as f64;
        Self {
            x: x1 / w,
            y: 1.0 - y2 / h,
            width: (x2 - x1) / w,
            height: (y2 - y1) / h,
        }
    }

    /// Scales into pixel space of an `image_width`×`image_height` image and
    /// flips the vertical axis to an upper-left origin.
    pub fn to_pixel_rect(&self, image_width: u32, image_height: u32) -> PixelRect {
        let w = image_width as f64;
        let h = image_height as f64;
        PixelRect {
            x: self.x * w,
            y: h - (self.y + self.height) * h,
            width: self.width * w,
            height: self.height * h,
        }
    }
}

/// Fixed padding added around a mapped face rectangle.
///
/// `left`/`top` move the origin; `extra_width`/`extra_height` grow the size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CropMargin {
    pub left: f64,
    pub top: f64,
    pub extra_width: f64,
    pub extra_height: f64,
}

/// Rectangle in pixels, origin at the upper-left. May lie partly outside
/// the image it refers to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    pub fn expanded(&self, margin: &CropMargin) -> PixelRect {
        PixelRect {
            x: self.x - margin.left,
            y: self.y - margin.top,
            width: self.width + margin.extra_width,
            height: self.height + margin.extra_height,
        }
    }

    /// Smallest integral rectangle covering `self`, intersected with
    /// `[0, image_width] × [0, image_height]`.
    ///
    /// Returns `None` when the intersection has no area.
    pub fn clamped(&self, image_width: u32, image_height: u32) -> Option<PixelBounds> {
        if !(self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite())
        {
            return None;
        }

        let x1 = self.x.floor().max(0.0);
        let y1 = self.y.floor().max(0.0);
        let x2 = (self.x + self.width).ceil().min(image_width as f64);
        let y2 = (self.y + self.height).ceil().min(image_height as f64);

        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        Some(PixelBounds {
            x: x1 as u32,
            y: y1 as u32,
            width: (x2 - x1) as u32,
            height: (y2 - y1) as u32,
        })
    }
}

/// Integral pixel rectangle guaranteed to fit the image it was clamped to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelBounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}
