use std::path::PathBuf;

use image::{Rgb, RgbImage};

use crate::detection::domain::face_observation::FaceObservation;
use crate::overlay::domain::overlay_renderer::OverlayRenderer;
use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

const BOX_COLOR: Rgb<u8> = Rgb([255, 204, 0]);
const LANDMARK_COLOR: Rgb<u8> = Rgb([0, 255, 128]);
const LANDMARK_RADIUS: i64 = 2;

/// Draws the overlay onto a copy of the preview frame and saves every
/// `interval`-th rendered frame as `overlay_<index>.png`.
///
/// Frames are counted as they reach the renderer, so frames dropped before
/// rendering do not shift the snapshot cadence.
pub struct SnapshotOverlayRenderer {
    writer: Box<dyn ImageWriter>,
    dir: PathBuf,
    interval: usize,
    rendered: usize,
    canvas: Option<Frame>,
}

impl SnapshotOverlayRenderer {
    pub fn new(writer: Box<dyn ImageWriter>, dir: impl Into<PathBuf>, interval: usize) -> Self {
        Self {
            writer,
            dir: dir.into(),
            interval: interval.max(1),
            rendered: 0,
            canvas: None,
        }
    }

    fn draw_box(canvas: &mut RgbImage, face: &FaceObservation) {
        let (w, h) = canvas.dimensions();
        let Some(b) = face.bounding_box.to_pixel_rect(w, h).clamped(w, h) else {
            return;
        };
        let right = b.x + b.width - 1;
        let bottom = b.y + b.height - 1;
        for x in b.x..=right {
            canvas.put_pixel(x, b.y, BOX_COLOR);
            canvas.put_pixel(x, bottom, BOX_COLOR);
        }
        for y in b.y..=bottom {
            canvas.put_pixel(b.x, y, BOX_COLOR);
            canvas.put_pixel(right, y, BOX_COLOR);
        }
    }

    fn draw_dot(canvas: &mut RgbImage, cx: f64, cy: f64) {
        let (w, h) = canvas.dimensions();
        let (cx, cy) = (cx.round() as i64, cy.round() as i64);
        for y in cy - LANDMARK_RADIUS..=cy + LANDMARK_RADIUS {
            for x in cx - LANDMARK_RADIUS..=cx + LANDMARK_RADIUS {
                if x >= 0 && y >= 0 && (x as u32) < w && (y as u32) < h {
                    canvas.put_pixel(x as u32, y as u32, LANDMARK_COLOR);
                }
            }
        }
    }
}

impl OverlayRenderer for SnapshotOverlayRenderer {
    fn begin_frame(&mut self, frame: &Frame) {
        let due = self.rendered % self.interval == 0;
        self.rendered += 1;
        self.canvas = due.then(|| frame.clone());
    }

    fn draw_face_bounding_box(&mut self, face: &FaceObservation) {
        if let Some(canvas) = self.canvas.as_mut() {
            Self::draw_box(canvas.image_mut(), face);
        }
    }

    fn draw_face_with_landmarks(&mut self, face: &FaceObservation) {
        let Some(canvas) = self.canvas.as_mut() else {
            return;
        };
        let image = canvas.image_mut();
        Self::draw_box(image, face);
        if let Some(landmarks) = &face.landmarks {
            let (w, h) = image.dimensions();
            for (_, (x, y)) in landmarks.to_pixels(w, h) {
                Self::draw_dot(image, x, y);
            }
        }
    }

    fn present(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let Some(canvas) = self.canvas.take() else {
            return Ok(());
        };
        let path = self.dir.join(format!("overlay_{:06}.png", canvas.index()));
        self.writer.write(&path, &canvas)?;
        log::debug!("Wrote {}", path.display());
        Ok(())
    }
}
