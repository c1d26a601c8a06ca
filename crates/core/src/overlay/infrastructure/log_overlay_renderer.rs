use crate::detection::domain::face_observation::FaceObservation;
use crate::overlay::domain::overlay_renderer::OverlayRenderer;
use crate::shared::frame::Frame;

/// Headless overlay: reports what would be drawn through the `log` facade.
#[derive(Default)]
pub struct LogOverlayRenderer {
    frame_index: usize,
    boxes: usize,
    landmark_points: usize,
    presented: usize,
}

impl LogOverlayRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn presented(&self) -> usize {
        self.presented
    }
}

impl OverlayRenderer for LogOverlayRenderer {
    fn begin_frame(&mut self, frame: &Frame) {
        self.frame_index = frame.index();
        self.boxes = 0;
        self.landmark_points = 0;
    }

    fn draw_face_bounding_box(&mut self, face: &FaceObservation) {
        let b = &face.bounding_box;
        log::trace!(
            "box ({:.3}, {:.3}, {:.3}, {:.3}) conf {:.2}",
            b.x,
            b.y,
            b.width,
            b.height,
            face.confidence
        );
        self.boxes += 1;
    }

    fn draw_face_with_landmarks(&mut self, face: &FaceObservation) {
        self.draw_face_bounding_box(face);
        if let Some(landmarks) = &face.landmarks {
            for (group, (x, y)) in landmarks.visible() {
                log::trace!("  {} ({x:.3}, {y:.3})", group.name());
                self.landmark_points += 1;
            }
        }
    }

    fn present(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        log::debug!(
            "Overlay frame {}: {} faces, {} landmark points",
            self.frame_index,
            self.boxes,
            self.landmark_points
        );
        self.presented += 1;
        Ok(())
    }
}
