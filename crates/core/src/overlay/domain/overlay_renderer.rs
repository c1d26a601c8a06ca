use crate::detection::domain::face_observation::FaceObservation;
use crate::shared::frame::Frame;

/// Preview surface that draws detections on top of the current frame.
///
/// Each frame starts with [`begin_frame`](OverlayRenderer::begin_frame),
/// which clears whatever was drawn before, and ends with
/// [`present`](OverlayRenderer::present).
pub trait OverlayRenderer: Send {
    fn begin_frame(&mut self, frame: &Frame);

    fn draw_face_bounding_box(&mut self, face: &FaceObservation);

    /// Draws the bounding box plus every visible landmark.
    fn draw_face_with_landmarks(&mut self, face: &FaceObservation);

    fn present(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
