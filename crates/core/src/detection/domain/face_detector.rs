use crate::detection::domain::detection_request::DetectionRequest;
use crate::detection::domain::face_observation::FaceObservation;
use crate::shared::frame::Frame;

/// Domain interface for face inference.
///
/// `frame` is already upright. Observations are normalized to its
/// dimensions with the origin at the lower-left corner. Implementations may
/// keep state across frames, hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(
        &mut self,
        frame: &Frame,
        request: DetectionRequest,
    ) -> Result<Vec<FaceObservation>, Box<dyn std::error::Error>>;
}
