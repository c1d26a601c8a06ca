use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::shared::geometry::NormalizedRect;

/// One face found in one frame.
///
/// `bounding_box` is normalized to the upright frame the detector saw, with
/// the origin at the lower-left corner. `landmarks` is only populated by
/// landmark requests.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceObservation {
    pub bounding_box: NormalizedRect,
    pub confidence: f64,
    pub landmarks: Option<FaceLandmarks>,
}

impl FaceObservation {
    pub fn new(bounding_box: NormalizedRect, confidence: f64) -> Self {
        Self {
            bounding_box,
            confidence,
            landmarks: None,
        }
    }

    pub fn with_landmarks(mut self, landmarks: FaceLandmarks) -> Self {
        self.landmarks = Some(landmarks);
        self
    }
}
