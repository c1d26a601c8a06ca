use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// User-selectable inference mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMode {
    /// Bounding boxes only.
    #[default]
    Rectangles,
    /// Bounding boxes plus facial landmarks.
    Landmarks,
}

impl DetectionMode {
    pub const ALL: &[DetectionMode] = &[DetectionMode::Rectangles, DetectionMode::Landmarks];
}

impl fmt::Display for DetectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionMode::Rectangles => write!(f, "rectangles"),
            DetectionMode::Landmarks => write!(f, "landmarks"),
        }
    }
}

impl FromStr for DetectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rectangles" => Ok(DetectionMode::Rectangles),
            "landmarks" => Ok(DetectionMode::Landmarks),
            other => Err(format!(
                "Detection mode must be 'rectangles' or 'landmarks', got '{other}'"
            )),
        }
    }
}

/// A single inference request dispatched to the detector each frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectionRequest {
    FaceRectangles,
    FaceLandmarks,
}

impl DetectionRequest {
    pub fn for_mode(mode: DetectionMode) -> Self {
        match mode {
            DetectionMode::Rectangles => DetectionRequest::FaceRectangles,
            DetectionMode::Landmarks => DetectionRequest::FaceLandmarks,
        }
    }

    pub fn wants_landmarks(self) -> bool {
        self == DetectionRequest::FaceLandmarks
    }
}

/// The active request list performed on every frame.
///
/// Switching modes replaces the whole list, so it always holds exactly one
/// request of the selected kind.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionRequests {
    mode: DetectionMode,
    requests: Vec<DetectionRequest>,
}

impl DetectionRequests {
    pub fn new(mode: DetectionMode) -> Self {
        let mut requests = Self {
            mode,
            requests: Vec::with_capacity(1),
        };
        requests.set_mode(mode);
        requests
    }

    pub fn set_mode(&mut self, mode: DetectionMode) {
        self.mode = mode;
        self.requests.clear();
        self.requests.push(DetectionRequest::for_mode(mode));
    }

    pub fn mode(&self) -> DetectionMode {
        self.mode
    }

    pub fn as_slice(&self) -> &[DetectionRequest] {
        &self.requests
    }
}

impl Default for DetectionRequests {
    fn default() -> Self {
        Self::new(DetectionMode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_is_single_rectangles_request() {
        let requests = DetectionRequests::default();
        assert_eq!(requests.mode(), DetectionMode::Rectangles);
        assert_eq!(requests.as_slice(), &[DetectionRequest::FaceRectangles]);
    }

    #[rstest]
    #[case(DetectionMode::Rectangles, DetectionMode::Landmarks, DetectionRequest::FaceLandmarks)]
    #[case(DetectionMode::Landmarks, DetectionMode::Rectangles, DetectionRequest::FaceRectangles)]
    #[case(DetectionMode::Landmarks, DetectionMode::Landmarks, DetectionRequest::FaceLandmarks)]
    fn test_set_mode_replaces_list_with_one_request(
        #[case] from: DetectionMode,
        #[case] to: DetectionMode,
        #[case] expected: DetectionRequest,
    ) {
        let mut requests = DetectionRequests::new(from);
        requests.set_mode(to);
        assert_eq!(requests.mode(), to);
        assert_eq!(requests.as_slice(), &[expected]);
    }

    #[test]
    fn test_repeated_toggles_never_accumulate() {
        let mut requests = DetectionRequests::default();
        for mode in DetectionMode::ALL.iter().cycle().take(7) {
            requests.set_mode(*mode);
            assert_eq!(requests.as_slice().len(), 1);
        }
    }

    #[test]
    fn test_wants_landmarks() {
        assert!(DetectionRequest::FaceLandmarks.wants_landmarks());
        assert!(!DetectionRequest::FaceRectangles.wants_landmarks());
    }

    #[test]
    fn test_mode_parse_and_display() {
        for mode in DetectionMode::ALL {
            assert_eq!(mode.to_string().parse::<DetectionMode>(), Ok(*mode));
        }
        assert!("mesh".parse::<DetectionMode>().is_err());
    }
}
