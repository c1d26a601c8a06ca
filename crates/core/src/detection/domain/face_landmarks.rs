//! 5-point face landmarks in normalized, lower-left-origin coordinates.

const LEFT_EYE: usize = 0;
const RIGHT_EYE: usize = 1;
const NOSE: usize = 2;
const LEFT_MOUTH: usize = 3;
const RIGHT_MOUTH: usize = 4;

/// Named landmark group, one per facial feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LandmarkGroup {
    LeftEye,
    RightEye,
    Nose,
    LeftMouth,
    RightMouth,
}

impl LandmarkGroup {
    pub const ALL: [LandmarkGroup; 5] = [
        LandmarkGroup::LeftEye,
        LandmarkGroup::RightEye,
        LandmarkGroup::Nose,
        LandmarkGroup::LeftMouth,
        LandmarkGroup::RightMouth,
    ];

    fn slot(self) -> usize {
        match self {
            LandmarkGroup::LeftEye => LEFT_EYE,
            LandmarkGroup::RightEye => RIGHT_EYE,
            LandmarkGroup::Nose => NOSE,
            LandmarkGroup::LeftMouth => LEFT_MOUTH,
            LandmarkGroup::RightMouth => RIGHT_MOUTH,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LandmarkGroup::LeftEye => "left_eye",
            LandmarkGroup::RightEye => "right_eye",
            LandmarkGroup::Nose => "nose",
            LandmarkGroup::LeftMouth => "left_mouth",
            LandmarkGroup::RightMouth => "right_mouth",
        }
    }
}

/// A landmark point, or `None` when the detector could not see it.
pub type LandmarkPoint = Option<(f64, f64)>;

#[derive(Clone, Debug, PartialEq)]
pub struct FaceLandmarks {
    points: [LandmarkPoint; 5],
}

impl FaceLandmarks {
    pub fn new(points: [LandmarkPoint; 5]) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[LandmarkPoint; 5] {
        &self.points
    }

    pub fn point(&self, group: LandmarkGroup) -> LandmarkPoint {
        self.points[group.slot()]
    }

    pub fn has_visible(&self) -> bool {
        self.points.iter().any(Option::is_some)
    }

    /// Visible landmarks with their group, in feature order.
    pub fn visible(&self) -> impl Iterator<Item = (LandmarkGroup, (f64, f64))> + '_ {
        LandmarkGroup::ALL
            .into_iter()
            .filter_map(|g| self.point(g).map(|p| (g, p)))
    }

    /// Maps visible points into pixel space (upper-left origin) of a
    /// `width`×`height` image.
    pub fn to_pixels(&self, width: u32, height: u32) -> Vec<(LandmarkGroup, (f64, f64))> {
        let w = width as f64;
        let h = height as f64;
        self.visible()
            .map(|(g, (x, y))| (g, (x * w, (1.0 - y) * h)))
            .collect()
    }
}
