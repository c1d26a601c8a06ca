use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

use image::imageops;
use serde::{Deserialize, Serialize};

use crate::shared::frame::Frame;

/// Physical orientation of the device at capture time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeviceOrientation {
    #[default]
    Unknown,
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
    FaceUp,
    FaceDown,
}

impl DeviceOrientation {
    const ALL: [DeviceOrientation; 7] = [
        DeviceOrientation::Unknown,
        DeviceOrientation::Portrait,
        DeviceOrientation::PortraitUpsideDown,
        DeviceOrientation::LandscapeLeft,
        DeviceOrientation::LandscapeRight,
        DeviceOrientation::FaceUp,
        DeviceOrientation::FaceDown,
    ];

    fn to_raw(self) -> u8 {
        Self::ALL.iter().position(|o| *o == self).unwrap_or(0) as u8
    }

    fn from_raw(raw: u8) -> Self {
        Self::ALL
            .get(raw as usize)
            .copied()
            .unwrap_or(DeviceOrientation::Unknown)
    }
}

impl FromStr for DeviceOrientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(Self::Unknown),
            "portrait" => Ok(Self::Portrait),
            "portrait-upside-down" => Ok(Self::PortraitUpsideDown),
            "landscape-left" => Ok(Self::LandscapeLeft),
            "landscape-right" => Ok(Self::LandscapeRight),
            "face-up" => Ok(Self::FaceUp),
            "face-down" => Ok(Self::FaceDown),
            other => Err(format!("unknown device orientation '{other}'")),
        }
    }
}

/// Which camera produces the frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraPosition {
    #[default]
    Front,
    Back,
}

impl FromStr for CameraPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "front" => Ok(Self::Front),
            "back" => Ok(Self::Back),
            other => Err(format!("camera must be 'front' or 'back', got '{other}'")),
        }
    }
}

impl fmt::Display for CameraPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraPosition::Front => write!(f, "front"),
            CameraPosition::Back => write!(f, "back"),
        }
    }
}

/// EXIF orientation code: how stored pixels map to the upright image.
///
/// Variant names read "where row 0 is, where column 0 is".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ExifOrientation {
    Top0ColLeft = 1,
    Top0ColRight = 2,
    Bottom0ColRight = 3,
    Bottom0ColLeft = 4,
    Left0ColTop = 5,
    Right0ColTop = 6,
    Right0ColBottom = 7,
    Left0ColBottom = 8,
}

impl ExifOrientation {
    pub fn from_device(device: DeviceOrientation, camera: CameraPosition) -> Self {
        let front = camera == CameraPosition::Front;
        match device {
            DeviceOrientation::PortraitUpsideDown => Self::Left0ColBottom,
            DeviceOrientation::LandscapeLeft if front => Self::Bottom0ColRight,
            DeviceOrientation::LandscapeLeft => Self::Top0ColLeft,
            DeviceOrientation::LandscapeRight if front => Self::Top0ColLeft,
            DeviceOrientation::LandscapeRight => Self::Bottom0ColRight,
            _ if front => Self::Left0ColTop,
            _ => Self::Right0ColTop,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Top0ColLeft),
            2 => Some(Self::Top0ColRight),
            3 => Some(Self::Bottom0ColRight),
            4 => Some(Self::Bottom0ColLeft),
            5 => Some(Self::Left0ColTop),
            6 => Some(Self::Right0ColTop),
            7 => Some(Self::Right0ColBottom),
            8 => Some(Self::Left0ColBottom),
            _ => None,
        }
    }

    /// Returns the upright version of `frame`.
    pub fn apply(self, frame: &Frame) -> Frame {
        let img = frame.image();
        let upright = match self {
            Self::Top0ColLeft => return frame.clone(),
            Self::Top0ColRight => imageops::flip_horizontal(img),
            Self::Bottom0ColRight => imageops::rotate180(img),
            Self::Bottom0ColLeft => imageops::flip_vertical(img),
            Self::Left0ColTop => imageops::flip_horizontal(&imageops::rotate90(img)),
            Self::Right0ColTop => imageops::rotate90(img),
            Self::Right0ColBottom => imageops::flip_horizontal(&imageops::rotate270(img)),
            Self::Left0ColBottom => imageops::rotate270(img),
        };
        Frame::from_image(upright, frame.index())
    }
}

/// Latest device orientation, shared between whoever observes the device and
/// the frame delivery thread.
#[derive(Debug, Default)]
pub struct OrientationState {
    raw: AtomicU8,
}

impl OrientationState {
    pub fn new(initial: DeviceOrientation) -> Self {
        Self {
            raw: AtomicU8::new(initial.to_raw()),
        }
    }

    pub fn set(&self, orientation: DeviceOrientation) {
        self.raw.store(orientation.to_raw(), Ordering::Relaxed);
    }

    pub fn get(&self) -> DeviceOrientation {
        DeviceOrientation::from_raw(self.raw.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(DeviceOrientation::PortraitUpsideDown, CameraPosition::Front, 8)]
    #[case(DeviceOrientation::PortraitUpsideDown, CameraPosition::Back, 8)]
    #[case(DeviceOrientation::LandscapeLeft, CameraPosition::Front, 3)]
    #[case(DeviceOrientation::LandscapeLeft, CameraPosition::Back, 1)]
    #[case(DeviceOrientation::LandscapeRight, CameraPosition::Front, 1)]
    #[case(DeviceOrientation::LandscapeRight, CameraPosition::Back, 3)]
    #[case(DeviceOrientation::Portrait, CameraPosition::Front, 5)]
    #[case(DeviceOrientation::Portrait, CameraPosition::Back, 6)]
    #[case(DeviceOrientation::FaceUp, CameraPosition::Front, 5)]
    #[case(DeviceOrientation::FaceDown, CameraPosition::Back, 6)]
    #[case(DeviceOrientation::Unknown, CameraPosition::Front, 5)]
    fn test_exif_from_device(
        #[case] device: DeviceOrientation,
        #[case] camera: CameraPosition,
        #[case] expected: u8,
    ) {
        assert_eq!(ExifOrientation::from_device(device, camera).code(), expected);
    }

    #[test]
    fn test_code_roundtrip_and_invalid() {
        for code in 1..=8 {
            assert_eq!(ExifOrientation::from_code(code).unwrap().code(), code);
        }
        assert!(ExifOrientation::from_code(0).is_none());
        assert!(ExifOrientation::from_code(9).is_none());
    }

    /// 3x2 frame whose red channel encodes `x + 10 * y`.
    fn marked_frame() -> Frame {
        let mut data = Vec::new();
        for y in 0..2u8 {
            for x in 0..3u8 {
                data.extend_from_slice(&[x + 10 * y, 0, 0]);
            }
        }
        Frame::new(data, 3, 2, 7)
    }

    fn red(frame: &Frame, x: u32, y: u32) -> u8 {
        frame.image().get_pixel(x, y).0[0]
    }

    #[rstest]
    #[case::identity(ExifOrientation::Top0ColLeft, (3, 2), 0)]
    #[case::mirror(ExifOrientation::Top0ColRight, (3, 2), 2)]
    #[case::rotate_180(ExifOrientation::Bottom0ColRight, (3, 2), 12)]
    #[case::flip(ExifOrientation::Bottom0ColLeft, (3, 2), 10)]
    #[case::transpose(ExifOrientation::Left0ColTop, (2, 3), 0)]
    #[case::rotate_cw(ExifOrientation::Right0ColTop, (2, 3), 10)]
    #[case::transverse(ExifOrientation::Right0ColBottom, (2, 3), 12)]
    #[case::rotate_ccw(ExifOrientation::Left0ColBottom, (2, 3), 2)]
    fn test_apply_top_left_pixel(
        #[case] orientation: ExifOrientation,
        #[case] size: (u32, u32),
        #[case] top_left: u8,
    ) {
        let upright = orientation.apply(&marked_frame());
        assert_eq!((upright.width(), upright.height()), size);
        assert_eq!(red(&upright, 0, 0), top_left);
        assert_eq!(upright.index(), 7);
    }

    #[test]
    fn test_orientation_state_set_get() {
        let state = OrientationState::new(DeviceOrientation::Portrait);
        assert_eq!(state.get(), DeviceOrientation::Portrait);
        state.set(DeviceOrientation::LandscapeRight);
        assert_eq!(state.get(), DeviceOrientation::LandscapeRight);
    }

    #[test]
    fn test_parse_orientation_and_camera() {
        assert_eq!(
            "landscape-left".parse::<DeviceOrientation>(),
            Ok(DeviceOrientation::LandscapeLeft)
        );
        assert!("sideways".parse::<DeviceOrientation>().is_err());
        assert_eq!("back".parse::<CameraPosition>(), Ok(CameraPosition::Back));
        assert!("left".parse::<CameraPosition>().is_err());
    }
}
