use std::fmt;
use std::str::FromStr;

use crate::capture::domain::frame_source::FrameSource;

/// Named capture quality levels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionPreset {
    Photo,
    Low,
    Medium,
    #[default]
    High,
    Cif352x288,
    Vga640x480,
    Hd1280x720,
    IFrame960x540,
    IFrame1280x720,
    Hd1920x1080,
    Hd4K3840x2160,
}

impl SessionPreset {
    pub const ALL: &[SessionPreset] = &[
        SessionPreset::Photo,
        SessionPreset::Low,
        SessionPreset::Medium,
        SessionPreset::High,
        SessionPreset::Cif352x288,
        SessionPreset::Vga640x480,
        SessionPreset::Hd1280x720,
        SessionPreset::IFrame960x540,
        SessionPreset::IFrame1280x720,
        SessionPreset::Hd1920x1080,
        SessionPreset::Hd4K3840x2160,
    ];

    /// Frame size requested from the device. `None` leaves the choice to
    /// the device (its highest-quality default).
    pub fn dimensions(self) -> Option<(u32, u32)> {
        match self {
            SessionPreset::Photo | SessionPreset::High => None,
            SessionPreset::Low => Some((192, 144)),
            SessionPreset::Medium => Some((480, 360)),
            SessionPreset::Cif352x288 => Some((352, 288)),
            SessionPreset::Vga640x480 => Some((640, 480)),
            SessionPreset::Hd1280x720 | SessionPreset::IFrame1280x720 => Some((1280, 720)),
            SessionPreset::IFrame960x540 => Some((960, 540)),
            SessionPreset::Hd1920x1080 => Some((1920, 1080)),
            SessionPreset::Hd4K3840x2160 => Some((3840, 2160)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SessionPreset::Photo => "photo",
            SessionPreset::Low => "low",
            SessionPreset::Medium => "medium",
            SessionPreset::High => "high",
            SessionPreset::Cif352x288 => "352x288",
            SessionPreset::Vga640x480 => "640x480",
            SessionPreset::Hd1280x720 => "1280x720",
            SessionPreset::IFrame960x540 => "iframe-960x540",
            SessionPreset::IFrame1280x720 => "iframe-1280x720",
            SessionPreset::Hd1920x1080 => "1920x1080",
            SessionPreset::Hd4K3840x2160 => "3840x2160",
        }
    }
}

impl fmt::Display for SessionPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SessionPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SessionPreset::ALL
            .iter()
            .copied()
            .find(|p| p.name() == s)
            .ok_or_else(|| format!("unknown session preset '{s}'"))
    }
}

/// Presets the source reports it can deliver, in [`SessionPreset::ALL`] order.
pub fn available_presets(source: &dyn FrameSource) -> Vec<SessionPreset> {
    SessionPreset::ALL
        .iter()
        .copied()
        .filter(|p| source.supports_preset(*p))
        .collect()
}
