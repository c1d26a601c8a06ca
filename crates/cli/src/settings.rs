use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use facecam_core::detection::domain::detection_request::DetectionMode;
use facecam_core::identification::name_label::LabelOrdering;
use facecam_core::shared::constants::{APP_DIR_NAME, DEFAULT_ENDPOINT};
use facecam_core::shared::orientation::CameraPosition;

/// Persistent defaults, overridden per run by command-line flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub endpoint: String,
    pub mode: DetectionMode,
    pub camera: CameraPosition,
    pub confidence: f64,
    pub label_ordering: LabelOrdering,
    pub input_format: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            mode: DetectionMode::default(),
            camera: CameraPosition::default(),
            confidence: 0.5,
            label_ordering: LabelOrdering::default(),
            input_format: None,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("settings.json"))
    }

    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Missing or unreadable files yield the defaults.
    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) -> io::Result<()> {
        match Self::config_path() {
            Some(path) => self.save_to(&path),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                "no configuration directory on this platform",
            )),
        }
    }

    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }
}
