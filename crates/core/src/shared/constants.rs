use crate::shared::geometry::CropMargin;

pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Face events counted before a crop is attempted; the trigger fires when
/// the counter exceeds this value.
pub const SAMPLE_THRESHOLD: u32 = 15;

/// Padding applied to the mapped face rectangle, biased up and to the left
/// to take in more of the head and shoulders.
pub const CROP_MARGIN: CropMargin = CropMargin {
    left: 120.0,
    top: 250.0,
    extra_width: 120.0,
    extra_height: 250.0,
};

/// JPEG quality (1-100) for submitted crops.
pub const CROP_JPEG_QUALITY: u8 = 30;

pub const IDENTIFY_PATH: &str = "/identify";
pub const DEFAULT_ENDPOINT: &str = "http://192.168.1.60:8687";

/// JSON field carrying the identified person's display name.
pub const FULL_NAME_FIELD: &str = "FullName";

pub const APP_DIR_NAME: &str = "FaceCam";
