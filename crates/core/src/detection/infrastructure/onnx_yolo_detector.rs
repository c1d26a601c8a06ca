/// YOLO face detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference and NMS post-processing, then
/// reports each face as a normalized, lower-left-origin observation.
use std::path::Path;

use crate::detection::domain::detection_request::DetectionRequest;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_landmarks::{FaceLandmarks, LandmarkPoint};
use crate::detection::domain::face_observation::FaceObservation;
use crate::shared::frame::Frame;
use crate::shared::geometry::NormalizedRect;

use super::execution_provider::open_session;
use super::math::{bbox_iou, clamp_bbox};

/// Fallback YOLO model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// Default confidence threshold for face detection.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// Number of keypoints per detection (5 landmarks × 3 values each: x, y, conf).
const NUM_KEYPOINT_VALUES: usize = 15;

/// Minimum keypoint confidence to treat a landmark as visible.
const KEYPOINT_CONF_THRESH: f64 = 0.5;

/// YOLO face detector backed by an ONNX Runtime session.
pub struct OnnxYoloDetector {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load a YOLO ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting NCHW).
    /// Falls back to 640 if the shape is dynamic or unreadable.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = open_session(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::info!("Loaded face model {} (input {input_size}px)", model_path.display());

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }
}

impl FaceDetector for OnnxYoloDetector {
    fn detect(
        &mut self,
        frame: &Frame,
        request: DetectionRequest,
    ) -> Result<Vec<FaceObservation>, Box<dyn std::error::Error>> {
        let (input_tensor, scale, pad_x, pad_y) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }
        // Either [1, features, detections] (transposed) or [1, detections, features].
        let transposed = shape[1] < shape[2];
        let (num_dets, num_feats) = if transposed {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let mut raw_dets = Vec::new();
        for i in 0..num_dets {
            let row: Vec<f32> = if transposed {
                (0..num_feats).map(|f| data[f * num_dets + i]).collect()
            } else {
                data[i * num_feats..(i + 1) * num_feats].to_vec()
            };
            if let Some(det) = parse_row(&row, self.confidence, scale, pad_x, pad_y) {
                raw_dets.push(det);
            }
        }

        let kept = nms(&mut raw_dets, NMS_IOU_THRESH);
        Ok(kept
            .iter()
            .map(|d| to_observation(d, frame.width(), frame.height(), request))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Letterbox-resize a frame to `target_size` × `target_size`.
///
/// Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, f64, u32, u32) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = (fw * scale).round() as u32;
    let new_h = (fh * scale).round() as u32;
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padding is 114/255 gray (YOLO convention)
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (tensor, scale, pad_x, pad_y)
}

// ---------------------------------------------------------------------------
// Post-processing
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct RawDetection {
    /// `[x1, y1, x2, y2]` in frame pixels, upper-left origin.
    bbox: [f64; 4],
    confidence: f64,
    keypoints: Option<[LandmarkPoint; 5]>,
}

/// Decodes one output row `[cx, cy, w, h, conf, kp0_x, kp0_y, kp0_conf, ...]`
/// from letterbox coordinates back into frame pixels.
fn parse_row(row: &[f32], min_conf: f64, scale: f64, pad_x: u32, pad_y: u32) -> Option<RawDetection> {
    if row.len() < 5 {
        return None;
    }
    let conf = row[4] as f64;
    if conf < min_conf {
        return None;
    }

    let unbox = |v: f32, pad: u32| (v as f64 - pad as f64) / scale;
    let (cx, cy, half_w, half_h) = (row[0], row[1], row[2] / 2.0, row[3] / 2.0);
    let bbox = [
        unbox(cx - half_w, pad_x),
        unbox(cy - half_h, pad_y),
        unbox(cx + half_w, pad_x),
        unbox(cy + half_h, pad_y),
    ];

    let keypoints = (row.len() >= 5 + NUM_KEYPOINT_VALUES).then(|| {
        let mut pts: [LandmarkPoint; 5] = [None; 5];
        for (k, pt) in pts.iter_mut().enumerate() {
            if row[5 + k * 3 + 2] as f64 >= KEYPOINT_CONF_THRESH {
                *pt = Some((unbox(row[5 + k * 3], pad_x), unbox(row[5 + k * 3 + 1], pad_y)));
            }
        }
        pts
    });

    Some(RawDetection {
        bbox,
        confidence: conf,
        keypoints,
    })
}

/// Normalizes a pixel-space detection to the frame, flipping to a
/// lower-left origin. Landmarks are attached only for landmark requests.
fn to_observation(
    det: &RawDetection,
    width: u32,
    height: u32,
    request: DetectionRequest,
) -> FaceObservation {
    let w = width as f64;
    let h = height as f64;
    let [x1, y1, x2, y2] = clamp_bbox(det.bbox, w, h);
    let observation = FaceObservation::new(
        NormalizedRect::from_pixel_corners(x1, y1, x2, y2, width, height),
        det.confidence,
    );

    match det.keypoints {
        Some(pts) if request.wants_landmarks() => {
            let normalized = pts.map(|pt| {
                pt.map(|(px, py)| ((px / w).clamp(0.0, 1.0), (1.0 - py / h).clamp(0.0, 1.0)))
            });
            observation.with_landmarks(FaceLandmarks::new(normalized))
        }
        _ => observation,
    }
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(dets: &mut [RawDetection], iou_thresh: f64) -> Vec<RawDetection> {
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<RawDetection> = Vec::new();
    for det in dets.iter() {
        if keep.iter().all(|k| bbox_iou(&k.bbox, &det.bbox) <= iou_thresh) {
            keep.push(det.clone());
        }
    }
    keep
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
