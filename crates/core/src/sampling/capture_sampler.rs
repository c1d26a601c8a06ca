use crate::capture::domain::frame_source::CapturedFrame;
use crate::detection::domain::face_observation::FaceObservation;
use crate::sampling::face_cropper::{EncodedCrop, FaceCropper};
use crate::shared::constants::SAMPLE_THRESHOLD;
use crate::shared::frame::Frame;
use crate::shared::orientation::{CameraPosition, ExifOrientation};

/// What one processed frame produced.
#[derive(Debug, Default)]
pub struct SampleOutcome {
    pub crops: Vec<EncodedCrop>,
    pub triggers: usize,
    pub skipped: usize,
}

/// Rate-limits face crops to one per `threshold + 1` face observations.
///
/// Crops are cut from the frame buffered at the end of an earlier frame, not
/// from the frame whose observation fired the trigger. The buffer is only
/// refreshed once the counter is one short of firing. The buffered frame keeps
/// its own EXIF orientation so the crop is cut in the space it was detected in.
pub struct CaptureSampler {
    counter: u32,
    threshold: u32,
    pending: Option<(Frame, ExifOrientation)>,
    cropper: FaceCropper,
    camera: CameraPosition,
    triggers: usize,
    skipped: usize,
}

impl CaptureSampler {
    pub fn new(cropper: FaceCropper, camera: CameraPosition) -> Self {
        Self {
            counter: 0,
            threshold: SAMPLE_THRESHOLD,
            pending: None,
            cropper,
            camera,
            triggers: 0,
            skipped: 0,
        }
    }

    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn total_triggers(&self) -> usize {
        self.triggers
    }

    pub fn total_skipped(&self) -> usize {
        self.skipped
    }

    /// `captured` is the raw frame as delivered, before orientation.
    pub fn on_frame_processed(
        &mut self,
        captured: &CapturedFrame,
        observations: &[FaceObservation],
    ) -> SampleOutcome {
        let mut outcome = SampleOutcome::default();

        for observation in observations {
            self.counter += 1;
            if self.counter <= self.threshold {
                continue;
            }
            self.counter = 0;
            outcome.triggers += 1;

            let Some((pending, orientation)) = self.pending.as_ref() else {
                log::debug!(
                    "Sample trigger on frame {} with no buffered frame",
                    captured.frame.index()
                );
                outcome.skipped += 1;
                continue;
            };

            match self
                .cropper
                .extract(pending, *orientation, &observation.bounding_box)
            {
                Ok(Some(crop)) => {
                    log::debug!(
                        "Cropped {}x{} at ({}, {}) from frame {} (EXIF {})",
                        crop.bounds.width,
                        crop.bounds.height,
                        crop.bounds.x,
                        crop.bounds.y,
                        crop.frame_index,
                        orientation.code()
                    );
                    outcome.crops.push(crop);
                }
                Ok(None) => {
                    log::debug!("Face crop outside frame {}, skipped", pending.index());
                    outcome.skipped += 1;
                }
                Err(e) => {
                    log::warn!("Face crop failed: {e}");
                    outcome.skipped += 1;
                }
            }
        }

        if self.counter >= self.threshold {
            let orientation = ExifOrientation::from_device(captured.orientation, self.camera);
            self.pending = Some((captured.frame.clone(), orientation));
        }

        self.triggers += outcome.triggers;
        self.skipped += outcome.skipped;
        outcome
    }
}
