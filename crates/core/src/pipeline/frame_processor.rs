use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};

use crate::capture::domain::frame_source::CapturedFrame;
use crate::capture::frame_slot::FrameSlotReceiver;
use crate::detection::domain::detection_request::{DetectionMode, DetectionRequests};
use crate::detection::domain::face_detector::FaceDetector;
use crate::identification::dispatcher::IdentificationDispatcher;
use crate::pipeline::ui_context::{OverlayFrame, UiEvent};
use crate::pipeline::viewfinder_logger::ViewfinderLogger;
use crate::sampling::capture_sampler::CaptureSampler;
use crate::shared::orientation::{CameraPosition, ExifOrientation};
use crate::video::domain::image_writer::ImageWriter;

/// Messages the frame worker handles between frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessorControl {
    SetMode(DetectionMode),
}

/// Saves every submitted crop as `crop_<sequence>.jpg`.
pub struct CropArchive {
    writer: Box<dyn ImageWriter>,
    dir: PathBuf,
}

impl CropArchive {
    pub fn new(writer: Box<dyn ImageWriter>, dir: impl Into<PathBuf>) -> Self {
        Self {
            writer,
            dir: dir.into(),
        }
    }

    fn save(&self, sequence: u64, jpeg: &[u8]) {
        let path = self.dir.join(format!("crop_{sequence:05}.jpg"));
        if let Err(e) = self.writer.write_encoded(&path, jpeg) {
            log::warn!("Could not save crop to {}: {e}", path.display());
        }
    }
}

/// Per-frame work: orient, detect, sample, submit, post overlay.
///
/// Lives on the frame worker thread and owns all of its state, so nothing
/// here needs locking.
pub struct FrameProcessor {
    detector: Box<dyn FaceDetector>,
    requests: DetectionRequests,
    camera: CameraPosition,
    sampler: CaptureSampler,
    dispatcher: IdentificationDispatcher,
    archive: Option<CropArchive>,
    ui: Sender<UiEvent>,
    logger: Box<dyn ViewfinderLogger>,
}

impl FrameProcessor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        detector: Box<dyn FaceDetector>,
        mode: DetectionMode,
        camera: CameraPosition,
        sampler: CaptureSampler,
        dispatcher: IdentificationDispatcher,
        archive: Option<CropArchive>,
        ui: Sender<UiEvent>,
        logger: Box<dyn ViewfinderLogger>,
    ) -> Self {
        Self {
            detector,
            requests: DetectionRequests::new(mode),
            camera,
            sampler,
            dispatcher,
            archive,
            ui,
            logger,
        }
    }

    pub fn requests(&self) -> &DetectionRequests {
        &self.requests
    }

    pub fn set_mode(&mut self, mode: DetectionMode) {
        if mode != self.requests.mode() {
            log::info!("Detection mode: {mode}");
        }
        self.requests.set_mode(mode);
    }

    pub fn handle_control(&mut self, control: ProcessorControl) {
        match control {
            ProcessorControl::SetMode(mode) => self.set_mode(mode),
        }
    }

    pub fn process(&mut self, captured: CapturedFrame) {
        let index = captured.frame.index();
        let exif = ExifOrientation::from_device(captured.orientation, self.camera);
        let upright = Arc::new(exif.apply(&captured.frame));

        let t0 = Instant::now();
        let mut observations = Vec::new();
        for request in self.requests.as_slice() {
            match self.detector.detect(&upright, *request) {
                Ok(found) => observations.extend(found),
                Err(e) => {
                    log::warn!("Face detection failed on frame {index}: {e}");
                    self.logger.count("inference_failures", 1);
                    return;
                }
            }
        }
        self.logger
            .timing("inference", t0.elapsed().as_secs_f64() * 1000.0);
        self.logger.metric("faces", observations.len() as f64);

        let t1 = Instant::now();
        let outcome = self.sampler.on_frame_processed(&captured, &observations);
        self.logger
            .timing("sampling", t1.elapsed().as_secs_f64() * 1000.0);
        self.logger.count("triggers", outcome.triggers);
        self.logger.count("skipped_triggers", outcome.skipped);

        for crop in outcome.crops {
            let sequence = self.dispatcher.submit(crop.jpeg.clone());
            if let Some(archive) = &self.archive {
                archive.save(sequence, &crop.jpeg);
            }
            self.logger.count("submissions", 1);
        }

        let _ = self.ui.send(UiEvent::Overlay(OverlayFrame {
            frame: upright,
            observations,
            mode: self.requests.mode(),
        }));
        self.logger.frame_processed(index);
    }

    /// Worker loop; returns once the frame slot is closed. Control messages
    /// sent before a frame was delivered apply to that frame.
    pub fn run(mut self, frames: FrameSlotReceiver, control: Receiver<ProcessorControl>) {
        while let Some(captured) = frames.recv() {
            while let Ok(message) = control.try_recv() {
                self.handle_control(message);
            }
            self.process(captured);
        }

        self.logger.count("dropped_frames", frames.dropped());
        self.logger.info(&format!(
            "Frame worker finished: {} submissions, {} triggers, {} skipped",
            self.dispatcher.submitted(),
            self.sampler.total_triggers(),
            self.sampler.total_skipped()
        ));
        self.logger.summary();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::frame_slot::frame_slot;
    use crate::detection::domain::detection_request::DetectionRequest;
    use crate::detection::domain::face_observation::FaceObservation;
    use crate::identification::dispatcher::LabelSink;
    use crate::identification::name_label::LabelUpdate;
    use crate::identification::domain::identification_client::{
        IdentificationClient, IdentifyError,
    };
    use crate::pipeline::viewfinder_logger::NullViewfinderLogger;
    use crate::sampling::face_cropper::FaceCropper;
    use crate::shared::frame::Frame;
    use crate::shared::geometry::{CropMargin, NormalizedRect};
    use crate::shared::orientation::DeviceOrientation;
    use crate::video::infrastructure::image_file_writer::ImageFileWriter;
    use std::sync::Mutex;

    /// Returns one face per frame and records the requests it was given and
    /// the size of each frame.
    struct StubDetector {
        seen: Arc<Mutex<Vec<(DetectionRequest, u32, u32)>>>,
        fail_on: Option<usize>,
    }

    impl FaceDetector for StubDetector {
        fn detect(
            &mut self,
            frame: &Frame,
            request: DetectionRequest,
        ) -> Result<Vec<FaceObservation>, Box<dyn std::error::Error>> {
            self.seen
                .lock()
                .unwrap()
                .push((request, frame.width(), frame.height()));
            if self.fail_on == Some(frame.index()) {
                return Err("inference backend failed".into());
            }
            Ok(vec![FaceObservation::new(
                NormalizedRect::new(0.4, 0.4, 0.2, 0.2),
                0.9,
            )])
        }
    }

    /// Reports the bounding box of the red pixels in whatever frame it is
    /// handed.
    struct RedPatchDetector;

    impl FaceDetector for RedPatchDetector {
        fn detect(
            &mut self,
            frame: &Frame,
            _request: DetectionRequest,
        ) -> Result<Vec<FaceObservation>, Box<dyn std::error::Error>> {
            let red: Vec<(u32, u32)> = frame
                .image()
                .enumerate_pixels()
                .filter(|(_, _, p)| p.0 == [255, 0, 0])
                .map(|(x, y, _)| (x, y))
                .collect();
            let x1 = red.iter().map(|p| p.0).min().unwrap_or(0) as f64;
            let y1 = red.iter().map(|p| p.1).min().unwrap_or(0) as f64;
            let x2 = red.iter().map(|p| p.0).max().unwrap_or(0) as f64 + 1.0;
            let y2 = red.iter().map(|p| p.1).max().unwrap_or(0) as f64 + 1.0;
            Ok(vec![FaceObservation::new(
                NormalizedRect::from_pixel_corners(x1, y1, x2, y2, frame.width(), frame.height()),
                0.9,
            )])
        }
    }

    struct NamedClient;

    impl IdentificationClient for NamedClient {
        fn identify(&self, _jpeg: &[u8]) -> Result<Option<String>, IdentifyError> {
            Ok(Some("Barbara".into()))
        }
    }

    struct Fixture {
        processor: FrameProcessor,
        seen: Arc<Mutex<Vec<(DetectionRequest, u32, u32)>>>,
        events: Receiver<UiEvent>,
    }

    fn fixture(fail_on: Option<usize>, archive: Option<CropArchive>) -> Fixture {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (ui_tx, events) = crossbeam_channel::unbounded();
        let label_tx = ui_tx.clone();
        let sink: LabelSink = Arc::new(move |u| {
            let _ = label_tx.send(UiEvent::Label(u));
        });
        let processor = FrameProcessor::new(
            Box::new(StubDetector {
                seen: seen.clone(),
                fail_on,
            }),
            DetectionMode::Rectangles,
            CameraPosition::Back,
            CaptureSampler::new(FaceCropper::default(), CameraPosition::Back),
            IdentificationDispatcher::new(Arc::new(NamedClient), sink),
            archive,
            ui_tx,
            Box::new(NullViewfinderLogger),
        );
        Fixture {
            processor,
            seen,
            events,
        }
    }

    fn captured(index: usize) -> CapturedFrame {
        // Landscape sensor frame from a portrait device.
        CapturedFrame {
            frame: Frame::new(vec![60; 64 * 36 * 3], 64, 36, index),
            orientation: DeviceOrientation::Portrait,
        }
    }

    #[test]
    fn test_frames_are_oriented_before_detection() {
        let mut f = fixture(None, None);
        f.processor.process(captured(0));
        // Back camera in portrait rotates the sensor frame upright.
        assert_eq!(
            f.seen.lock().unwrap()[0],
            (DetectionRequest::FaceRectangles, 36, 64)
        );
    }

    #[test]
    fn test_mode_switch_dispatches_only_new_request() {
        let mut f = fixture(None, None);
        f.processor.process(captured(0));
        f.processor
            .handle_control(ProcessorControl::SetMode(DetectionMode::Landmarks));
        assert_eq!(
            f.processor.requests().as_slice(),
            &[DetectionRequest::FaceLandmarks]
        );
        f.processor.process(captured(1));
        f.processor.process(captured(2));

        let kinds: Vec<_> = f.seen.lock().unwrap().iter().map(|s| s.0).collect();
        assert_eq!(
            kinds,
            vec![
                DetectionRequest::FaceRectangles,
                DetectionRequest::FaceLandmarks,
                DetectionRequest::FaceLandmarks
            ]
        );
    }

    #[test]
    fn test_overlay_posted_per_frame_with_mode() {
        let mut f = fixture(None, None);
        f.processor.process(captured(0));
        match f.events.try_recv().unwrap() {
            UiEvent::Overlay(o) => {
                assert_eq!(o.observations.len(), 1);
                assert_eq!(o.mode, DetectionMode::Rectangles);
                assert_eq!((o.frame.width(), o.frame.height()), (36, 64));
            }
            _ => panic!("expected overlay"),
        }
    }

    #[test]
    fn test_inference_failure_skips_frame() {
        let mut f = fixture(Some(0), None);
        f.processor.process(captured(0));
        assert!(f.events.try_recv().is_err());
        assert_eq!(f.processor.sampler.counter(), 0);
    }

    #[test]
    fn test_sixteenth_face_submits_and_archives_crop() {
        let dir = tempfile::tempdir().unwrap();
        let archive = CropArchive::new(Box::new(ImageFileWriter::new()), dir.path());
        let mut f = fixture(None, Some(archive));
        for i in 0..16 {
            f.processor.process(captured(i));
        }
        assert_eq!(f.processor.dispatcher.submitted(), 1);
        assert!(dir.path().join("crop_00001.jpg").exists());

        let label = f
            .events
            .iter()
            .find_map(|e| match e {
                UiEvent::Label(u) => Some(u),
                _ => None,
            })
            .unwrap();
        assert_eq!(label.sequence, 1);
        assert_eq!(label.name.as_deref(), Some("Barbara"));
    }

    #[test]
    fn test_run_applies_control_and_ends_with_slot() {
        let f = fixture(None, None);
        let seen = f.seen.clone();
        let (frames_tx, frames_rx) = frame_slot();
        let (control_tx, control_rx) = crossbeam_channel::unbounded();

        control_tx
            .send(ProcessorControl::SetMode(DetectionMode::Landmarks))
            .unwrap();
        frames_tx.push(captured(0)).unwrap();
        drop(frames_tx);

        f.processor.run(frames_rx, control_rx);
        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[(DetectionRequest::FaceLandmarks, 36, 64)]
        );
    }

    #[test]
    fn test_front_camera_crop_covers_detected_face() {
        let dir = tempfile::tempdir().unwrap();
        let (ui_tx, _events) = crossbeam_channel::unbounded();
        let sink: LabelSink = Arc::new(|_: LabelUpdate| {});
        let cropper = FaceCropper::new(
            CropMargin {
                left: 0.0,
                top: 0.0,
                extra_width: 0.0,
                extra_height: 0.0,
            },
            95,
        );
        let mut processor = FrameProcessor::new(
            Box::new(RedPatchDetector),
            DetectionMode::Rectangles,
            CameraPosition::Front,
            CaptureSampler::new(cropper, CameraPosition::Front).with_threshold(1),
            IdentificationDispatcher::new(Arc::new(NamedClient), sink),
            Some(CropArchive::new(Box::new(ImageFileWriter::new()), dir.path())),
            ui_tx,
            Box::new(NullViewfinderLogger),
        );

        for i in 0..2 {
            let mut frame = Frame::new(vec![0; 64 * 32 * 3], 64, 32, i);
            for y in 4..12 {
                for x in 6..14 {
                    frame.image_mut().put_pixel(x, y, image::Rgb([255, 0, 0]));
                }
            }
            processor.process(CapturedFrame {
                frame,
                orientation: DeviceOrientation::Portrait,
            });
        }

        let crop = image::open(dir.path().join("crop_00001.jpg"))
            .unwrap()
            .to_rgb8();
        assert_eq!(crop.dimensions(), (8, 8));
        assert!(crop.pixels().all(|p| p.0[0] > 200 && p.0[1] < 60 && p.0[2] < 60));
    }
}
