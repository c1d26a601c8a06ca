use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

use crate::capture::capture_session::{CaptureSession, SessionSetupResult};
use crate::capture::domain::camera_authorizer::CameraAuthorizer;
use crate::capture::domain::frame_source::{FrameSource, SourceInfo};
use crate::capture::frame_slot::frame_slot;
use crate::capture::session_queue::{SessionHandle, SessionQueue};
use crate::detection::domain::detection_request::DetectionMode;
use crate::detection::domain::face_detector::FaceDetector;
use crate::identification::dispatcher::{IdentificationDispatcher, LabelSink};
use crate::identification::domain::identification_client::IdentificationClient;
use crate::identification::name_label::{LabelOrdering, NameLabel};
use crate::overlay::domain::overlay_renderer::OverlayRenderer;
use crate::pipeline::frame_processor::{CropArchive, FrameProcessor, ProcessorControl};
use crate::pipeline::ui_context::{Alert, UiContext, UiEvent};
use crate::pipeline::viewfinder_logger::ViewfinderLogger;
use crate::sampling::capture_sampler::CaptureSampler;
use crate::sampling::face_cropper::FaceCropper;
use crate::shared::orientation::{CameraPosition, DeviceOrientation, OrientationState};

#[derive(Clone, Debug, Default)]
pub struct ViewfinderConfig {
    pub camera: CameraPosition,
    pub mode: DetectionMode,
    pub label_ordering: LabelOrdering,
    /// Stop after this many delivered frames.
    pub frame_limit: Option<usize>,
    pub initial_orientation: DeviceOrientation,
}

/// Ports the viewfinder is assembled from.
pub struct ViewfinderComponents {
    pub source: Box<dyn FrameSource>,
    pub authorizer: Box<dyn CameraAuthorizer>,
    pub detector: Box<dyn FaceDetector>,
    pub client: Arc<dyn IdentificationClient>,
    pub renderer: Box<dyn OverlayRenderer>,
    pub logger: Box<dyn ViewfinderLogger>,
    pub crop_archive: Option<CropArchive>,
}

/// Capture session state as seen from the session queue.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionStatus {
    pub running: bool,
    pub frames_delivered: usize,
    pub source: Option<SourceInfo>,
}

/// Runtime controls for a [`Viewfinder`]. Cheap to clone and usable from any
/// thread while the UI loop runs.
#[derive(Clone)]
pub struct ViewfinderControl {
    session: SessionHandle,
    processor: Sender<ProcessorControl>,
    orientation: Arc<OrientationState>,
}

impl ViewfinderControl {
    /// Authorizes, configures and starts capture on the session queue.
    pub fn start(&self) -> bool {
        self.session.dispatch(|session| {
            session.authorize();
            if let Err(e) = session.start() {
                log::error!("Capture session did not start: {e}");
            }
        })
    }

    /// Pauses capture; `start` resumes it.
    pub fn stop(&self) -> bool {
        self.session.dispatch(|session| session.stop())
    }

    /// Ends capture for good, which lets the UI loop finish.
    pub fn finish(&self) -> bool {
        self.session.dispatch(|session| session.shutdown())
    }

    /// Takes effect from the next frame the worker receives.
    pub fn set_detection_mode(&self, mode: DetectionMode) {
        let _ = self.processor.send(ProcessorControl::SetMode(mode));
    }

    /// Stamped onto frames delivered from now on.
    pub fn set_device_orientation(&self, orientation: DeviceOrientation) {
        log::info!("Device orientation: {orientation:?}");
        self.orientation.set(orientation);
    }

    /// Waits for the session queue; `None` once it has shut down.
    pub fn status(&self) -> Option<SessionStatus> {
        self.session.dispatch_sync(|session| SessionStatus {
            running: session.is_running(),
            frames_delivered: session.frames_delivered(),
            source: session.source_info().cloned(),
        })
    }
}

/// The assembled viewfinder: session queue, frame worker and UI context.
///
/// The thread that calls [`Viewfinder::run_ui`] acts as the UI thread. It
/// returns once the session has released its frame output, the worker has
/// drained it and every in-flight identification has reported back.
pub struct Viewfinder {
    queue: SessionQueue,
    control: ViewfinderControl,
    worker: Option<JoinHandle<()>>,
    ui: UiContext,
    events: Receiver<UiEvent>,
    alerts: Receiver<Alert>,
}

impl Viewfinder {
    pub fn new(config: ViewfinderConfig, components: ViewfinderComponents) -> Self {
        let (ui_tx, events) = crossbeam_channel::unbounded::<UiEvent>();
        let (alert_tx, alerts) = crossbeam_channel::unbounded::<Alert>();
        let (frames_tx, frames_rx) = frame_slot();
        let (control_tx, control_rx) = crossbeam_channel::unbounded();

        let orientation = Arc::new(OrientationState::new(config.initial_orientation));
        let on_alert = Box::new(move |result: SessionSetupResult| {
            if let Some(alert) = Alert::from_setup(result) {
                let _ = alert_tx.send(alert);
            }
        });
        let session = CaptureSession::new(
            components.source,
            components.authorizer,
            orientation.clone(),
            frames_tx,
            on_alert,
        )
        .with_frame_limit(config.frame_limit);
        let queue = SessionQueue::spawn(session);

        let label_tx = ui_tx.clone();
        let sink: LabelSink = Arc::new(move |update| {
            let _ = label_tx.send(UiEvent::Label(update));
        });
        let dispatcher = IdentificationDispatcher::new(components.client, sink);
        let label = NameLabel::new(config.label_ordering, dispatcher.latest_issued());
        let ui = UiContext::new(components.renderer, label);

        let processor = FrameProcessor::new(
            components.detector,
            config.mode,
            config.camera,
            CaptureSampler::new(FaceCropper::default(), config.camera),
            dispatcher,
            components.crop_archive,
            ui_tx,
            components.logger,
        );
        let worker = thread::Builder::new()
            .name("frame-worker".into())
            .spawn(move || processor.run(frames_rx, control_rx));
        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("Could not spawn frame worker: {e}");
                None
            }
        };

        let control = ViewfinderControl {
            session: queue.handle(),
            processor: control_tx,
            orientation,
        };

        Self {
            queue,
            control,
            worker,
            ui,
            events,
            alerts,
        }
    }

    pub fn control(&self) -> ViewfinderControl {
        self.control.clone()
    }

    pub fn start(&self) {
        self.control.start();
    }

    /// Blocks on the UI loop until the pipeline has finished.
    pub fn run_ui(&mut self) {
        self.ui.run(self.events.clone(), self.alerts.clone());
    }

    pub fn label(&self) -> &NameLabel {
        self.ui.label()
    }

    pub fn alerts(&self) -> &[Alert] {
        self.ui.alerts()
    }

    pub fn overlays_presented(&self) -> usize {
        self.ui.overlays_presented()
    }

    /// Shuts the session down and waits for the frame worker.
    pub fn shutdown(&mut self) {
        self.queue.shutdown();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Frame worker panicked");
            }
        }
    }
}

impl Drop for Viewfinder {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::domain::camera_authorizer::{AlwaysAuthorized, AuthorizationStatus};
    use crate::capture::domain::frame_source::FrameSourceError;
    use crate::detection::domain::detection_request::DetectionRequest;
    use crate::detection::domain::face_observation::FaceObservation;
    use crate::identification::domain::identification_client::IdentifyError;
    use crate::overlay::infrastructure::log_overlay_renderer::LogOverlayRenderer;
    use crate::pipeline::viewfinder_logger::NullViewfinderLogger;
    use crate::shared::frame::Frame;
    use crate::shared::geometry::NormalizedRect;
    use std::error::Error;
    use std::sync::Mutex;
    use std::time::Duration;

    type Seen = Arc<Mutex<Vec<(DetectionRequest, u32, u32)>>>;

    /// Yields `total` landscape frames, each only once the previous one has
    /// been released after detection, then ends the stream.
    struct LockstepSource {
        total: usize,
        next: usize,
        released: Receiver<()>,
    }

    impl FrameSource for LockstepSource {
        fn open(&mut self) -> Result<SourceInfo, FrameSourceError> {
            Ok(SourceInfo {
                width: 64,
                height: 36,
                fps: 30.0,
                name: "lockstep".into(),
            })
        }

        fn next_frame(&mut self) -> Result<Option<Frame>, FrameSourceError> {
            if self.next > 0 && self.released.recv_timeout(Duration::from_secs(5)).is_err() {
                return Err(FrameSourceError::Runtime("worker stalled".into()));
            }
            if self.next == self.total {
                return Ok(None);
            }
            let frame = Frame::new(vec![90; 64 * 36 * 3], 64, 36, self.next);
            self.next += 1;
            Ok(Some(frame))
        }

        fn close(&mut self) {}
    }

    /// Records each request with the size of the frame it ran on.
    struct OneFaceDetector {
        detected: Sender<()>,
        seen: Seen,
    }

    impl FaceDetector for OneFaceDetector {
        fn detect(
            &mut self,
            frame: &Frame,
            request: DetectionRequest,
        ) -> Result<Vec<FaceObservation>, Box<dyn Error>> {
            self.seen
                .lock()
                .unwrap()
                .push((request, frame.width(), frame.height()));
            let _ = self.detected.send(());
            Ok(vec![FaceObservation::new(
                NormalizedRect::new(0.4, 0.4, 0.2, 0.2),
                0.8,
            )])
        }
    }

    struct FixedClient(&'static str);

    impl IdentificationClient for FixedClient {
        fn identify(&self, _jpeg: &[u8]) -> Result<Option<String>, IdentifyError> {
            Ok(Some(self.0.to_string()))
        }
    }

    struct Refused;

    impl CameraAuthorizer for Refused {
        fn status(&self) -> AuthorizationStatus {
            AuthorizationStatus::NotDetermined
        }

        fn request_access(&mut self) -> bool {
            false
        }
    }

    /// Components whose source waits for each frame to be released after
    /// detection.
    struct Lockstep {
        components: ViewfinderComponents,
        seen: Seen,
        detected: Receiver<()>,
        release: Sender<()>,
    }

    fn lockstep(frames: usize, authorizer: Box<dyn CameraAuthorizer>) -> Lockstep {
        let (detected_tx, detected) = crossbeam_channel::unbounded();
        let (release, released) = crossbeam_channel::unbounded();
        let seen = Seen::default();
        let components = ViewfinderComponents {
            source: Box::new(LockstepSource {
                total: frames,
                next: 0,
                released,
            }),
            authorizer,
            detector: Box::new(OneFaceDetector {
                detected: detected_tx,
                seen: seen.clone(),
            }),
            client: Arc::new(FixedClient("Grace Hopper")),
            renderer: Box::new(LogOverlayRenderer::new()),
            logger: Box::new(NullViewfinderLogger),
            crop_archive: None,
        };
        Lockstep {
            components,
            seen,
            detected,
            release,
        }
    }

    /// Releases the next frame after each detection, running `between` with
    /// the index of the detected frame first.
    fn release_after_detection(
        detected: Receiver<()>,
        release: Sender<()>,
        mut between: impl FnMut(usize) + Send + 'static,
    ) {
        thread::spawn(move || {
            for (index, ()) in detected.iter().enumerate() {
                between(index);
                if release.send(()).is_err() {
                    break;
                }
            }
        });
    }

    fn components(
        frames: usize,
        authorizer: Box<dyn CameraAuthorizer>,
    ) -> (ViewfinderComponents, Seen) {
        let l = lockstep(frames, authorizer);
        release_after_detection(l.detected, l.release, |_| {});
        (l.components, l.seen)
    }

    fn requests(seen: &Seen) -> Vec<DetectionRequest> {
        seen.lock().unwrap().iter().map(|s| s.0).collect()
    }

    #[test]
    fn test_stream_to_label_end_to_end() {
        let (components, _) = components(20, Box::new(AlwaysAuthorized));
        let mut viewfinder = Viewfinder::new(ViewfinderConfig::default(), components);
        viewfinder.start();
        viewfinder.run_ui();

        assert_eq!(viewfinder.overlays_presented(), 20);
        assert_eq!(viewfinder.label().text(), "Grace Hopper");
        assert!(!viewfinder.label().is_hidden());
        assert!(viewfinder.alerts().is_empty());
        viewfinder.shutdown();
    }

    #[test]
    fn test_landmark_mode_from_config() {
        let (components, seen) = components(3, Box::new(AlwaysAuthorized));
        let config = ViewfinderConfig {
            mode: DetectionMode::Landmarks,
            ..ViewfinderConfig::default()
        };
        let mut viewfinder = Viewfinder::new(config, components);
        viewfinder.start();
        viewfinder.run_ui();

        assert_eq!(requests(&seen), vec![DetectionRequest::FaceLandmarks; 3]);
    }

    #[test]
    fn test_frame_limit_ends_run() {
        let (components, _) = components(100, Box::new(AlwaysAuthorized));
        let config = ViewfinderConfig {
            frame_limit: Some(5),
            ..ViewfinderConfig::default()
        };
        let mut viewfinder = Viewfinder::new(config, components);
        viewfinder.start();
        viewfinder.run_ui();
        assert_eq!(viewfinder.overlays_presented(), 5);
    }

    #[test]
    fn test_refused_access_alerts_and_finishes() {
        let (components, seen) = components(10, Box::new(Refused));
        let mut viewfinder = Viewfinder::new(ViewfinderConfig::default(), components);
        viewfinder.start();
        viewfinder.run_ui();

        assert_eq!(viewfinder.alerts(), &[Alert::NotAuthorized]);
        assert_eq!(viewfinder.overlays_presented(), 0);
        assert!(seen.lock().unwrap().is_empty());
        assert!(viewfinder.label().is_hidden());
    }

    #[test]
    fn test_mode_switch_mid_stream_applies_to_later_frames() {
        let l = lockstep(6, Box::new(AlwaysAuthorized));
        let mut viewfinder = Viewfinder::new(ViewfinderConfig::default(), l.components);
        let control = viewfinder.control();
        release_after_detection(l.detected, l.release, move |index| {
            if index == 2 {
                control.set_detection_mode(DetectionMode::Landmarks);
            }
        });
        viewfinder.start();
        viewfinder.run_ui();

        use DetectionRequest::{FaceLandmarks, FaceRectangles};
        assert_eq!(
            requests(&l.seen),
            vec![
                FaceRectangles,
                FaceRectangles,
                FaceRectangles,
                FaceLandmarks,
                FaceLandmarks,
                FaceLandmarks
            ]
        );
        assert_eq!(viewfinder.overlays_presented(), 6);
    }

    #[test]
    fn test_orientation_change_reorients_later_frames() {
        let l = lockstep(4, Box::new(AlwaysAuthorized));
        let config = ViewfinderConfig {
            initial_orientation: DeviceOrientation::Portrait,
            ..ViewfinderConfig::default()
        };
        let mut viewfinder = Viewfinder::new(config, l.components);
        let control = viewfinder.control();
        release_after_detection(l.detected, l.release, move |index| {
            if index == 1 {
                control.set_device_orientation(DeviceOrientation::LandscapeLeft);
            }
        });
        viewfinder.start();
        viewfinder.run_ui();

        let sizes: Vec<_> = l.seen.lock().unwrap().iter().map(|s| (s.1, s.2)).collect();
        assert_eq!(sizes, vec![(36, 64), (36, 64), (64, 36), (64, 36)]);
    }

    #[test]
    fn test_status_reports_running_session() {
        let l = lockstep(3, Box::new(AlwaysAuthorized));
        let mut viewfinder = Viewfinder::new(ViewfinderConfig::default(), l.components);
        let control = viewfinder.control();
        let (status_tx, status_rx) = crossbeam_channel::unbounded();
        release_after_detection(l.detected, l.release, move |index| {
            if index == 1 {
                let _ = status_tx.send(control.status());
            }
        });
        viewfinder.start();
        viewfinder.run_ui();

        let status = status_rx.recv().unwrap().unwrap();
        assert!(status.running);
        assert!(status.frames_delivered >= 1);
        assert_eq!(status.source.unwrap().name, "lockstep");

        viewfinder.shutdown();
        assert!(viewfinder.control().status().is_none());
    }

    #[test]
    fn test_finish_ends_ui_loop_before_stream_end() {
        let l = lockstep(1000, Box::new(AlwaysAuthorized));
        let mut viewfinder = Viewfinder::new(ViewfinderConfig::default(), l.components);
        let control = viewfinder.control();
        release_after_detection(l.detected, l.release, move |index| {
            if index == 3 {
                control.finish();
            }
        });
        viewfinder.start();
        viewfinder.run_ui();

        assert!(viewfinder.overlays_presented() < 1000);
        assert!(viewfinder.control().status().is_some_and(|s| !s.running));
    }
}
