use std::sync::Arc;

use crossbeam_channel::Receiver;

use crate::capture::capture_session::SessionSetupResult;
use crate::detection::domain::detection_request::DetectionMode;
use crate::detection::domain::face_observation::FaceObservation;
use crate::identification::name_label::{LabelUpdate, NameLabel};
use crate::overlay::domain::overlay_renderer::OverlayRenderer;
use crate::shared::frame::Frame;

/// User-facing setup failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Alert {
    NotAuthorized,
    ConfigurationFailed,
}

impl Alert {
    pub fn from_setup(result: SessionSetupResult) -> Option<Self> {
        match result {
            SessionSetupResult::Success => None,
            SessionSetupResult::NotAuthorized => Some(Alert::NotAuthorized),
            SessionSetupResult::ConfigurationFailed => Some(Alert::ConfigurationFailed),
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Alert::NotAuthorized => {
                "Camera access is not permitted. Grant access to the capture device and try again."
            }
            Alert::ConfigurationFailed => "Unable to configure the capture session.",
        }
    }
}

/// Detections to draw over one upright frame.
#[derive(Clone, Debug)]
pub struct OverlayFrame {
    pub frame: Arc<Frame>,
    pub observations: Vec<FaceObservation>,
    pub mode: DetectionMode,
}

pub enum UiEvent {
    Overlay(OverlayFrame),
    Label(LabelUpdate),
    Alert(Alert),
}

enum Next {
    Event(Option<UiEvent>),
    Alert(Option<Alert>),
}

/// State owned by the presenting thread: the overlay surface and the name
/// label. Everything else talks to it through [`UiEvent`]s.
pub struct UiContext {
    renderer: Box<dyn OverlayRenderer>,
    label: NameLabel,
    alerts: Vec<Alert>,
    overlays: usize,
}

impl UiContext {
    pub fn new(renderer: Box<dyn OverlayRenderer>, label: NameLabel) -> Self {
        Self {
            renderer,
            label,
            alerts: Vec::new(),
            overlays: 0,
        }
    }

    pub fn label(&self) -> &NameLabel {
        &self.label
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn overlays_presented(&self) -> usize {
        self.overlays
    }

    pub fn handle(&mut self, event: UiEvent) {
        match event {
            UiEvent::Overlay(overlay) => self.draw(&overlay),
            UiEvent::Label(update) => {
                self.label.apply(&update);
            }
            UiEvent::Alert(alert) => {
                log::error!("{}", alert.message());
                self.alerts.push(alert);
            }
        }
    }

    /// Processes events until every event sender is gone. Alerts are taken
    /// from their own channel, which may outlive the event channel.
    pub fn run(&mut self, events: Receiver<UiEvent>, alerts: Receiver<Alert>) {
        let mut alerts_open = true;
        loop {
            let next = if alerts_open {
                crossbeam_channel::select! {
                    recv(events) -> event => Next::Event(event.ok()),
                    recv(alerts) -> alert => Next::Alert(alert.ok()),
                }
            } else {
                Next::Event(events.recv().ok())
            };

            match next {
                Next::Event(Some(event)) => self.handle(event),
                Next::Event(None) => break,
                Next::Alert(Some(alert)) => self.handle(UiEvent::Alert(alert)),
                Next::Alert(None) => alerts_open = false,
            }
        }

        while let Ok(alert) = alerts.try_recv() {
            self.handle(UiEvent::Alert(alert));
        }
    }

    fn draw(&mut self, overlay: &OverlayFrame) {
        self.renderer.begin_frame(&overlay.frame);
        for face in &overlay.observations {
            match overlay.mode {
                DetectionMode::Rectangles => self.renderer.draw_face_bounding_box(face),
                DetectionMode::Landmarks => self.renderer.draw_face_with_landmarks(face),
            }
        }
        if let Err(e) = self.renderer.present() {
            log::warn!("Overlay for frame {} not presented: {e}", overlay.frame.index());
        }
        self.overlays += 1;
    }
}
