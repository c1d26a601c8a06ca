use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use thiserror::Error;

use crate::capture::domain::camera_authorizer::{AuthorizationStatus, CameraAuthorizer};
use crate::capture::domain::frame_source::{
    CapturedFrame, FrameSource, FrameSourceError, SourceInfo,
};
use crate::capture::frame_slot::FrameSlotSender;
use crate::shared::orientation::OrientationState;

/// Outcome of authorizing and configuring the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionSetupResult {
    Success,
    NotAuthorized,
    ConfigurationFailed,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("camera access was not granted")]
    NotAuthorized,
    #[error("capture session could not be configured: {0}")]
    ConfigurationFailed(String),
    #[error("frame output has already been released")]
    OutputReleased,
}

/// Why the delivery thread stopped on its own.
#[derive(Debug)]
pub enum DeliveryNotice {
    EndOfStream,
    Failed(FrameSourceError),
}

pub type AlertFn = Box<dyn Fn(SessionSetupResult) + Send>;
pub type NoticeFn = Arc<dyn Fn(DeliveryNotice) + Send + Sync>;

struct Delivery {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<Box<dyn FrameSource>>,
}

/// Owns the frame source and its delivery thread.
///
/// Every method is meant to run on the session queue; none of them are
/// re-entrant. Delivery pushes into the frame slot and reports the end of
/// the stream or runtime failures through the notice handler, which the
/// queue routes back into [`CaptureSession::handle_notice`].
pub struct CaptureSession {
    source: Option<Box<dyn FrameSource>>,
    authorizer: Box<dyn CameraAuthorizer>,
    orientation: Arc<OrientationState>,
    output: Option<FrameSlotSender>,
    on_alert: AlertFn,
    on_notice: Option<NoticeFn>,
    setup: SessionSetupResult,
    info: Option<SourceInfo>,
    is_running: bool,
    frame_limit: Option<usize>,
    delivered: Arc<AtomicUsize>,
    delivery: Option<Delivery>,
}

impl CaptureSession {
    pub fn new(
        source: Box<dyn FrameSource>,
        authorizer: Box<dyn CameraAuthorizer>,
        orientation: Arc<OrientationState>,
        output: FrameSlotSender,
        on_alert: AlertFn,
    ) -> Self {
        Self {
            source: Some(source),
            authorizer,
            orientation,
            output: Some(output),
            on_alert,
            on_notice: None,
            setup: SessionSetupResult::Success,
            info: None,
            is_running: false,
            frame_limit: None,
            delivered: Arc::new(AtomicUsize::new(0)),
            delivery: None,
        }
    }

    /// Stop delivering after this many frames in total.
    pub fn with_frame_limit(mut self, limit: Option<usize>) -> Self {
        self.frame_limit = limit;
        self
    }

    pub fn set_notice_handler(&mut self, handler: NoticeFn) {
        self.on_notice = Some(handler);
    }

    pub fn setup_result(&self) -> SessionSetupResult {
        self.setup
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn source_info(&self) -> Option<&SourceInfo> {
        self.info.as_ref()
    }

    pub fn frames_delivered(&self) -> usize {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn authorize(&mut self) -> SessionSetupResult {
        let granted = match self.authorizer.status() {
            AuthorizationStatus::Authorized => true,
            AuthorizationStatus::NotDetermined => self.authorizer.request_access(),
            AuthorizationStatus::Denied => false,
        };
        if !granted {
            log::error!("Camera access was not granted");
            self.setup = SessionSetupResult::NotAuthorized;
        }
        self.setup
    }

    /// Opens the source. Skipped unless setup has succeeded so far.
    pub fn configure(&mut self) -> Result<SourceInfo, SessionError> {
        self.setup_error()?;
        let Some(source) = self.source.as_mut() else {
            return Err(SessionError::ConfigurationFailed(
                "frame source is unavailable".into(),
            ));
        };
        match source.open() {
            Ok(info) => {
                self.info = Some(info.clone());
                Ok(info)
            }
            Err(FrameSourceError::NotAuthorized(msg)) => {
                log::error!("Camera access denied while configuring: {msg}");
                self.setup = SessionSetupResult::NotAuthorized;
                Err(SessionError::NotAuthorized)
            }
            Err(e) => {
                log::error!("Capture session configuration failed: {e}");
                self.setup = SessionSetupResult::ConfigurationFailed;
                Err(SessionError::ConfigurationFailed(e.to_string()))
            }
        }
    }

    /// Starts frame delivery, configuring first when needed. Setup failures
    /// raise the matching alert; delivery never starts and the frame slot is
    /// closed.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.is_running {
            return Ok(());
        }
        if self.setup == SessionSetupResult::Success && self.info.is_none() {
            // The resulting setup state is reported below.
            let _ = self.configure();
        }
        if let Err(e) = self.setup_error() {
            (self.on_alert)(self.setup);
            self.output = None;
            return Err(e);
        }
        self.spawn_delivery()?;
        self.is_running = true;
        log::info!("Capture session started");
        Ok(())
    }

    /// Stops and joins delivery and closes the source. No-op unless running.
    pub fn stop(&mut self) {
        if self.setup != SessionSetupResult::Success || !self.is_running {
            return;
        }
        self.join_delivery();
        self.close_source();
        self.is_running = false;
        log::info!("Capture session stopped");
    }

    /// Stops for good and closes the frame slot so the consumer can finish.
    pub fn shutdown(&mut self) {
        self.stop();
        self.close_source();
        if self.output.take().is_some() {
            log::debug!("Released frame output");
        }
    }

    pub fn handle_runtime_error(&mut self, error: FrameSourceError) {
        log::error!("Capture session runtime error: {error}");
        if !self.is_running {
            return;
        }
        if matches!(error, FrameSourceError::Reset(_)) {
            self.join_delivery();
            self.close_source();
            self.is_running = false;
            log::info!("Restarting capture session after media reset");
            if let Err(e) = self.start() {
                log::error!("Could not restart capture session: {e}");
            }
        } else {
            self.shutdown();
        }
    }

    pub fn handle_notice(&mut self, notice: DeliveryNotice) {
        match notice {
            DeliveryNotice::EndOfStream => {
                log::info!(
                    "Frame source finished after {} frames",
                    self.frames_delivered()
                );
                self.shutdown();
            }
            DeliveryNotice::Failed(e) => self.handle_runtime_error(e),
        }
    }

    fn setup_error(&self) -> Result<(), SessionError> {
        match self.setup {
            SessionSetupResult::Success => Ok(()),
            SessionSetupResult::NotAuthorized => Err(SessionError::NotAuthorized),
            SessionSetupResult::ConfigurationFailed => Err(SessionError::ConfigurationFailed(
                "previous configuration failed".into(),
            )),
        }
    }

    fn spawn_delivery(&mut self) -> Result<(), SessionError> {
        let output = self.output.clone().ok_or(SessionError::OutputReleased)?;
        let mut source = self.source.take().ok_or_else(|| {
            SessionError::ConfigurationFailed("frame source is unavailable".into())
        })?;

        let stop = Arc::new(AtomicBool::new(false));
        let worker = DeliveryLoop {
            stop: stop.clone(),
            orientation: self.orientation.clone(),
            output,
            notice: self.on_notice.clone(),
            frame_limit: self.frame_limit,
            delivered: self.delivered.clone(),
        };
        let handle = std::thread::spawn(move || {
            worker.run(source.as_mut());
            source
        });
        self.delivery = Some(Delivery { stop, handle });
        Ok(())
    }

    fn join_delivery(&mut self) {
        let Some(delivery) = self.delivery.take() else {
            return;
        };
        delivery.stop.store(true, Ordering::Release);
        match delivery.handle.join() {
            Ok(source) => self.source = Some(source),
            Err(_) => log::error!("Frame delivery thread panicked; source lost"),
        }
    }

    fn close_source(&mut self) {
        if self.info.take().is_none() {
            return;
        }
        if let Some(source) = self.source.as_mut() {
            source.close();
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.join_delivery();
        self.close_source();
    }
}

struct DeliveryLoop {
    stop: Arc<AtomicBool>,
    orientation: Arc<OrientationState>,
    output: FrameSlotSender,
    notice: Option<NoticeFn>,
    frame_limit: Option<usize>,
    delivered: Arc<AtomicUsize>,
}

impl DeliveryLoop {
    fn run(self, source: &mut dyn FrameSource) {
        while !self.stop.load(Ordering::Acquire) {
            if self
                .frame_limit
                .is_some_and(|limit| self.delivered.load(Ordering::Relaxed) >= limit)
            {
                self.report(DeliveryNotice::EndOfStream);
                return;
            }
            match source.next_frame() {
                Ok(Some(frame)) => {
                    let captured = CapturedFrame {
                        frame,
                        orientation: self.orientation.get(),
                    };
                    if self.output.push(captured).is_err() {
                        log::debug!("Frame consumer is gone; ending delivery");
                        self.report(DeliveryNotice::EndOfStream);
                        return;
                    }
                    self.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Ok(None) => {
                    self.report(DeliveryNotice::EndOfStream);
                    return;
                }
                Err(FrameSourceError::Interrupted(msg)) => {
                    log::warn!("Capture interrupted: {msg}");
                }
                Err(e) => {
                    self.report(DeliveryNotice::Failed(e));
                    return;
                }
            }
        }
    }

    fn report(&self, notice: DeliveryNotice) {
        match &self.notice {
            Some(handler) => handler(notice),
            None => log::debug!("Delivery ended without a handler: {notice:?}"),
        }
    }
}
