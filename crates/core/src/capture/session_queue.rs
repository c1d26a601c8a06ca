use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;

use crate::capture::capture_session::CaptureSession;

pub type SessionJob = Box<dyn FnOnce(&mut CaptureSession) + Send>;

enum SessionMessage {
    Run(SessionJob),
    Shutdown,
}

/// Serial executor owning a [`CaptureSession`].
///
/// Jobs run one at a time in submission order. Delivery notices raised by
/// the session are queued behind whatever is already pending.
pub struct SessionQueue {
    handle: SessionHandle,
    thread: Option<JoinHandle<()>>,
}

/// Cloneable submitter for a [`SessionQueue`], for threads other than the
/// one that owns the queue.
#[derive(Clone)]
pub struct SessionHandle {
    tx: Sender<SessionMessage>,
}

impl SessionHandle {
    /// Queues a job. Returns false once the queue has shut down.
    pub fn dispatch(&self, job: impl FnOnce(&mut CaptureSession) + Send + 'static) -> bool {
        self.tx.send(SessionMessage::Run(Box::new(job))).is_ok()
    }

    /// Queues a job and waits for its result. `None` once the queue has
    /// shut down.
    pub fn dispatch_sync<R: Send + 'static>(
        &self,
        job: impl FnOnce(&mut CaptureSession) -> R + Send + 'static,
    ) -> Option<R> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        let queued = self.dispatch(move |session| {
            let _ = reply_tx.send(job(session));
        });
        if !queued {
            return None;
        }
        reply_rx.recv().ok()
    }
}

impl SessionQueue {
    pub fn spawn(mut session: CaptureSession) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded::<SessionMessage>();

        let notice_tx = tx.clone();
        session.set_notice_handler(Arc::new(move |notice| {
            let job: SessionJob = Box::new(move |s| s.handle_notice(notice));
            let _ = notice_tx.send(SessionMessage::Run(job));
        }));

        let thread = thread::spawn(move || {
            for message in rx.iter() {
                match message {
                    SessionMessage::Run(job) => job(&mut session),
                    SessionMessage::Shutdown => break,
                }
            }
            session.shutdown();
            log::debug!("Session queue finished");
        });

        Self {
            handle: SessionHandle { tx },
            thread: Some(thread),
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn dispatch(&self, job: impl FnOnce(&mut CaptureSession) + Send + 'static) -> bool {
        self.handle.dispatch(job)
    }

    /// Shuts the session down and waits for the queue thread.
    pub fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        let _ = self.handle.tx.send(SessionMessage::Shutdown);
        if thread.join().is_err() {
            log::error!("Session queue thread panicked");
        }
    }
}

impl Drop for SessionQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}
