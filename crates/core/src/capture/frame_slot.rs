use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::capture::domain::frame_source::CapturedFrame;

/// Single-frame handoff between the delivery thread and the frame worker.
///
/// Capacity is one. Pushing while a frame is still waiting discards the
/// waiting (older) frame, so a slow worker always sees the newest frame and
/// late frames never queue up.
pub fn frame_slot() -> (FrameSlotSender, FrameSlotReceiver) {
    let (tx, rx) = crossbeam_channel::bounded::<CapturedFrame>(1);
    let shared = Arc::new(SlotStats::default());
    (
        FrameSlotSender {
            tx,
            drain: rx.clone(),
            shared: shared.clone(),
        },
        FrameSlotReceiver { rx, shared },
    )
}

#[derive(Debug, Default)]
struct SlotStats {
    dropped: AtomicUsize,
    delivered: AtomicUsize,
    consumer_gone: AtomicBool,
}

#[derive(Debug, thiserror::Error)]
#[error("frame consumer has shut down")]
pub struct SlotClosed;

#[derive(Clone)]
pub struct FrameSlotSender {
    tx: Sender<CapturedFrame>,
    drain: Receiver<CapturedFrame>,
    shared: Arc<SlotStats>,
}

impl FrameSlotSender {
    pub fn push(&self, frame: CapturedFrame) -> Result<(), SlotClosed> {
        if self.shared.consumer_gone.load(Ordering::Acquire) {
            return Err(SlotClosed);
        }
        let mut pending = frame;
        loop {
            match self.tx.try_send(pending) {
                Ok(()) => {
                    self.shared.delivered.fetch_add(1, Ordering::Relaxed);
                    return Ok(());
                }
                Err(TrySendError::Full(back)) => {
                    if let Ok(stale) = self.drain.try_recv() {
                        log::trace!("Dropping late frame {}", stale.frame.index());
                        self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                    pending = back;
                }
                Err(TrySendError::Disconnected(_)) => return Err(SlotClosed),
            }
        }
    }

    pub fn dropped(&self) -> usize {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

pub struct FrameSlotReceiver {
    rx: Receiver<CapturedFrame>,
    shared: Arc<SlotStats>,
}

impl FrameSlotReceiver {
    /// Blocks for the next frame. Returns `None` once every sender is gone
    /// and the slot is empty.
    pub fn recv(&self) -> Option<CapturedFrame> {
        self.rx.recv().ok()
    }

    /// Frames discarded because the worker had not taken the previous one.
    pub fn dropped(&self) -> usize {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Frames accepted into the slot, including ones later dropped.
    pub fn delivered(&self) -> usize {
        self.shared.delivered.load(Ordering::Relaxed)
    }
}

impl Drop for FrameSlotReceiver {
    fn drop(&mut self) {
        self.shared.consumer_gone.store(true, Ordering::Release);
    }
}
