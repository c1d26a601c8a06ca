use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use crate::identification::domain::identification_client::IdentificationClient;
use crate::identification::name_label::LabelUpdate;

pub type LabelSink = Arc<dyn Fn(LabelUpdate) + Send + Sync>;

/// Sends face crops for identification, one thread per request.
///
/// Every submission gets the next sequence number. Completions are posted
/// to the sink in whatever order the requests finish; failures become a
/// `None` name.
pub struct IdentificationDispatcher {
    client: Arc<dyn IdentificationClient>,
    latest_issued: Arc<AtomicU64>,
    sink: LabelSink,
}

impl IdentificationDispatcher {
    pub fn new(client: Arc<dyn IdentificationClient>, sink: LabelSink) -> Self {
        Self {
            client,
            latest_issued: Arc::new(AtomicU64::new(0)),
            sink,
        }
    }

    /// Counter of the most recently issued sequence number.
    pub fn latest_issued(&self) -> Arc<AtomicU64> {
        self.latest_issued.clone()
    }

    pub fn submitted(&self) -> u64 {
        self.latest_issued.load(Ordering::Acquire)
    }

    pub fn submit(&self, jpeg: Vec<u8>) -> u64 {
        let sequence = self.latest_issued.fetch_add(1, Ordering::AcqRel) + 1;
        let client = self.client.clone();
        let sink = self.sink.clone();
        log::debug!("Submitting crop {sequence} ({} bytes)", jpeg.len());

        thread::spawn(move || {
            let name = match client.identify(&jpeg) {
                Ok(name) => name,
                Err(e) => {
                    log::warn!("Identification {sequence} failed: {e}");
                    None
                }
            };
            sink(LabelUpdate { sequence, name });
        });
        sequence
    }
}
