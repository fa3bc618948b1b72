//! Bounded inbound audio queue
//!
//! One producer (the ingress reader) and one consumer (the recognition
//! sender). Offers never block: a full queue drops the newest chunk.

use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOutcome {
    Queued,
    /// Queue full, chunk discarded
    Dropped,
    Closed,
}

pub struct AudioQueue {
    sender: Mutex<Option<mpsc::Sender<Bytes>>>,
    dropped: AtomicU64,
}

/// Create a queue holding at most `capacity` chunks
pub fn audio_queue(capacity: usize) -> (Arc<AudioQueue>, mpsc::Receiver<Bytes>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let queue = AudioQueue {
        sender: Mutex::new(Some(tx)),
        dropped: AtomicU64::new(0),
    };
    (Arc::new(queue), rx)
}

impl AudioQueue {
    pub fn offer(&self, chunk: Bytes) -> OfferOutcome {
        let guard = self.sender.lock();
        let Some(tx) = guard.as_ref() else {
            return OfferOutcome::Closed;
        };
        match tx.try_send(chunk) {
            Ok(()) => OfferOutcome::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                OfferOutcome::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => OfferOutcome::Closed,
        }
    }

    /// Close the producer side. The consumer drains what is queued, then ends.
    pub fn close(&self) {
        self.sender.lock().take();
    }

    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
