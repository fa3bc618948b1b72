//! Per-call speaking state
//!
//! Two states, `Idle` and `Speaking`, switched only by compare-and-swap. The
//! speaker holds a [`SpeakingGuard`] that returns the state to `Idle` on drop
//! unless barge-in already did. Each speaking period carries an owner tag so
//! a stale guard can never clear a newer period.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

const IDLE: u64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaking {
    Idle,
    Speaking,
}

#[derive(Debug, Default)]
pub struct SpeakingState {
    owner: AtomicU64,
    next_owner: AtomicU64,
    interrupted: Notify,
}

impl SpeakingState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn get(&self) -> Speaking {
        if self.owner.load(Ordering::Acquire) == IDLE {
            Speaking::Idle
        } else {
            Speaking::Speaking
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.get() == Speaking::Speaking
    }

    /// `Idle → Speaking`. `None` if someone is already speaking.
    pub fn try_begin(self: &Arc<Self>) -> Option<SpeakingGuard> {
        let tag = self.next_owner.fetch_add(1, Ordering::Relaxed) + 1;
        self.owner
            .compare_exchange(IDLE, tag, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SpeakingGuard {
                state: self.clone(),
                tag,
            })
    }

    /// `Speaking → Idle`. Returns whether this call performed the transition.
    pub fn interrupt(&self) -> bool {
        let current = self.owner.load(Ordering::Acquire);
        if current == IDLE {
            return false;
        }
        let swapped = self
            .owner
            .compare_exchange(current, IDLE, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if swapped {
            self.interrupted.notify_waiters();
        }
        swapped
    }
}

/// Ownership of one speaking period
#[derive(Debug)]
pub struct SpeakingGuard {
    state: Arc<SpeakingState>,
    tag: u64,
}

impl SpeakingGuard {
    /// Whether this period is still the active one
    pub fn is_current(&self) -> bool {
        self.state.owner.load(Ordering::Acquire) == self.tag
    }

    /// Resolves once this period has been interrupted
    pub async fn interrupted(&self) {
        loop {
            let notified = self.state.interrupted.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if !self.is_current() {
                return;
            }
            notified.await;
        }
    }
}

impl Drop for SpeakingGuard {
    fn drop(&mut self) {
        let _ = self.state.owner.compare_exchange(
            self.tag,
            IDLE,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}
