//! First-writer-wins submission latch.

use std::sync::atomic::{AtomicBool, Ordering};

/// Guards the one submission network call a session may make.
///
/// Check-and-set is a single atomic compare-exchange, so there is no gap in
/// which a second caller can observe the latch open after the first has
/// committed to submitting.
#[derive(Debug, Default)]
pub struct SubmissionLatch {
    held: AtomicBool,
}

impl SubmissionLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to become the one submitter. Returns `true` for exactly one caller
    /// until [`release`](Self::release) is called.
    pub fn try_acquire(&self) -> bool {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }

    /// Reopen the latch. Only a failed voluntary submission does this; forced
    /// submissions keep it closed regardless of outcome.
    pub fn release(&self) {
        self.held.store(false, Ordering::Release);
    }
}
