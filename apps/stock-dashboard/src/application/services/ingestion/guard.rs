//! Per-symbol in-flight guard implementing skip-if-busy.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Marks whether a tick for one symbol is in flight.
///
/// A single flag, not a queue: a tick that cannot acquire the guard is
/// dropped rather than deferred.
#[derive(Debug, Clone, Default)]
pub struct InFlightGuard {
    busy: Arc<AtomicBool>,
}

impl InFlightGuard {
    /// Create an idle guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to start a tick. Returns `None` while another tick holds a permit.
    #[must_use]
    pub fn try_begin(&self) -> Option<InFlightPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightPermit {
                busy: Arc::clone(&self.busy),
            })
    }
}

/// Held for the duration of one tick; releases the guard on drop, including
/// when the tick task is cancelled or panics.
#[derive(Debug)]
pub struct InFlightPermit {
    busy: Arc<AtomicBool>,
}

impl Drop for InFlightPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
