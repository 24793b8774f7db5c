//! Run control: the single broadcast cancellation signal.
//!
//! Every activity of a run (workers, stop monitor, reporter, orchestrator)
//! holds a clone of the same `CancelSignal`. The first `cancel` wins and
//! records why the run stopped; later calls are no-ops. Waiters blocked in
//! `wait` / `wait_timeout` are all woken at once.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Why a run ended. All of these are successful completions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// SIGINT / SIGTERM from the operator.
    Interrupted,
    /// Configured wall-clock duration elapsed.
    DeadlineReached,
    /// Shared counter reached the byte cap.
    ByteCapReached,
    /// Live received counter caught up with transmitted + offset.
    ParityReached,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::Interrupted => "interrupted",
            StopReason::DeadlineReached => "duration elapsed",
            StopReason::ByteCapReached => "byte cap reached",
            StopReason::ParityReached => "parity reached",
        };
        f.write_str(s)
    }
}

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    reason: Mutex<Option<StopReason>>,
    wake: Condvar,
}

/// Shared, clonable cancellation signal.
#[derive(Clone, Default)]
pub struct CancelSignal {
    inner: Arc<Inner>,
}

impl fmt::Debug for CancelSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelSignal")
            .field("reason", &self.reason())
            .finish()
    }
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the signal. Returns true if this call was the one that raised it.
    pub fn cancel(&self, reason: StopReason) -> bool {
        let mut slot = self.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(reason);
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.wake.notify_all();
        true
    }

    /// Lock-free check for hot paths (curl callbacks).
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    pub fn reason(&self) -> Option<StopReason> {
        *self.lock()
    }

    /// Blocks until the signal is raised.
    pub fn wait(&self) -> StopReason {
        let slot = self
            .inner
            .wake
            .wait_while(self.lock(), |r| r.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        (*slot).unwrap_or(StopReason::Interrupted)
    }

    /// Blocks for at most `timeout`. Returns true if the signal was raised.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (slot, _) = self
            .inner
            .wake
            .wait_timeout_while(self.lock(), timeout, |r| r.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        slot.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<StopReason>> {
        self.inner.reason.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
