//! Level-triggered cancellation signal.
//!
//! Once set the flag is never cleared. Holders observe it either by polling
//! `is_cancelled` at suspension points or by parking on `wait`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    lock: Mutex<()>,
    cond: Condvar,
}

/// Shared, clonable cancellation flag with condvar-based waiting.
#[derive(Clone, Default)]
pub struct CancelSignal {
    inner: Arc<Inner>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag. Idempotent; wakes every parked waiter.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            let _guard = self.inner.lock.lock();
            self.inner.cond.notify_all();
        }
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Parks the calling thread until the signal is set.
    pub fn wait(&self) {
        let mut guard = self.inner.lock.lock();
        while !self.is_cancelled() {
            self.inner.cond.wait(&mut guard);
        }
    }

    /// Parks until the signal is set or `timeout` elapses.
    ///
    /// Returns whether the signal is set.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.inner.lock.lock();
        while !self.is_cancelled() {
            if self
                .inner
                .cond
                .wait_until(&mut guard, deadline)
                .timed_out()
            {
                break;
            }
        }
        self.is_cancelled()
    }
}
