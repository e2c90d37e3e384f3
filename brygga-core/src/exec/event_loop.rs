//! Run-to-completion action executor.
//!
//! All bridge state is owned by the loop thread: other threads only ever
//! enqueue actions via `post`, or park on a completion channel that an
//! action fulfils (`post_wait`). The loop drains the queue in FIFO order and
//! terminates once the queue is empty and no indefinite async work is
//! registered.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use concurrent_queue::ConcurrentQueue;
use crossbeam::channel::{self, RecvTimeoutError};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::ExecError;
use crate::exec::cancel::CancelSignal;

/// An opaque unit of work, queued and run exactly once on the loop thread.
pub type Action = Box<dyn FnOnce() + Send + 'static>;

/// Backoff while the queue is empty but async work keeps the loop alive.
const IDLE_BACKOFF: Duration = Duration::from_millis(1);

pub struct EventLoop {
    queue: ConcurrentQueue<Action>,
    pending_async: AtomicUsize,
    cancel: CancelSignal,
    loop_thread: OnceCell<ThreadId>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop {
    pub fn new() -> Self {
        Self {
            queue: ConcurrentQueue::unbounded(),
            pending_async: AtomicUsize::new(0),
            cancel: CancelSignal::new(),
            loop_thread: OnceCell::new(),
            handle: Mutex::new(None),
        }
    }

    /// Enqueues an action for execution on the loop thread.
    ///
    /// Callable from any thread; never blocks. Actions posted after the loop
    /// has drained are dropped with a warning.
    pub fn post<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.queue.push(Box::new(action)).is_err() {
            warn!("action dropped: event loop already stopped");
        }
    }

    /// Posts `action` together with a completion channel and blocks until the
    /// loop thread has run it, preserving happens-before for the caller.
    pub fn post_wait<R, F>(&self, action: F) -> Result<R, ExecError>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let (tx, rx) = channel::bounded(1);
        self.post(move || {
            let _ = tx.send(action());
        });
        rx.recv().map_err(|_| ExecError::LoopGone)
    }

    /// Same as [`post_wait`](Self::post_wait) with a deadline for the caller.
    ///
    /// A timeout only unblocks the caller; the action itself still runs (or
    /// stays queued) on the loop thread.
    pub fn post_wait_timeout<R, F>(&self, action: F, timeout: Duration) -> Result<R, ExecError>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let (tx, rx) = channel::bounded(1);
        self.post(move || {
            let _ = tx.send(action());
        });
        rx.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => ExecError::Timeout,
            RecvTimeoutError::Disconnected => ExecError::LoopGone,
        })
    }

    /// Registers one unit of indefinite async work and hands out the
    /// cancellation signal it must observe.
    ///
    /// The loop will not terminate until a matching `end_async_action`.
    pub fn begin_async_action(&self) -> CancelSignal {
        self.pending_async.fetch_add(1, Ordering::SeqCst);
        self.cancel.clone()
    }

    pub fn end_async_action(&self) {
        let previous = self.pending_async.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(previous > 0, "unbalanced end_async_action");
    }

    /// Sets the cancellation signal. Idempotent.
    ///
    /// Cancellation does not stop the loop by itself: async holders observe
    /// the signal, run their teardown and release their registration, which
    /// lets the loop drain naturally.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    /// Spawns the loop thread.
    pub fn run(self: &Arc<Self>) -> Result<(), ExecError> {
        let me = Arc::clone(self);
        let handle = thread::Builder::new()
            .name("brygga-event-loop".into())
            .spawn(move || me.drive())?;
        *self.handle.lock() = Some(handle);
        Ok(())
    }

    /// Blocks until the loop thread has terminated.
    pub fn join(&self) {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    /// Runs at most one queued action inline on the calling thread.
    ///
    /// Returns whether an action ran. Must not be mixed with a spawned
    /// `run`; it exists for embedders that own the driving thread.
    pub fn run_one(&self) -> bool {
        match self.queue.pop() {
            Ok(action) => {
                action();
                true
            }
            Err(_) => false,
        }
    }

    /// Runs queued actions inline until the queue is empty.
    pub fn run_until_idle(&self) {
        while self.run_one() {}
    }

    /// Debug-only invariant check for handlers that must not run
    /// concurrently with other state mutation.
    pub fn assert_loop_thread(&self) {
        if let Some(id) = self.loop_thread.get() {
            debug_assert_eq!(
                *id,
                thread::current().id(),
                "must run on the event loop thread"
            );
        }
    }

    fn drive(&self) {
        let _ = self.loop_thread.set(thread::current().id());
        info!("event loop started");
        loop {
            match self.queue.pop() {
                Ok(action) => action(),
                Err(_) => {
                    if self.pending_async.load(Ordering::SeqCst) == 0 {
                        break;
                    }
                    thread::sleep(IDLE_BACKOFF);
                }
            }
        }
        // Late posts must not strand a post_wait caller: closing the queue
        // drops their completion senders.
        self.queue.close();
        while self.queue.pop().is_ok() {}
        debug!("event loop drained");
    }
}
