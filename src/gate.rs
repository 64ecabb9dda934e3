//! Wake gate used to park idle workers.
//!
//! A boolean guarded by a mutex, paired with a condition variable. The gate
//! only affects liveness: correctness comes from the queue and the pending
//! counter. Opening the gate wakes every parked worker; a worker that finds
//! the queue drained closes the gate behind itself before going back to
//! sleep, so an idle pool does not spin. Once shutdown has been signaled
//! the gate stays open for good, so a worker arriving late can never close
//! it and sleep through the final wake.

use std::sync::{Condvar, Mutex};

pub(crate) struct WakeGate {
    has_work: Mutex<bool>,
    wake: Condvar,
}

impl WakeGate {
    pub(crate) fn new() -> Self {
        WakeGate {
            has_work: Mutex::new(false),
            wake: Condvar::new(),
        }
    }

    /// Opens the gate and wakes every parked thread. Called on submission,
    /// on `wait()` entry and on shutdown.
    pub(crate) fn open(&self) {
        let mut has_work = self.has_work.lock().unwrap();
        *has_work = true;
        self.wake.notify_all();
    }

    /// Parks the calling worker until the gate is open.
    ///
    /// When the gate is already open, `queue_idle` decides what happens: if
    /// it reports remaining work the call returns immediately, otherwise the
    /// worker closes the gate and sleeps. Both predicates run under the gate
    /// mutex, which linearizes closing against `open`: a producer either
    /// pushed before we look (we see the job and return) or opens after we
    /// close (the flag ends up true and the wait falls through). A job can
    /// never be stranded behind a closing gate.
    ///
    /// `running` guards the close the same way: shutdown stores its flag
    /// before the final `open()`, so a worker that takes the mutex after
    /// that wake observes `running() == false` here and returns with the
    /// gate still open instead of closing it and sleeping through a wake
    /// that will never come again.
    pub(crate) fn park<F, R>(&self, queue_idle: F, running: R)
    where
        F: Fn() -> bool,
        R: Fn() -> bool,
    {
        let mut has_work = self.has_work.lock().unwrap();
        if *has_work {
            if !queue_idle() || !running() {
                return;
            }
            *has_work = false;
        }
        while !*has_work {
            has_work = self.wake.wait(has_work).unwrap();
        }
    }

    /// Closes the gate if `queue_idle` holds, with the same linearization
    /// argument as [`park`](Self::park). Used by `wait()` on exit; leftover
    /// untracked jobs keep the gate open so workers finish them.
    pub(crate) fn close_if<F>(&self, queue_idle: F)
    where
        F: Fn() -> bool,
    {
        let mut has_work = self.has_work.lock().unwrap();
        if queue_idle() {
            *has_work = false;
        }
    }
}
