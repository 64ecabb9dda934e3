//! Worker threads and the state they share with submitters.
//!
//! Every worker runs the same loop: park on the wake gate until work
//! arrives, then drain the queue. Draining happens after every wake and
//! before the shutdown re-check, so jobs still queued when the pool shuts
//! down are flushed rather than dropped. There is no stealing between
//! workers; the one shared queue is the only source of work.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam::queue::SegQueue;
use tracing::{debug, trace, warn};

use crate::gate::WakeGate;
use crate::job::Job;

/// State shared between the workers, the submitting threads and the
/// cooperative drain in [`JobManager::wait`]. Split jobs submit from worker
/// threads, so every field here tolerates concurrent producers.
///
/// [`JobManager::wait`]: crate::JobManager::wait
pub(crate) struct Shared {
    queue: SegQueue<Job>,
    gate: WakeGate,
    running: AtomicBool,
    pending: AtomicUsize,
    #[cfg(feature = "metrics")]
    pub(crate) metrics: crate::metrics::Metrics,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Shared {
            queue: SegQueue::new(),
            gate: WakeGate::new(),
            running: AtomicBool::new(true),
            pending: AtomicUsize::new(0),
            #[cfg(feature = "metrics")]
            metrics: crate::metrics::Metrics::new(),
        }
    }

    /// Enqueues a job and wakes the pool. For waited jobs the pending count
    /// goes up before the job becomes visible to consumers, so a completion
    /// can never be observed ahead of its submission.
    pub(crate) fn submit(&self, job: Job) {
        let waited = job.is_waited();
        if waited {
            self.pending.fetch_add(1, Ordering::SeqCst);
        }
        #[cfg(feature = "metrics")]
        if waited {
            self.metrics.jobs_submitted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.metrics.signaling_submitted.fetch_add(1, Ordering::Relaxed);
        }
        self.queue.push(job);
        self.gate.open();
    }

    /// Runs one job, updating the pending count for waited jobs.
    pub(crate) fn execute(&self, job: Job) {
        let waited = job.is_waited();
        job.run();
        if waited {
            let prev = self.pending.fetch_sub(1, Ordering::Release);
            debug_assert!(prev != 0, "pending counter underflow");
        }
        #[cfg(feature = "metrics")]
        self.metrics.jobs_executed.fetch_add(1, Ordering::Relaxed);
    }

    /// Pops and runs a single queued job. Returns false when the queue was
    /// empty. This is the cooperative-draining primitive shared by workers,
    /// waiting threads and shutdown.
    pub(crate) fn try_run_queued(&self) -> bool {
        match self.queue.pop() {
            Some(job) => {
                self.execute(job);
                true
            }
            None => false,
        }
    }

    /// Parks the calling worker until the gate opens, closing it first when
    /// the queue is drained and the pool is still running. A gate left open
    /// by shutdown stays open, so late parkers fall straight through to the
    /// `running` re-check in their loop.
    pub(crate) fn park_until_woken(&self) {
        self.gate.park(|| self.queue.is_empty(), || self.is_running());
    }

    pub(crate) fn wake_all(&self) {
        self.gate.open();
    }

    /// The gate reset at the end of `wait()`: close only when the queue is
    /// drained, so leftover untracked jobs still get picked up.
    pub(crate) fn settle_gate(&self) {
        self.gate.close_if(|| self.queue.is_empty());
    }

    pub(crate) fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Waited jobs submitted but not yet completed.
    pub(crate) fn pending_jobs(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }
}

/// A single worker thread.
pub struct Worker {
    id: usize,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawns a worker running the park-drain loop until shutdown.
    ///
    /// Thread creation failure is a fatal startup condition, not a
    /// recoverable error.
    pub(crate) fn new(id: usize, shared: Arc<Shared>, pin_to_core: bool) -> Self {
        let handle = thread::Builder::new()
            .name(format!("jobmill-worker-{id}"))
            .spawn(move || {
                // Pin to a core for cache locality when asked to.
                if pin_to_core {
                    if let Some(core_ids) = core_affinity::get_core_ids() {
                        if let Some(core) = core_ids.get(id) {
                            core_affinity::set_for_current(*core);
                        }
                    }
                }

                Worker::run_loop(id, &shared);
            })
            .expect("failed to spawn worker thread");

        Worker {
            id,
            handle: Some(handle),
        }
    }

    /// Main execution loop. The drain sits between the wake and the
    /// `running` re-check: a shutdown wake therefore flushes the queue
    /// before the worker exits.
    fn run_loop(id: usize, shared: &Shared) {
        trace!(worker = id, "worker started");
        while shared.is_running() {
            shared.park_until_woken();
            while shared.try_run_queued() {}
        }
        trace!(worker = id, "worker exiting");
    }

    /// Returns the worker's ID.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Waits for the worker thread to finish.
    pub(crate) fn join(mut self) -> thread::Result<()> {
        match self.handle.take() {
            Some(handle) => handle.join(),
            None => Ok(()),
        }
    }
}

/// A fixed pool of worker threads sharing one queue.
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Vec<Worker>,
}

impl WorkerPool {
    /// Spawns `threads` workers. Zero is legal: such a pool runs everything
    /// inside the cooperative drains of `wait` and shutdown.
    pub(crate) fn new(threads: usize, pin_workers: bool) -> Self {
        let shared = Arc::new(Shared::new());
        debug!(threads, "starting worker threads");

        let workers = (0..threads)
            .map(|id| Worker::new(id, Arc::clone(&shared), pin_workers))
            .collect();

        WorkerPool { shared, workers }
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }

    /// Returns the number of worker threads in the pool.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Flushes the queue on the calling thread, signals shutdown and joins
    /// every worker. Returns how many workers panicked. Safe to call twice;
    /// the second call finds nothing to join.
    pub(crate) fn shutdown(&mut self) -> usize {
        self.shared.wake_all();
        while self.shared.try_run_queued() {}
        self.shared.stop();
        self.shared.wake_all();

        let mut panicked = 0;
        for worker in self.workers.drain(..) {
            let id = worker.id();
            if worker.join().is_err() {
                panicked += 1;
                warn!(worker = id, "worker thread panicked");
            }
        }
        panicked
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn pool_spawns_requested_workers() {
        let pool = WorkerPool::new(4, false);
        assert_eq!(pool.size(), 4);
    }

    #[test]
    fn submitted_jobs_execute() {
        let pool = WorkerPool::new(2, false);
        let counter = Arc::new(AtomicUsize::new(0));

        let num_jobs = 10;
        for _ in 0..num_jobs {
            let counter_clone = counter.clone();
            pool.shared().submit(Job::waited(move || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
            }));
        }

        // Poll instead of wait(): this level has no barrier yet.
        let start = std::time::Instant::now();
        while counter.load(Ordering::SeqCst) != num_jobs {
            assert!(start.elapsed() < Duration::from_secs(5), "jobs never ran");
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(pool.shared().pending_jobs(), 0);
    }

    #[test]
    fn shutdown_flushes_queued_jobs() {
        // No workers: the flush in shutdown is the only thing that can run
        // this job.
        let mut pool = WorkerPool::new(0, false);
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = ran.clone();

        pool.shared()
            .submit(Job::signaling(move || ran_clone.store(true, Ordering::SeqCst), || {}));

        assert_eq!(pool.shutdown(), 0);
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn workers_park_and_rewake() {
        let pool = WorkerPool::new(1, false);
        let counter = Arc::new(AtomicUsize::new(0));

        // Two rounds with an idle gap in between: the worker must close the
        // gate, sleep and wake again for the second round.
        for round in 1..=2 {
            let counter_clone = counter.clone();
            pool.shared().submit(Job::waited(move || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
            }));

            let start = std::time::Instant::now();
            while counter.load(Ordering::SeqCst) != round {
                assert!(start.elapsed() < Duration::from_secs(5), "round {round} stalled");
                thread::sleep(Duration::from_millis(5));
            }
            thread::sleep(Duration::from_millis(20));
        }
    }
}
