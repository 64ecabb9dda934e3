//! The public face of the crate: configure a pool, submit jobs, split
//! ranges over data, wait for completion, shut down.
//!
//! A [`JobManager`] owns its worker pool. Waited jobs are tracked by a
//! shared pending counter; [`JobManager::wait`] blocks until that counter
//! reaches zero, running queued jobs itself instead of idling. Signaling
//! jobs are invisible to `wait` and report completion through their own
//! callback instead.

use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};

use crate::JobError;
use crate::job::Job;
use crate::splitter::Splitter;
use crate::worker::{Shared, WorkerPool};

/// Pool sizing and placement.
///
/// The default derives the worker count from the machine and reserves two
/// cores for the threads an engine typically runs outside the pool, such
/// as the main and render threads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Exact worker count. `None` derives one from the core count.
    pub worker_threads: Option<usize>,
    /// Cores subtracted from the derived count. Ignored when
    /// `worker_threads` is set.
    pub reserved_cores: usize,
    /// Pin each worker to its own core.
    pub pin_workers: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            worker_threads: None,
            reserved_cores: 2,
            pin_workers: false,
        }
    }
}

impl PoolConfig {
    /// Only machines with more cores than the reservation give any up;
    /// small machines keep one worker per core rather than dropping to
    /// zero or one.
    fn resolve_threads(&self) -> usize {
        match self.worker_threads {
            Some(threads) => threads,
            None => {
                let cpus = num_cpus::get();
                if cpus > self.reserved_cores {
                    cpus - self.reserved_cores
                } else {
                    cpus
                }
            }
        }
    }
}

/// A job queue with a fixed pool of worker threads behind it.
pub struct JobManager {
    pool: WorkerPool,
}

impl JobManager {
    /// Starts a manager with the default [`PoolConfig`].
    pub fn init() -> Self {
        Self::with_config(PoolConfig::default())
    }

    /// Starts a manager with exactly `threads` workers. Zero is legal:
    /// jobs then run inside [`wait`](Self::wait) and
    /// [`release`](Self::release) on the calling thread.
    pub fn with_threads(threads: usize) -> Self {
        Self::with_config(PoolConfig {
            worker_threads: Some(threads),
            ..PoolConfig::default()
        })
    }

    pub fn with_config(config: PoolConfig) -> Self {
        let threads = config.resolve_threads();
        JobManager {
            pool: WorkerPool::new(threads, config.pin_workers),
        }
    }

    /// Submits a job tracked by [`wait`](Self::wait). Returns as soon as
    /// the job is queued.
    pub fn add_job<F>(&self, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.shared().submit(Job::waited(work));
    }

    /// Submits a job that [`wait`](Self::wait) ignores. `on_done` runs on
    /// the executing thread right after `work` finishes; polling a flag it
    /// sets is the only way to observe completion.
    pub fn add_signaling_job<F, D>(&self, work: F, on_done: D)
    where
        F: FnOnce() + Send + 'static,
        D: FnOnce() + Send + 'static,
    {
        self.pool.shared().submit(Job::signaling(work, on_done));
    }

    /// Recursively splits `[data, data + count)` and runs `func` on each
    /// leaf subrange as its own job. `S` decides when a range is small
    /// enough; halving rounds the left side down. Returns once the root is
    /// queued, not when the work is done; call [`wait`](Self::wait) for
    /// that. A `count` of zero produces a single leaf with length zero.
    ///
    /// # Safety
    ///
    /// `data` must point to `count` consecutive initialized `T` and stay
    /// valid, and unaliased by anything else, until a following
    /// [`wait`](Self::wait) returns. Prefer
    /// [`par_chunks_mut`](crate::ParallelSliceMut::par_chunks_mut), which
    /// scopes the borrow for you.
    pub unsafe fn parallel_for<S, T, F>(&self, data: *mut T, count: usize, func: F)
    where
        S: Splitter + 'static,
        T: Send + 'static,
        F: Fn(*mut T, usize) + Send + Sync + 'static,
    {
        split_range::<S, T, F>(self.pool.shared(), &Arc::new(func), RawMem(data), count);
    }

    /// Blocks until every waited job has completed, draining the queue on
    /// the calling thread while it does. Signaling jobs do not hold this
    /// up, but one that happens to be queued may be drained here and have
    /// its callback run on the waiting thread.
    pub fn wait(&self) {
        let shared = self.pool.shared();
        shared.wake_all();
        while shared.pending_jobs() != 0 {
            if shared.try_run_queued() {
                #[cfg(feature = "metrics")]
                shared
                    .metrics
                    .drained_in_wait
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            } else {
                // Queue empty but jobs still in flight on the workers.
                thread::yield_now();
            }
        }
        shared.settle_gate();
    }

    /// Shuts the pool down: flushes every queued job on the calling
    /// thread, then joins the workers. Errs when any worker thread
    /// panicked during the manager's lifetime. Dropping the manager
    /// without calling this performs the same shutdown but swallows the
    /// verdict.
    pub fn release(mut self) -> Result<(), JobError> {
        match self.pool.shutdown() {
            0 => Ok(()),
            count => Err(JobError::WorkerPanicked { count }),
        }
    }

    /// Returns the number of worker threads in the pool.
    pub fn worker_count(&self) -> usize {
        self.pool.size()
    }

    /// Waited jobs submitted but not yet completed.
    pub fn pending_jobs(&self) -> usize {
        self.pool.shared().pending_jobs()
    }

    /// Counters since startup. Zero-cost unless the `metrics` feature is
    /// enabled.
    #[cfg(feature = "metrics")]
    pub fn metrics(&self) -> crate::metrics::MetricsSnapshot {
        self.pool.shared().metrics.snapshot()
    }
}

/// A raw base pointer that may cross into a job. The split tree hands out
/// disjoint subranges, so sending the pointer is sound whenever `T` itself
/// can move between threads; the caller of `parallel_for` vouches for the
/// allocation staying alive.
struct RawMem<T>(*mut T);

unsafe impl<T: Send> Send for RawMem<T> {}

impl<T> Copy for RawMem<T> {}

impl<T> Clone for RawMem<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> RawMem<T> {
    /// # Safety
    ///
    /// `count` must stay within the allocation this pointer came from.
    unsafe fn offset(self, count: usize) -> Self {
        RawMem(unsafe { self.0.add(count) })
    }

    /// By-value accessor. Closures must go through this rather than name
    /// the field: a `data.0` in a closure body captures only the bare
    /// pointer, which sidesteps the `Send` impl on the wrapper.
    fn ptr(self) -> *mut T {
        self.0
    }
}

/// One node of the split tree. Interior nodes are jobs too, so the
/// splitting itself spreads across the pool instead of serializing on the
/// submitting thread.
fn split_range<S, T, F>(shared: &Arc<Shared>, func: &Arc<F>, data: RawMem<T>, count: usize)
where
    S: Splitter + 'static,
    T: Send + 'static,
    F: Fn(*mut T, usize) + Send + Sync + 'static,
{
    if S::should_split(count) {
        #[cfg(feature = "metrics")]
        shared
            .metrics
            .splits
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        let shared_clone = Arc::clone(shared);
        let func = Arc::clone(func);
        shared.submit(Job::waited(move || {
            let left = count / 2;
            let right = count - left;
            split_range::<S, T, F>(&shared_clone, &func, data, left);
            // In bounds: left <= count, and data spans count elements.
            let upper = unsafe { data.offset(left) };
            split_range::<S, T, F>(&shared_clone, &func, upper, right);
        }));
    } else {
        let func = Arc::clone(func);
        shared.submit(Job::waited(move || (*func)(data.ptr(), count)));
    }
}
