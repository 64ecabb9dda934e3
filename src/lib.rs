//! # jobmill - Thread-Pool Job System for Engine Workloads
//!
//! A lightweight job system for CPU-bound engine work: submit closures as
//! jobs, split slices into parallel subranges, and block on a barrier that
//! helps drain the queue instead of idling. The design follows the classic
//! game-engine job manager: one shared queue, a fixed pool of workers, and
//! an atomic counter as the only completion state.
//!
//! ## Architecture
//!
//! - **Jobs**: boxed closures, either *waited* (tracked by the pending
//!   counter) or *signaling* (untracked, reporting through a callback)
//! - **Job Queue**: one lock-free MPMC queue shared by every worker
//! - **Wake Gate**: a mutex and condvar pair that parks idle workers
//! - **Workers**: OS threads that drain the queue until shutdown
//!
//! ## Example
//!
//! ```no_run
//! use jobmill::JobManager;
//!
//! let jobs = JobManager::init();
//!
//! jobs.add_job(|| {
//!     println!("hello from the pool");
//! });
//!
//! jobs.wait();
//! jobs.release().unwrap();
//! ```

mod gate;

pub mod iter;
pub mod job;
pub mod job_manager;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod splitter;
pub mod worker;

use thiserror::Error;

/// Errors surfaced when tearing a [`JobManager`] down.
#[derive(Debug, Error)]
pub enum JobError {
    /// One or more workers died executing a panicking job. Queued jobs
    /// were still flushed; only the jobs that took down their workers are
    /// lost.
    #[error("{count} worker thread(s) panicked during execution")]
    WorkerPanicked { count: usize },
}

pub use iter::ParallelSliceMut;
pub use job::Job;
pub use job_manager::{JobManager, PoolConfig};
pub use splitter::{CountSplitter, DataSizeSplitter, Splitter};
