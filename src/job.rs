//! Job definitions and execution logic.
//!
//! A job owns its work as a boxed closure; whatever data the work operates
//! on is captured inside the closure, so the queue stays homogeneous. The
//! `waited` flag marks jobs that are tracked by the pool-wide pending
//! counter and therefore awaited by [`JobManager::wait`].
//!
//! [`JobManager::wait`]: crate::JobManager::wait

/// A unit of work to be executed by the job system.
///
/// Jobs are created at submission time, moved into the queue by value and
/// consumed exactly once by whichever thread dequeues them.
pub struct Job {
    work: Box<dyn FnOnce() + Send + 'static>,
    waited: bool,
}

impl Job {
    /// Creates a tracked job. Its completion is counted by the pool's
    /// pending counter, which is what `wait` blocks on.
    pub fn waited<F>(work: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Job {
            work: Box::new(work),
            waited: true,
        }
    }

    /// Creates an untracked job that reports completion through `on_done`
    /// instead of the pending counter. `on_done` runs strictly after `work`
    /// returns, on the thread that executed the job.
    pub fn signaling<F, D>(work: F, on_done: D) -> Self
    where
        F: FnOnce() + Send + 'static,
        D: FnOnce() + Send + 'static,
    {
        Job {
            work: Box::new(move || {
                work();
                on_done();
            }),
            waited: false,
        }
    }

    /// True if this job is counted by the pending counter.
    pub fn is_waited(&self) -> bool {
        self.waited
    }

    /// Runs the job, consuming it.
    pub fn run(self) {
        (self.work)();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[test]
    fn job_runs_its_work() {
        let executed = Arc::new(AtomicBool::new(false));
        let executed_clone = executed.clone();

        let job = Job::waited(move || {
            executed_clone.store(true, Ordering::SeqCst);
        });

        assert!(job.is_waited());
        job.run();
        assert!(executed.load(Ordering::SeqCst));
    }

    #[test]
    fn signaling_job_is_untracked() {
        let job = Job::signaling(|| {}, || {});
        assert!(!job.is_waited());
    }

    #[test]
    fn on_done_runs_after_work() {
        let order = Arc::new(AtomicUsize::new(0));

        let work_order = order.clone();
        let done_order = order.clone();
        let job = Job::signaling(
            move || {
                // First to observe the counter.
                assert_eq!(work_order.fetch_add(1, Ordering::SeqCst), 0);
            },
            move || {
                assert_eq!(done_order.fetch_add(1, Ordering::SeqCst), 1);
            },
        );

        job.run();
        assert_eq!(order.load(Ordering::SeqCst), 2);
    }
}
