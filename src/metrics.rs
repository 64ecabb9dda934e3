#[cfg(feature = "metrics")]
use std::sync::atomic::{AtomicU64, Ordering};
#[cfg(feature = "metrics")]
use std::time::Instant;

/// Optional counters for the job manager. Updated with relaxed atomics on
/// the hot paths, so the numbers are approximate while work is in flight
/// and exact once the pool is quiet.
#[cfg(feature = "metrics")]
#[derive(Debug)]
pub struct Metrics {
    /// Waited jobs submitted.
    pub jobs_submitted: AtomicU64,
    /// Signaling jobs submitted.
    pub signaling_submitted: AtomicU64,
    /// Jobs of either kind that finished executing.
    pub jobs_executed: AtomicU64,
    /// Range splits performed by `parallel_for`.
    pub splits: AtomicU64,
    /// Jobs executed by threads inside `wait` rather than by workers.
    pub drained_in_wait: AtomicU64,
    /// Time when metrics collection started.
    pub start_time: Instant,
}

#[cfg(feature = "metrics")]
impl Metrics {
    pub fn new() -> Self {
        Self {
            jobs_submitted: AtomicU64::new(0),
            signaling_submitted: AtomicU64::new(0),
            jobs_executed: AtomicU64::new(0),
            splits: AtomicU64::new(0),
            drained_in_wait: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Returns a snapshot of current counter values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            jobs_submitted: self.jobs_submitted.load(Ordering::Relaxed),
            signaling_submitted: self.signaling_submitted.load(Ordering::Relaxed),
            jobs_executed: self.jobs_executed.load(Ordering::Relaxed),
            splits: self.splits.load(Ordering::Relaxed),
            drained_in_wait: self.drained_in_wait.load(Ordering::Relaxed),
            elapsed_seconds: self.start_time.elapsed().as_secs_f64(),
        }
    }
}

#[cfg(feature = "metrics")]
impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of the counters at a point in time.
#[cfg(feature = "metrics")]
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub jobs_submitted: u64,
    pub signaling_submitted: u64,
    pub jobs_executed: u64,
    pub splits: u64,
    pub drained_in_wait: u64,
    pub elapsed_seconds: f64,
}

#[cfg(feature = "metrics")]
impl MetricsSnapshot {
    /// Jobs per second since startup.
    pub fn jobs_per_second(&self) -> f64 {
        if self.elapsed_seconds > 0.0 {
            self.jobs_executed as f64 / self.elapsed_seconds
        } else {
            0.0
        }
    }

    /// Approximates queue depth (submissions minus executions).
    pub fn queue_depth(&self) -> i64 {
        (self.jobs_submitted + self.signaling_submitted) as i64 - self.jobs_executed as i64
    }
}
