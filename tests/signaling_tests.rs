use jobmill::JobManager;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_callback_fires_without_any_wait() {
    let jobs = JobManager::with_threads(2);
    let fired = Arc::new(AtomicBool::new(false));
    let fired_clone = fired.clone();

    // Nobody ever calls wait(); the pool must still pick this up.
    jobs.add_signaling_job(|| {}, move || fired_clone.store(true, Ordering::SeqCst));

    let start = Instant::now();
    while !fired.load(Ordering::SeqCst) {
        assert!(
            start.elapsed() < Duration::from_secs(5),
            "callback never fired"
        );
        thread::sleep(Duration::from_millis(1));
    }
    jobs.release().expect("release failed");
}

#[test]
fn test_callback_runs_after_the_work() {
    let jobs = JobManager::with_threads(1);
    let value = Arc::new(AtomicUsize::new(0));
    let seen_by_callback = Arc::new(AtomicUsize::new(usize::MAX));

    let value_work = value.clone();
    let value_cb = value.clone();
    let seen = seen_by_callback.clone();
    jobs.add_signaling_job(
        move || value_work.store(42, Ordering::SeqCst),
        move || seen.store(value_cb.load(Ordering::SeqCst), Ordering::SeqCst),
    );

    let start = Instant::now();
    while seen_by_callback.load(Ordering::SeqCst) == usize::MAX {
        assert!(
            start.elapsed() < Duration::from_secs(5),
            "callback never fired"
        );
        thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(seen_by_callback.load(Ordering::SeqCst), 42);
    jobs.release().expect("release failed");
}

#[test]
fn test_idle_wait_leaves_queued_signaling_jobs_alone() {
    // No workers and no pending waited jobs: wait() has nothing to drain
    // for, so the signaling job stays queued until shutdown flushes it.
    let jobs = JobManager::with_threads(0);
    let fired = Arc::new(AtomicBool::new(false));
    let fired_clone = fired.clone();

    jobs.add_signaling_job(|| {}, move || fired_clone.store(true, Ordering::SeqCst));

    jobs.wait();
    assert!(
        !fired.load(Ordering::SeqCst),
        "wait owes signaling jobs nothing"
    );

    jobs.release().expect("release failed");
    assert!(fired.load(Ordering::SeqCst), "release must flush the queue");
}

#[test]
fn test_draining_wait_may_run_signaling_jobs_too() {
    // With a waited job behind it in the queue, the waiting thread drains
    // the signaling job on its way there and runs the callback itself.
    let jobs = JobManager::with_threads(0);
    let fired = Arc::new(AtomicBool::new(false));
    let fired_clone = fired.clone();
    let callback_thread = Arc::new(std::sync::Mutex::new(None));
    let callback_thread_clone = callback_thread.clone();

    jobs.add_signaling_job(
        || {},
        move || {
            fired_clone.store(true, Ordering::SeqCst);
            *callback_thread_clone.lock().unwrap() = Some(thread::current().id());
        },
    );
    jobs.add_job(|| {});

    jobs.wait();

    assert!(fired.load(Ordering::SeqCst));
    assert_eq!(
        *callback_thread.lock().unwrap(),
        Some(thread::current().id())
    );
    jobs.release().expect("release failed");
}
