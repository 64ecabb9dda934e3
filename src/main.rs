use jobmill::{CountSplitter, JobManager, ParallelSliceMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("jobmill - Thread-Pool Job System\n");

    let jobs = JobManager::init();
    println!(
        "Initialized job manager with {} worker threads\n",
        jobs.worker_count()
    );

    // Example 1: a single job and the wait barrier
    println!("Example 1: Simple job execution");
    jobs.add_job(|| {
        println!("  Hello from the pool!");
    });
    jobs.wait();
    println!("  Job completed\n");

    // Example 2: parallel fan-out
    println!("Example 2: Parallel computation");
    let sum = Arc::new(AtomicUsize::new(0));
    let num_jobs = 100;

    let start = Instant::now();
    for i in 0..num_jobs {
        let sum_clone = sum.clone();
        jobs.add_job(move || {
            // Simulate some work
            let mut _local_sum = 0;
            for j in 0..1000 {
                _local_sum += j;
            }
            sum_clone.fetch_add(i, Ordering::SeqCst);
        });
    }
    jobs.wait();

    let duration = start.elapsed();
    let expected_sum: usize = (0..num_jobs).sum();
    println!("  Executed {} jobs in {:?}", num_jobs, duration);
    println!(
        "  Sum result: {} (expected: {})\n",
        sum.load(Ordering::SeqCst),
        expected_sum
    );

    // Example 3: splitting a buffer across the pool
    println!("Example 3: Chunked buffer transform");
    let len = 1 << 20;
    let mut buffer: Vec<f32> = (0..len).map(|i| i as f32).collect();

    let start = Instant::now();
    buffer
        .par_chunks_mut(&jobs)
        .for_each::<CountSplitter<4096>, _>(|chunk| {
            for value in chunk {
                *value = value.sqrt();
            }
        });
    let duration = start.elapsed();
    println!("  Transformed {} floats in {:?}", buffer.len(), duration);
    println!("  buffer[{}] = {:.3}\n", len - 1, buffer[len - 1]);

    // Example 4: a signaling job reporting through a flag
    println!("Example 4: Signaling job");
    let uploaded = Arc::new(AtomicBool::new(false));
    let uploaded_clone = uploaded.clone();
    jobs.add_signaling_job(
        || {
            thread::sleep(Duration::from_millis(50));
        },
        move || uploaded_clone.store(true, Ordering::SeqCst),
    );

    while !uploaded.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(1));
    }
    println!("  Callback fired\n");

    println!("Shutting down...");
    match jobs.release() {
        Ok(()) => println!("Done!"),
        Err(e) => eprintln!("Shutdown error: {}", e),
    }
}
