/*!
 * Thread Pool Tests
 * Dispatch, backpressure, and shutdown semantics
 */

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};
use syncprim::{SyncError, ThreadPool};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn wait_until(deadline: Duration, check: impl Fn() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    check()
}

#[test]
fn test_all_accepted_tasks_run_exactly_once() {
    init_tracing();
    const TASKS: usize = 100;

    let pool = ThreadPool::new(4, TASKS).unwrap();
    let runs: Arc<Vec<AtomicUsize>> =
        Arc::new((0..TASKS).map(|_| AtomicUsize::new(0)).collect());

    for i in 0..TASKS {
        let runs = runs.clone();
        pool.submit(move || {
            runs[i].fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
    }

    assert!(wait_until(Duration::from_secs(10), || {
        runs.iter().all(|r| r.load(Ordering::Relaxed) == 1)
    }));
    pool.shutdown();

    for (i, r) in runs.iter().enumerate() {
        assert_eq!(r.load(Ordering::Relaxed), 1, "task {i} ran a wrong number of times");
    }
}

#[test]
fn test_workers_run_in_parallel() {
    let pool = ThreadPool::new(4, 16).unwrap();
    // All four tasks must be in flight at once to pass the barrier;
    // fewer live workers would deadlock (and fail via timeout)
    let rendezvous = Arc::new(Barrier::new(4));
    let done = Arc::new(AtomicUsize::new(0));

    for _ in 0..4 {
        let rendezvous = rendezvous.clone();
        let done = done.clone();
        pool.submit(move || {
            rendezvous.wait();
            done.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
    }

    assert!(wait_until(Duration::from_secs(10), || {
        done.load(Ordering::Relaxed) == 4
    }));
    pool.shutdown();
}

#[test]
fn test_full_queue_reports_backpressure() {
    let pool = ThreadPool::new(1, 3).unwrap();

    // Park the only worker in a task so nothing drains the ring
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    pool.submit(move || {
        started_tx.send(()).unwrap();
        release_rx.recv().unwrap();
    })
    .unwrap();
    started_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("worker never picked up the gate task");

    // Fill the ring to capacity
    let done = Arc::new(AtomicUsize::new(0));
    for _ in 0..3 {
        let done = done.clone();
        pool.submit(move || {
            done.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
    }
    assert_eq!(pool.queued(), 3);

    // The overflow submit fails immediately instead of blocking
    let start = Instant::now();
    let overflow = pool.submit(|| {});
    assert!(matches!(overflow, Err(SyncError::QueueFull)));
    assert!(
        start.elapsed() < Duration::from_millis(100),
        "QueueFull took {:?}, submit must not block",
        start.elapsed()
    );

    // Nothing already queued was lost by the refusal
    assert_eq!(pool.queued(), 3);
    release_tx.send(()).unwrap();
    assert!(wait_until(Duration::from_secs(10), || {
        done.load(Ordering::Relaxed) == 3
    }));
    pool.shutdown();
    assert_eq!(done.load(Ordering::Relaxed), 3);
}

#[test]
fn test_shutdown_discards_queued_tasks_without_running_them() {
    let pool = ThreadPool::new(1, 10).unwrap();

    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let gate_runs = Arc::new(AtomicUsize::new(0));
    {
        let gate_runs = gate_runs.clone();
        pool.submit(move || {
            gate_runs.fetch_add(1, Ordering::Relaxed);
            started_tx.send(()).unwrap();
            release_rx.recv().unwrap();
        })
        .unwrap();
    }
    started_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("worker never picked up the gate task");

    let discarded_runs = Arc::new(AtomicUsize::new(0));
    for _ in 0..3 {
        let discarded_runs = discarded_runs.clone();
        pool.submit(move || {
            discarded_runs.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
    }

    // Signal shutdown while the worker is still inside the gate task,
    // then let the task finish; the worker must exit without touching
    // the three queued tasks
    let shutdown = thread::spawn(move || pool.shutdown());
    thread::sleep(Duration::from_millis(500));
    release_tx.send(()).unwrap();
    shutdown.join().unwrap();

    assert_eq!(gate_runs.load(Ordering::Relaxed), 1, "in-flight task must complete");
    assert_eq!(
        discarded_runs.load(Ordering::Relaxed),
        0,
        "tasks queued at shutdown must be discarded, not run"
    );
}

#[test]
fn test_parameter_validation() {
    assert!(matches!(
        ThreadPool::new(0, 8),
        Err(SyncError::BadParameter(_))
    ));
    assert!(matches!(
        ThreadPool::new(1, 0),
        Err(SyncError::BadParameter(_))
    ));
    assert!(matches!(
        ThreadPool::new(100_000, 8),
        Err(SyncError::BadParameter(_))
    ));
    assert!(matches!(
        ThreadPool::new(1, 100_000),
        Err(SyncError::BadParameter(_))
    ));
}

#[test]
fn test_drop_joins_workers() {
    let done = Arc::new(AtomicUsize::new(0));
    {
        let pool = ThreadPool::new(2, 8).unwrap();
        for _ in 0..4 {
            let done = done.clone();
            pool.submit(move || {
                done.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();
        }
        assert!(wait_until(Duration::from_secs(10), || {
            done.load(Ordering::Relaxed) == 4
        }));
        // Implicit drop here must join cleanly
    }
    assert_eq!(done.load(Ordering::Relaxed), 4);
}
