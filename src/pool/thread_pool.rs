/*!
 * Thread Pool
 * Fixed worker set over a bounded circular task buffer
 */

use crate::core::errors::{Result, SyncError};
use crate::core::limits::{MAX_POOL_QUEUE_CAPACITY, MAX_POOL_THREADS};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// A queued unit of work
type Task = Box<dyn FnOnce() + Send + 'static>;

/// The circular task buffer and lifecycle flag, all mutated under one
/// mutex
///
/// Invariant: `count` equals the number of `Some` slots between `head`
/// and `tail` (mod capacity) and never exceeds the buffer length.
struct TaskRing {
    slots: Box<[Option<Task>]>,
    head: usize,
    tail: usize,
    count: usize,
    shutdown: bool,
}

impl TaskRing {
    fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots: slots.into_boxed_slice(),
            head: 0,
            tail: 0,
            count: 0,
            shutdown: false,
        }
    }

    fn push(&mut self, task: Task) {
        debug_assert!(self.count < self.slots.len());
        self.slots[self.tail] = Some(task);
        self.tail = (self.tail + 1) % self.slots.len();
        self.count += 1;
    }

    fn pop(&mut self) -> Option<Task> {
        if self.count == 0 {
            return None;
        }
        let task = self.slots[self.head].take();
        self.head = (self.head + 1) % self.slots.len();
        self.count -= 1;
        task
    }
}

/// State shared between the pool handle and its workers
struct Shared {
    ring: Mutex<TaskRing>,
    not_empty: Condvar,
}

/// A fixed-capacity thread pool
///
/// `thread_count` workers drain a circular buffer of `queue_capacity`
/// tasks. Producers and workers coordinate through one mutex and one
/// condition variable; the task body itself always runs outside the
/// lock, so a long task delays nothing but its own worker.
///
/// # Backpressure
///
/// A full buffer fails [`submit`](Self::submit) with
/// [`SyncError::QueueFull`] immediately. The pool never blocks the
/// producer and never grows the buffer; deciding what to do with the
/// overflow belongs to the caller.
///
/// # Shutdown
///
/// [`shutdown`](Self::shutdown) (or dropping the pool) wakes every
/// worker and joins them. A worker finishes the task it already popped;
/// tasks still sitting in the buffer are discarded unrun. There is no
/// drain-before-shutdown contract.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use syncprim::ThreadPool;
///
/// let pool = ThreadPool::new(2, 64).unwrap();
/// let done = Arc::new(AtomicUsize::new(0));
/// for _ in 0..10 {
///     let done = done.clone();
///     pool.submit(move || {
///         done.fetch_add(1, Ordering::Relaxed);
///     })
///     .unwrap();
/// }
/// pool.shutdown();
/// ```
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
    capacity: usize,
}

impl ThreadPool {
    /// Create a pool with `thread_count` workers and a task buffer of
    /// `queue_capacity`
    ///
    /// Both bounds are validated against the fixed maxima in
    /// [`core::limits`](crate::core::limits); zero threads or a zero
    /// capacity are rejected. If any worker fails to spawn, the ones
    /// already running are signaled and joined before the error
    /// returns; no partial pool is ever handed out.
    pub fn new(thread_count: usize, queue_capacity: usize) -> Result<Self> {
        if thread_count == 0 || thread_count > MAX_POOL_THREADS {
            return Err(SyncError::BadParameter(format!(
                "thread_count must be in 1..={MAX_POOL_THREADS}, got {thread_count}"
            )));
        }
        if queue_capacity == 0 || queue_capacity > MAX_POOL_QUEUE_CAPACITY {
            return Err(SyncError::BadParameter(format!(
                "queue_capacity must be in 1..={MAX_POOL_QUEUE_CAPACITY}, got {queue_capacity}"
            )));
        }

        let shared = Arc::new(Shared {
            ring: Mutex::new(TaskRing::with_capacity(queue_capacity)),
            not_empty: Condvar::new(),
        });

        let mut workers = Vec::with_capacity(thread_count);
        for i in 0..thread_count {
            let worker_shared = shared.clone();
            let spawned = thread::Builder::new()
                .name(format!("pool-worker-{i}"))
                .spawn(move || worker_loop(worker_shared));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    warn!(worker = i, %err, "worker spawn failed, rolling back pool");
                    let pool = Self {
                        shared,
                        workers,
                        capacity: queue_capacity,
                    };
                    drop(pool); // joins the workers spawned so far
                    return Err(SyncError::OutOfMemory(format!(
                        "failed to spawn worker thread: {err}"
                    )));
                }
            }
        }

        debug!(
            threads = thread_count,
            capacity = queue_capacity,
            "thread pool started"
        );
        Ok(Self {
            shared,
            workers,
            capacity: queue_capacity,
        })
    }

    /// Queue a task for execution
    ///
    /// Returns [`SyncError::QueueFull`] without blocking when the
    /// buffer is at capacity; already-queued tasks are unaffected.
    pub fn submit<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut ring = self.shared.ring.lock();
        if ring.count == ring.slots.len() {
            return Err(SyncError::QueueFull);
        }
        ring.push(Box::new(task));
        // Signal while still holding the lock, like the buffer update
        self.shared.not_empty.notify_one();
        Ok(())
    }

    /// Number of worker threads
    pub fn thread_count(&self) -> usize {
        self.workers.len()
    }

    /// Task buffer capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tasks currently waiting in the buffer
    ///
    /// Momentary observation; workers may pop concurrently.
    pub fn queued(&self) -> usize {
        self.shared.ring.lock().count
    }

    /// Stop the pool: wake all workers, join them, discard queued tasks
    ///
    /// Equivalent to dropping the pool, as an explicit call site.
    pub fn shutdown(self) {
        // Drop does the work
    }

    fn signal_shutdown_and_join(&mut self) {
        {
            let mut ring = self.shared.ring.lock();
            ring.shutdown = true;
            self.shared.not_empty.notify_all();
        }
        for handle in self.workers.drain(..) {
            // A worker that panicked in a task is already gone; there
            // is nothing useful to do with the panic payload here
            let _ = handle.join();
        }
        debug!("thread pool stopped");
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.signal_shutdown_and_join();
    }
}

/// The worker loop: wait for work or shutdown, pop under the mutex,
/// run outside it
fn worker_loop(shared: Arc<Shared>) {
    loop {
        let task = {
            let mut ring = shared.ring.lock();
            // Loop, not if: condvars wake spuriously
            while ring.count == 0 && !ring.shutdown {
                shared.not_empty.wait(&mut ring);
            }
            if ring.shutdown {
                // Tasks still in the ring are discarded unrun
                return;
            }
            match ring.pop() {
                Some(task) => task,
                // count > 0 was checked under the same lock
                None => unreachable!("nonzero count with no task at head"),
            }
        };
        // The lock is released; a slow task blocks neither producers
        // nor the other workers
        task();
    }
}
