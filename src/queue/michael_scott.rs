/*!
 * Lock-Free MPMC Queue
 * Michael-Scott two-pointer linked queue with epoch-based reclamation
 */

use crossbeam_epoch::{self as epoch, Atomic, Guard, Owned, Shared};
use std::fmt;
use std::mem::MaybeUninit;
use std::sync::atomic::Ordering::{Acquire, Relaxed, Release};

/// Keeps `head` and `tail` on separate cache lines so producers and
/// consumers do not invalidate each other's line on every operation
#[repr(align(64))]
struct CacheAligned<T>(T);

/// A queue node
///
/// The payload is `MaybeUninit` because the node at `head` is always a
/// sentinel whose payload has already been moved out (or, for the
/// initial sentinel, never existed). Node destruction therefore never
/// drops a `T`; payloads are dropped only by `dequeue` callers or the
/// queue's own drain on drop.
struct Node<T> {
    data: MaybeUninit<T>,
    next: Atomic<Node<T>>,
}

/// An unbounded multi-producer multi-consumer FIFO queue
///
/// The Michael-Scott algorithm: a singly linked list with a permanent
/// sentinel node, `head` pointing at the most recently consumed node
/// and `tail` pointing at (or one step behind) the last node. All
/// mutation happens through compare-and-swap on `head`, `tail`, and
/// the `next` links; no locks anywhere.
///
/// # Helping
///
/// `tail` is allowed to lag one node behind the true end of the list
/// between a producer's two steps (link the node, then advance
/// `tail`). Every operation that observes the lag advances `tail`
/// itself before proceeding, so one stalled producer cannot stop the
/// queue.
///
/// # Reclamation
///
/// Only the thread whose compare-and-swap advances `head` past a node
/// retires it, and retirement goes through an epoch guard
/// (`crossbeam-epoch`), so a concurrent dequeuer still holding a stale
/// reference can never touch freed memory.
///
/// # Example
///
/// ```
/// use syncprim::LockFreeQueue;
///
/// let queue = LockFreeQueue::new();
/// queue.enqueue(1);
/// queue.enqueue(2);
/// assert_eq!(queue.dequeue(), Some(1));
/// assert_eq!(queue.dequeue(), Some(2));
/// assert_eq!(queue.dequeue(), None);
/// ```
pub struct LockFreeQueue<T> {
    head: CacheAligned<Atomic<Node<T>>>,
    tail: CacheAligned<Atomic<Node<T>>>,
}

impl<T> LockFreeQueue<T> {
    /// Create an empty queue
    ///
    /// Allocates the permanent sentinel and points both `head` and
    /// `tail` at it, so neither pointer is ever null and the
    /// structurally-empty case needs no special handling.
    pub fn new() -> Self {
        let queue = Self {
            head: CacheAligned(Atomic::null()),
            tail: CacheAligned(Atomic::null()),
        };
        let sentinel = Owned::new(Node {
            data: MaybeUninit::uninit(),
            next: Atomic::null(),
        });
        // Safety: the queue is not shared yet, no other thread can
        // observe these stores
        let sentinel = sentinel.into_shared(unsafe { epoch::unprotected() });
        queue.head.0.store(sentinel, Relaxed);
        queue.tail.0.store(sentinel, Relaxed);
        queue
    }

    /// Append a value at the tail
    ///
    /// Lock-free: a lost race only means another producer's value went
    /// first; this thread retries and eventually links its node.
    pub fn enqueue(&self, value: T) {
        let guard = &epoch::pin();
        let mut new = Owned::new(Node {
            data: MaybeUninit::new(value),
            next: Atomic::null(),
        });

        loop {
            let tail = self.tail.0.load(Acquire, guard);
            // Safety: tail is never null and the epoch guard keeps the
            // node alive while we hold this snapshot
            let next = unsafe { tail.deref() }.next.load(Acquire, guard);

            // The snapshot is stale if tail moved since we read it;
            // start over rather than operate on a retired node
            if tail != self.tail.0.load(Relaxed, guard) {
                continue;
            }

            // A linked-but-not-advanced node means another producer is
            // mid-enqueue; advance tail for it, then retry
            if !next.is_null() {
                let _ = self.tail.0.compare_exchange(tail, next, Release, Relaxed, guard);
                continue;
            }

            // Link our node after the current last node
            match unsafe { tail.deref() }.next.compare_exchange(
                Shared::null(),
                new,
                Release,
                Relaxed,
                guard,
            ) {
                Ok(linked) => {
                    // Best effort: if this fails, the next operation's
                    // helping step advances tail instead
                    let _ = self
                        .tail
                        .0
                        .compare_exchange(tail, linked, Release, Relaxed, guard);
                    return;
                }
                Err(err) => {
                    // Another producer won the link race; take our
                    // allocation back and retry
                    new = err.new;
                }
            }
        }
    }

    /// Remove and return the value at the head
    ///
    /// Returns `None` when the queue is empty. Never blocks; an empty
    /// queue is a normal result, not an error.
    pub fn dequeue(&self) -> Option<T> {
        let guard = &epoch::pin();
        self.pop_with(guard)
    }

    fn pop_with(&self, guard: &Guard) -> Option<T> {
        loop {
            let head = self.head.0.load(Acquire, guard);
            let tail = self.tail.0.load(Acquire, guard);
            // Safety: head is never null; the guard pins its epoch
            let next = unsafe { head.deref() }.next.load(Acquire, guard);

            // Stale snapshot, retry
            if head != self.head.0.load(Relaxed, guard) {
                continue;
            }

            if head == tail {
                // Sentinel only: truly empty
                if next.is_null() {
                    return None;
                }
                // Non-empty but tail lags; help the producer along
                let _ = self.tail.0.compare_exchange(tail, next, Release, Relaxed, guard);
                continue;
            }

            // head != tail implies the sentinel has a successor
            debug_assert!(!next.is_null());

            if self
                .head
                .0
                .compare_exchange(head, next, Release, Relaxed, guard)
                .is_ok()
            {
                // This thread won the head advance: it alone may take
                // next's payload (next is the new sentinel) and retire
                // the old sentinel
                unsafe {
                    let value = next.deref().data.as_ptr().read();
                    // Safety: head is unlinked from both paths; the
                    // epoch guard delays the free past any stale reader
                    guard.defer_destroy(head);
                    return Some(value);
                }
            }
            // Lost the race to another consumer; retry
        }
    }

    /// Whether the queue is empty at this instant
    ///
    /// Momentary observation; concurrent producers can make the answer
    /// stale immediately.
    pub fn is_empty(&self) -> bool {
        let guard = &epoch::pin();
        let head = self.head.0.load(Acquire, guard);
        // Safety: head is never null
        unsafe { head.deref() }.next.load(Acquire, guard).is_null()
    }
}

impl<T> Drop for LockFreeQueue<T> {
    /// Drain every remaining value, then free the final sentinel
    fn drop(&mut self) {
        // Safety: &mut self proves no other thread holds a reference,
        // so the unprotected guard (which reclaims immediately) is fine
        unsafe {
            let guard = epoch::unprotected();
            while self.pop_with(guard).is_some() {}
            let sentinel = self.head.0.load(Relaxed, guard);
            drop(sentinel.into_owned());
        }
    }
}

impl<T> Default for LockFreeQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for LockFreeQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockFreeQueue")
            .field("empty", &self.is_empty())
            .finish()
    }
}

// Safety: values cross threads through the queue, so T: Send is
// required; the algorithm itself synchronizes all shared state through
// atomics
unsafe impl<T: Send> Send for LockFreeQueue<T> {}
unsafe impl<T: Send> Sync for LockFreeQueue<T> {}
