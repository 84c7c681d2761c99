/*!
 * Lock-Free Structures
 *
 * Non-blocking data structures built on compare-and-swap:
 * - LockFreeQueue, an unbounded MPMC FIFO (Michael-Scott algorithm)
 *
 * # Progress
 *
 * Operations here never block and never take a lock; contended threads
 * retry, and any thread that observes another thread's half-finished
 * update completes it first ("helping"), so some thread always makes
 * progress.
 */

mod michael_scott;

pub use michael_scott::LockFreeQueue;
