/*!
 * Exponential Backoff
 * Contention relief for spin loops, portable across architectures
 */

use crate::core::limits::{BACKOFF_SPIN_LIMIT, BACKOFF_YIELD_LIMIT};
use std::cell::Cell;
use std::hint;

/// Exponential backoff for retry loops on shared atomics
///
/// Each failed attempt spins for twice as many CPU relax hints as the
/// previous one; once spinning stops paying off the backoff starts
/// yielding the thread to the scheduler as well.
///
/// `std::hint::spin_loop` lowers to the architecture's pause/yield
/// instruction (PAUSE on x86, YIELD on aarch64) and degrades to a
/// compiler fence elsewhere, so no per-architecture conditional code
/// is needed at this level.
///
/// # Use Cases
///
/// - `spin` between failed compare-and-swap attempts, where the retry
///   is expected to succeed within a few iterations
/// - `snooze` while waiting for another thread to make progress, e.g.
///   a lock holder to release or a lagging tail pointer to advance
///
/// One `Backoff` instance serves one wait episode on one thread; it is
/// deliberately `!Sync` (interior `Cell`).
pub struct Backoff {
    step: Cell<u32>,
}

impl Backoff {
    /// Create a fresh backoff at the shortest spin duration
    #[inline]
    pub const fn new() -> Self {
        Self { step: Cell::new(0) }
    }

    /// Back off after a failed atomic update
    ///
    /// Spins for `2^step` relax hints, capped at the pure-spin limit.
    /// Never yields: retries after lost CAS races are expected to
    /// succeed quickly, and giving up the timeslice would only add
    /// latency.
    #[inline]
    pub fn spin(&self) {
        let step = self.step.get().min(BACKOFF_SPIN_LIMIT);
        for _ in 0..(1u32 << step) {
            hint::spin_loop();
        }
        if self.step.get() <= BACKOFF_SPIN_LIMIT {
            self.step.set(self.step.get() + 1);
        }
    }

    /// Back off while waiting for another thread to make progress
    ///
    /// Spins like `spin` at first, then additionally yields to the
    /// scheduler once the step count passes the yield threshold. The
    /// thread being waited on may be descheduled; yielding is the only
    /// way to let it run on a loaded machine.
    #[inline]
    pub fn snooze(&self) {
        let step = self.step.get();
        if step <= BACKOFF_SPIN_LIMIT {
            for _ in 0..(1u32 << step) {
                hint::spin_loop();
            }
        } else {
            for _ in 0..(1u32 << BACKOFF_SPIN_LIMIT) {
                hint::spin_loop();
            }
            std::thread::yield_now();
        }
        if step <= BACKOFF_YIELD_LIMIT {
            self.step.set(step + 1);
        }
    }

    /// True once `snooze` has escalated to yielding
    ///
    /// Callers with a cheaper blocking path (e.g. a condvar) can use
    /// this to stop spinning entirely.
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.step.get() > BACKOFF_YIELD_LIMIT
    }

    /// Restart from the shortest spin duration
    #[inline]
    pub fn reset(&self) {
        self.step.set(0);
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}
