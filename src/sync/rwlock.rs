/*!
 * Reader-Writer Spin Lock
 * Concurrent readers, exclusive writers, one combined atomic state word
 */

use super::backoff::Backoff;
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// High bit of the state word flags an active writer
const WRITER_BIT: u32 = 1 << 31;
/// Low 31 bits of the state word count active readers
const READER_MASK: u32 = WRITER_BIT - 1;

/// A busy-waiting reader-writer lock
///
/// The entire lock state lives in one `AtomicU32`: bit 31 is the
/// writer flag, the low 31 bits count readers. Because readers
/// increment the count and writers set the flag with compare-and-swap
/// on the same word, the writer-flag check and the reader-count update
/// are a single atomic step; there is no window in which a writer and
/// a late reader can both believe they hold the lock.
///
/// A separate writer gate serializes competing writers so that only
/// one of them spins on the reader count at a time.
///
/// # Caveats
///
/// No upgrade path exists from a read guard to a write guard.
/// Acquiring `write` while holding `read` on the same thread
/// deadlocks: the writer spins for the reader count to reach zero,
/// which the held read guard prevents. Release and reacquire instead.
///
/// Like [`SpinLock`](super::SpinLock), acquisition has no fairness
/// guarantee and no timeout.
pub struct RwSpinLock<T: ?Sized> {
    state: AtomicU32,
    writer_gate: AtomicBool,
    data: UnsafeCell<T>,
}

/// Shared-access RAII guard returned by [`RwSpinLock::read`]
#[must_use = "the read lock is released as soon as the guard is dropped"]
pub struct RwReadGuard<'a, T: ?Sized> {
    lock: &'a RwSpinLock<T>,
}

/// Exclusive-access RAII guard returned by [`RwSpinLock::write`]
#[must_use = "the write lock is released as soon as the guard is dropped"]
pub struct RwWriteGuard<'a, T: ?Sized> {
    lock: &'a RwSpinLock<T>,
}

impl<T> RwSpinLock<T> {
    /// Create an unlocked lock wrapping `value`
    #[inline]
    pub const fn new(value: T) -> Self {
        Self {
            state: AtomicU32::new(0),
            writer_gate: AtomicBool::new(false),
            data: UnsafeCell::new(value),
        }
    }

    /// Consume the lock and return the protected value
    #[inline]
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: ?Sized> RwSpinLock<T> {
    /// Acquire shared access, spinning while a writer is active
    pub fn read(&self) -> RwReadGuard<'_, T> {
        let backoff = Backoff::new();
        loop {
            let state = self.state.load(Ordering::Relaxed);

            // An active writer excludes new readers
            if state & WRITER_BIT != 0 {
                backoff.snooze();
                continue;
            }

            // The CAS re-checks the writer flag and increments the
            // reader count in one atomic step; a writer racing in
            // between changes the word and fails the CAS
            if self
                .state
                .compare_exchange_weak(state, state + 1, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return RwReadGuard { lock: self };
            }
            backoff.spin();
        }
    }

    /// Acquire exclusive access, spinning out competing writers first
    /// and then draining active readers
    pub fn write(&self) -> RwWriteGuard<'_, T> {
        // The gate serializes writers; losers wait here, not on the
        // state word
        let backoff = Backoff::new();
        while self.writer_gate.swap(true, Ordering::Acquire) {
            backoff.snooze();
        }

        // Sole gated writer: wait for readers to drain, then set the
        // writer flag. The CAS combines the zero-reader check with the
        // flag set so a reader cannot slip in between them.
        backoff.reset();
        loop {
            let state = self.state.load(Ordering::Relaxed);
            if state & READER_MASK != 0 {
                backoff.snooze();
                continue;
            }
            if self
                .state
                .compare_exchange_weak(
                    state,
                    state | WRITER_BIT,
                    Ordering::Acquire,
                    Ordering::Relaxed,
                )
                .is_ok()
            {
                return RwWriteGuard { lock: self };
            }
            backoff.spin();
        }
    }

    /// Number of readers currently holding the lock
    ///
    /// Momentary observation, for diagnostics and tests.
    #[inline]
    pub fn reader_count(&self) -> usize {
        (self.state.load(Ordering::Acquire) & READER_MASK) as usize
    }

    /// Whether a writer currently holds the lock
    #[inline]
    pub fn is_write_locked(&self) -> bool {
        self.state.load(Ordering::Acquire) & WRITER_BIT != 0
    }

    /// Exclusive access through a unique reference, no locking needed
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}

impl<T: ?Sized> Drop for RwReadGuard<'_, T> {
    #[inline]
    fn drop(&mut self) {
        self.lock.state.fetch_sub(1, Ordering::Release);
    }
}

impl<T: ?Sized> Drop for RwWriteGuard<'_, T> {
    #[inline]
    fn drop(&mut self) {
        // Clear the writer flag before opening the gate so the next
        // gated writer observes a consistent word
        self.lock.state.fetch_and(!WRITER_BIT, Ordering::Release);
        self.lock.writer_gate.store(false, Ordering::Release);
    }
}

impl<T: ?Sized> Deref for RwReadGuard<'_, T> {
    type Target = T;
    #[inline]
    fn deref(&self) -> &T {
        // Safety: a live read guard excludes writers
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> Deref for RwWriteGuard<'_, T> {
    type Target = T;
    #[inline]
    fn deref(&self) -> &T {
        // Safety: a live write guard excludes everyone else
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for RwWriteGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // Safety: a live write guard excludes everyone else
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: Default> Default for RwSpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for RwSpinLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RwSpinLock")
            .field("readers", &self.reader_count())
            .field("write_locked", &self.is_write_locked())
            .finish()
    }
}

// Safety: the state word enforces reader/writer exclusion; T: Send + Sync
// is required because readers on multiple threads share &T
unsafe impl<T: ?Sized + Send> Send for RwSpinLock<T> {}
unsafe impl<T: ?Sized + Send + Sync> Sync for RwSpinLock<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_readers_share() {
        let lock = RwSpinLock::new(7);
        let r1 = lock.read();
        let r2 = lock.read();
        assert_eq!(*r1, 7);
        assert_eq!(*r2, 7);
        assert_eq!(lock.reader_count(), 2);
        drop(r1);
        drop(r2);
        assert_eq!(lock.reader_count(), 0);
    }

    #[test]
    fn test_writer_excludes_writer() {
        let lock = Arc::new(RwSpinLock::new(0u64));
        let mut handles = vec![];
        for _ in 0..4 {
            let lock = lock.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..25_000 {
                    *lock.write() += 1;
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(*lock.read(), 4 * 25_000);
    }

    #[test]
    fn test_write_guard_state_transitions() {
        let lock = RwSpinLock::new(());
        {
            let _w = lock.write();
            assert!(lock.is_write_locked());
            assert_eq!(lock.reader_count(), 0);
        }
        assert!(!lock.is_write_locked());
        // The gate reopens too: a second write must succeed
        let _w2 = lock.write();
    }

    #[test]
    fn test_readers_see_writer_results() {
        let lock = Arc::new(RwSpinLock::new(0u64));
        let writer = {
            let lock = lock.clone();
            thread::spawn(move || {
                for i in 1..=1000u64 {
                    *lock.write() = i;
                }
            })
        };
        let reader = {
            let lock = lock.clone();
            thread::spawn(move || {
                let mut last = 0;
                while last < 1000 {
                    let cur = *lock.read();
                    // Values are single writes under the lock, so they
                    // only move forward
                    assert!(cur >= last);
                    last = cur;
                }
            })
        };
        writer.join().unwrap();
        reader.join().unwrap();
    }
}
