/*!
 * Spin Lock
 * Test-and-set mutual exclusion with exponential backoff
 */

use super::backoff::Backoff;
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};

/// A busy-waiting mutual exclusion lock
///
/// One atomic flag guards the data: the flag is `true` iff exactly one
/// guard is live. Acquisition swaps the flag with Acquire ordering and
/// spins (with [`Backoff`]) until the previous value was `false`;
/// release clears it with Release ordering, publishing every write made
/// inside the critical section to the next acquirer.
///
/// # Fairness
///
/// None. Waiters race on every release, so a thread can starve under
/// sustained contention. Keep critical sections short and uncontended.
///
/// # Example
///
/// ```
/// use syncprim::SpinLock;
///
/// static COUNTER: SpinLock<u64> = SpinLock::new(0);
///
/// *COUNTER.lock() += 1;
/// assert_eq!(*COUNTER.lock(), 1);
/// ```
pub struct SpinLock<T: ?Sized> {
    locked: AtomicBool,
    data: UnsafeCell<T>,
}

/// RAII guard returned by [`SpinLock::lock`] and [`SpinLock::try_lock`]
///
/// Releases the lock on drop.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct SpinLockGuard<'a, T: ?Sized> {
    lock: &'a SpinLock<T>,
}

impl<T> SpinLock<T> {
    /// Create an unlocked spin lock wrapping `value`
    #[inline]
    pub const fn new(value: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(value),
        }
    }

    /// Consume the lock and return the protected value
    #[inline]
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: ?Sized> SpinLock<T> {
    /// Acquire the lock, spinning until it becomes available
    ///
    /// Never returns until acquired; there is no timeout path.
    #[inline]
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        let backoff = Backoff::new();
        // swap returns the previous value; false means we took the lock
        while self.locked.swap(true, Ordering::Acquire) {
            backoff.snooze();
        }
        SpinLockGuard { lock: self }
    }

    /// Make a single acquisition attempt without spinning
    #[inline]
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        if self.locked.swap(true, Ordering::Acquire) {
            None
        } else {
            Some(SpinLockGuard { lock: self })
        }
    }

    /// Whether the lock is currently held by some thread
    ///
    /// Only a momentary observation; the answer can be stale by the
    /// time the caller acts on it.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    /// Exclusive access through a unique reference, no locking needed
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Release the lock without a guard
    ///
    /// # Safety
    ///
    /// The caller must currently hold the lock and must not let any
    /// outstanding guard release it again. Double release hands the
    /// critical section to two threads at once.
    #[inline]
    pub unsafe fn force_unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }
}

impl<T: ?Sized> Drop for SpinLockGuard<'_, T> {
    #[inline]
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}

impl<T: ?Sized> Deref for SpinLockGuard<'_, T> {
    type Target = T;
    #[inline]
    fn deref(&self) -> &T {
        // Safety: the live guard proves exclusive ownership of the lock
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for SpinLockGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // Safety: the live guard proves exclusive ownership of the lock
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: Default> Default for SpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for SpinLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.try_lock() {
            Some(guard) => f.debug_struct("SpinLock").field("data", &*guard).finish(),
            None => f.debug_struct("SpinLock").field("data", &"<locked>").finish(),
        }
    }
}

// Safety: the atomic flag enforces exclusive access to the data
unsafe impl<T: ?Sized + Send> Send for SpinLock<T> {}
unsafe impl<T: ?Sized + Send> Sync for SpinLock<T> {}
