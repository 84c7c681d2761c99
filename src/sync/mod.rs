/*!
 * Spin-Based Lock Primitives
 *
 * Busy-waiting mutual exclusion built directly on atomics:
 * - SpinLock for short exclusive critical sections
 * - RwSpinLock for read-mostly data with rare exclusive writers
 * - Backoff, the shared contention-relief strategy
 *
 * # Design
 *
 * None of these primitives ever block in the OS; waiters spin with CPU
 * relax hints and escalate to scheduler yields under persistent
 * contention. That makes them suitable for short critical sections
 * only. Code that can hold a lock across I/O or long computation
 * should use a blocking mutex instead.
 */

mod backoff;
mod spinlock;
mod rwlock;

pub use backoff::Backoff;
pub use rwlock::{RwReadGuard, RwSpinLock, RwWriteGuard};
pub use spinlock::{SpinLock, SpinLockGuard};
