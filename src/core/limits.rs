/*!
 * Limits and Tuning Constants
 *
 * Centralized location for fixed maxima and spin-tuning values.
 * All values include rationale comments explaining why they exist.
 */

// =============================================================================
// THREAD POOL LIMITS
// =============================================================================

/// Maximum worker threads per pool
/// Far beyond any sensible oversubscription factor; a guard against
/// callers passing byte counts or other garbage as a thread count
pub const MAX_POOL_THREADS: usize = 256;

/// Maximum task buffer capacity per pool (10,000 tasks)
/// Bounds the memory pinned by a single pool's backlog
pub const MAX_POOL_QUEUE_CAPACITY: usize = 10_000;

// =============================================================================
// BACKOFF TUNING
// =============================================================================

/// Backoff steps that spin with CPU hints only (2^6 = 64 hint
/// iterations at the final pure-spin step)
/// [PERF] Short enough that an uncontended retry never reaches the OS
pub const BACKOFF_SPIN_LIMIT: u32 = 6;

/// Backoff steps before each wait also yields to the scheduler
/// Past this point the awaited thread is probably descheduled, so
/// burning further cycles spinning cannot help
pub const BACKOFF_YIELD_LIMIT: u32 = 10;
