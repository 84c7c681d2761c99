/*!
 * Syncprim Library
 * Low-level concurrency primitives for building concurrent data
 * structures and task-execution engines
 */

pub mod core;
pub mod pool;
pub mod queue;
pub mod sync;

// Re-exports
pub use crate::core::errors::{Result, SyncError};
pub use pool::ThreadPool;
pub use queue::LockFreeQueue;
pub use sync::{Backoff, RwSpinLock, SpinLock};
