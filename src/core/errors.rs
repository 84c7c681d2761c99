/*!
 * Error Types
 * Centralized error handling with thiserror
 */

use thiserror::Error;

/// Errors reported by the fallible operations in this crate
///
/// The spin locks and the lock-free queue have no error returns: lock
/// misuse is an unsafe-contract violation, and dequeueing from an empty
/// queue is a normal `None`, not a failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// A size or count argument is outside its allowed range
    #[error("invalid parameter: {0}")]
    BadParameter(String),

    /// Resource exhaustion while creating a pool (worker spawn failure)
    #[error("out of resources: {0}")]
    OutOfMemory(String),

    /// The pool's task buffer is at capacity; backpressure for the caller
    #[error("task queue is full")]
    QueueFull,
}

/// Result type for syncprim operations
pub type Result<T> = std::result::Result<T, SyncError>;
