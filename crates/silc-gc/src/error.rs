//! Heap error types

use thiserror::Error;

/// Errors reported by value encoding and heap allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GcError {
    /// Integer does not fit into an inline fixnum
    #[error("integer {0} is out of fixnum range")]
    IntOutOfRange(i64),

    /// Heap exhausted even after a collection
    #[error("out of heap: requested {requested} word(s), {available} available")]
    OutOfMemory {
        /// Words the allocation needed (object plus position cell)
        requested: usize,
        /// Words left between the object area and the position table
        available: usize,
    },
}

/// Result type for heap operations
pub type GcResult<T> = std::result::Result<T, GcError>;
