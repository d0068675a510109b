//! Error types for pool construction, allocation, and typed creation.

use thiserror::Error;

/// Block pool error conditions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// The system allocator could not supply the requested blocks during
    /// pool construction. All blocks acquired before the failure have
    /// already been released.
    #[error("system allocator failed at block {index} of {capacity} ({block_size} bytes each)")]
    AllocationFailure {
        block_size: usize,
        capacity: usize,
        index: usize,
    },

    /// Every block is currently checked out. Recoverable: retry once a
    /// block has been returned.
    #[error("pool exhausted: no free blocks")]
    Exhausted,

    /// The requested storage does not fit in a single block.
    #[error("requested {requested} bytes but blocks hold {block_size}")]
    BlockTooSmall { requested: usize, block_size: usize },

    /// The requested type needs stricter alignment than blocks provide.
    #[error("required alignment {required} exceeds block alignment {max}")]
    AlignmentUnsupported { required: usize, max: usize },
}

/// Error from constructing a typed value inside a pool block.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CreateError<E> {
    /// No block could be obtained; nothing was constructed.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// The value's own constructor failed. The block has already been
    /// returned to the pool.
    #[error("constructor failed: {0}")]
    Constructor(E),
}
