//! Fixed-size block pool.
//!
//! A `BlockPool` acquires a fixed inventory of equal-sized raw blocks
//! from the system allocator up front, then grants and reclaims them in
//! O(1) without touching the system allocator on the hot path. Equal
//! block sizes make fragmentation impossible; the trade is flexibility
//! for predictable latency.
//!
//! The pool is single-threaded by construction: the free list lives in a
//! `RefCell` and block pointers are `NonNull`, so the type is neither
//! `Send` nor `Sync`.

use std::alloc::{alloc, dealloc, Layout};
use std::cell::RefCell;
use std::mem;
use std::ptr::NonNull;

use tracing::{debug, trace};

use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::stats::PoolStats;

/// Alignment of every block. Matches the strictest fundamental alignment
/// the system allocator guarantees, so any ordinary type fits.
pub const BLOCK_ALIGN: usize = 16;

/// A checked-out block: exactly `block_size` bytes, exclusively owned by
/// the holder until returned via [`BlockPool::deallocate`].
///
/// `RawBlock` is move-only and cannot be forged or duplicated, which
/// makes a double return unreachable in safe code.
pub struct RawBlock {
    ptr: NonNull<u8>,
}

impl RawBlock {
    #[inline]
    pub(crate) fn new(ptr: NonNull<u8>) -> Self {
        Self { ptr }
    }

    /// Returns the block's base address.
    #[inline]
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    #[inline]
    pub(crate) fn into_raw(self) -> NonNull<u8> {
        self.ptr
    }
}

impl std::fmt::Debug for RawBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RawBlock").field(&self.ptr).finish()
    }
}

/// Fixed inventory of equal-sized raw memory blocks.
pub struct BlockPool {
    layout: Layout,
    capacity: usize,
    /// Every block acquired at construction; freed wholesale on drop.
    blocks: Vec<NonNull<u8>>,
    /// Blocks currently available, popped from the end (LIFO).
    free: RefCell<Vec<NonNull<u8>>>,
    stats: PoolStats,
}

impl BlockPool {
    /// Acquires `capacity` blocks of `block_size` bytes each from the
    /// system allocator.
    ///
    /// A failed system allocation releases every previously acquired
    /// block before returning [`PoolError::AllocationFailure`]. Zero
    /// capacity is legal and yields an immediately-exhausted pool.
    ///
    /// # Panics
    /// If `block_size` is zero.
    pub fn new(block_size: usize, capacity: usize) -> Result<Self, PoolError> {
        assert!(block_size > 0, "block size must be greater than zero");

        let layout = Layout::from_size_align(block_size, BLOCK_ALIGN).map_err(|_| {
            PoolError::AllocationFailure {
                block_size,
                capacity,
                index: 0,
            }
        })?;

        let mut blocks: Vec<NonNull<u8>> = Vec::with_capacity(capacity);
        for index in 0..capacity {
            // SAFETY: `layout` has non-zero size.
            let raw = unsafe { alloc(layout) };
            let Some(ptr) = NonNull::new(raw) else {
                // Partial construction must not leak.
                for block in &blocks {
                    // SAFETY: each entry came from `alloc` with this layout.
                    unsafe { dealloc(block.as_ptr(), layout) };
                }
                return Err(PoolError::AllocationFailure {
                    block_size,
                    capacity,
                    index,
                });
            };
            blocks.push(ptr);
        }

        debug!(block_size, capacity, "block pool initialized");
        Ok(Self {
            layout,
            capacity,
            free: RefCell::new(blocks.clone()),
            blocks,
            stats: PoolStats::new(),
        })
    }

    /// Builds a pool from a [`PoolConfig`].
    pub fn from_config(config: &PoolConfig) -> Result<Self, PoolError> {
        Self::new(config.block_size, config.capacity)
    }

    /// Removes and returns one block from the free set.
    ///
    /// Returns [`PoolError::Exhausted`] when every block is checked out.
    /// Selection is LIFO: the most recently returned block is granted
    /// first, which keeps reuse cache-warm.
    pub fn allocate(&self) -> Result<RawBlock, PoolError> {
        let Some(ptr) = self.free.borrow_mut().pop() else {
            self.stats.increment_exhaustions();
            trace!("allocate rejected: pool exhausted");
            return Err(PoolError::Exhausted);
        };
        self.stats.increment_allocations();
        trace!(block = ?ptr, "block checked out");
        Ok(RawBlock::new(ptr))
    }

    /// Returns a block to the free set.
    ///
    /// # Safety
    /// `block` must have been obtained from this pool instance's
    /// [`allocate`](Self::allocate). A block from a different pool
    /// corrupts the free list (wrong size, wrong teardown). Double
    /// return is not a concern: `RawBlock` is consumed here and cannot
    /// be duplicated.
    pub unsafe fn deallocate(&self, block: RawBlock) {
        let ptr = block.into_raw();
        trace!(block = ?ptr, "block returned");
        self.free.borrow_mut().push(ptr);
        self.stats.increment_deallocations();
    }

    /// Allocates a block after checking that a `T` fits in it.
    pub(crate) fn allocate_for<T>(&self) -> Result<RawBlock, PoolError> {
        let size = mem::size_of::<T>();
        if size > self.layout.size() {
            return Err(PoolError::BlockTooSmall {
                requested: size,
                block_size: self.layout.size(),
            });
        }
        let align = mem::align_of::<T>();
        if align > BLOCK_ALIGN {
            return Err(PoolError::AlignmentUnsupported {
                required: align,
                max: BLOCK_ALIGN,
            });
        }
        self.allocate()
    }

    /// Returns true iff at least one block is free. Pure query.
    pub fn has_available(&self) -> bool {
        !self.free.borrow().is_empty()
    }

    /// Returns the number of blocks currently free.
    pub fn available(&self) -> usize {
        self.free.borrow().len()
    }

    /// Returns the total number of blocks the pool owns.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the size in bytes of each block.
    pub fn block_size(&self) -> usize {
        self.layout.size()
    }

    /// Returns the pool's operation counters.
    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }
}

impl Drop for BlockPool {
    fn drop(&mut self) {
        // Every originally-acquired block goes back to the system
        // allocator, including blocks still checked out as `RawBlock`s.
        // A caller holding a `RawBlock` past this point has a dangling
        // pointer; the pool does not track checked-out liveness.
        for block in &self.blocks {
            // SAFETY: each entry came from `alloc` with `self.layout` and
            // is freed exactly once, here.
            unsafe { dealloc(block.as_ptr(), self.layout) };
        }
        debug!(capacity = self.capacity, "block pool torn down");
    }
}
