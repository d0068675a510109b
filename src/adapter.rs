//! Storage-provider capability for pool-backed containers.
//!
//! [`BlockSource`] is the seam that lets any container draw its backing
//! storage from a pool: grant a block, return a block, report the block
//! geometry. [`PoolVec`] is a growable sequence built on that seam. Each
//! growth step allocates a fresh block, copies, and returns the old one,
//! so a single container can exhaust a small pool over its lifetime; that
//! is a sizing concern for the caller, not a pool defect.

use std::marker::PhantomData;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};
use std::slice;

use crate::error::PoolError;
use crate::pool::{BlockPool, RawBlock, BLOCK_ALIGN};

/// Capability to grant and reclaim fixed-size raw blocks.
pub trait BlockSource {
    /// Grants one block, or fails with [`PoolError::Exhausted`].
    fn allocate(&self) -> Result<RawBlock, PoolError>;

    /// Returns a block to the source.
    ///
    /// # Safety
    /// `block` must have been obtained from this source's `allocate`.
    unsafe fn deallocate(&self, block: RawBlock);

    /// Size in bytes of every granted block.
    fn block_size(&self) -> usize;

    /// Alignment of every granted block.
    fn block_align(&self) -> usize {
        BLOCK_ALIGN
    }
}

impl BlockSource for BlockPool {
    fn allocate(&self) -> Result<RawBlock, PoolError> {
        BlockPool::allocate(self)
    }

    unsafe fn deallocate(&self, block: RawBlock) {
        // SAFETY: forwarded contract.
        unsafe { BlockPool::deallocate(self, block) };
    }

    fn block_size(&self) -> usize {
        BlockPool::block_size(self)
    }
}

/// Growable sequence whose element buffer is a single pool block.
///
/// The buffer is allocated lazily on first push and grows geometrically
/// up to `block_size / size_of::<T>()` elements; beyond that the push
/// fails with [`PoolError::BlockTooSmall`] instead of spilling to the
/// system allocator.
pub struct PoolVec<'s, T, S: BlockSource = BlockPool> {
    source: &'s S,
    buf: Option<NonNull<T>>,
    cap: usize,
    len: usize,
    _marker: PhantomData<T>,
}

impl<'s, T, S: BlockSource> PoolVec<'s, T, S> {
    /// Creates an empty sequence backed by `source`. Allocates nothing
    /// until the first push.
    pub fn new(source: &'s S) -> Self {
        Self {
            source,
            buf: None,
            cap: 0,
            len: 0,
            _marker: PhantomData,
        }
    }

    /// Appends a value, growing the buffer if needed.
    ///
    /// Growth draws a fresh block from the source and is therefore
    /// subject to [`PoolError::Exhausted`]; the sequence is unchanged on
    /// failure.
    pub fn push(&mut self, value: T) -> Result<(), PoolError> {
        if self.len == self.cap {
            self.grow()?;
        }
        // SAFETY: grow ensured `len < cap` and a live buffer.
        unsafe { ptr::write(self.buf_ptr().add(self.len), value) };
        self.len += 1;
        Ok(())
    }

    /// Removes and returns the last element.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: slot `len` holds an initialized value.
        Some(unsafe { ptr::read(self.buf_ptr().add(self.len)) })
    }

    /// Drops every element and returns the buffer to the source.
    pub fn clear(&mut self) {
        while self.pop().is_some() {}
        if let Some(buf) = self.buf.take() {
            // SAFETY: the buffer came from `self.source` in `grow`.
            unsafe { self.source.deallocate(RawBlock::new(buf.cast())) };
            self.cap = 0;
        }
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true iff the sequence holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the current element capacity.
    pub fn capacity(&self) -> usize {
        self.cap
    }

    fn grow(&mut self) -> Result<(), PoolError> {
        let align = mem::align_of::<T>();
        if align > self.source.block_align() {
            return Err(PoolError::AlignmentUnsupported {
                required: align,
                max: self.source.block_align(),
            });
        }

        let elem = mem::size_of::<T>().max(1);
        let max_cap = self.source.block_size() / elem;
        let wanted = if self.cap == 0 { 1 } else { self.cap * 2 };
        let new_cap = wanted.min(max_cap);
        if new_cap <= self.cap {
            // One block is the ceiling; there is no larger buffer to move to.
            return Err(PoolError::BlockTooSmall {
                requested: (self.cap + 1) * elem,
                block_size: self.source.block_size(),
            });
        }

        let new_ptr = self.source.allocate()?.into_raw().cast::<T>();
        if let Some(old) = self.buf.take() {
            // SAFETY: both buffers are live and disjoint; the old one
            // holds `len` initialized values.
            unsafe {
                ptr::copy_nonoverlapping(old.as_ptr(), new_ptr.as_ptr(), self.len);
                self.source.deallocate(RawBlock::new(old.cast()));
            }
        }
        self.buf = Some(new_ptr);
        self.cap = new_cap;
        Ok(())
    }

    fn buf_ptr(&self) -> *mut T {
        self.buf.map_or(NonNull::dangling().as_ptr(), NonNull::as_ptr)
    }
}

impl<T, S: BlockSource> Deref for PoolVec<'_, T, S> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        // SAFETY: the first `len` slots are initialized; a dangling
        // pointer is valid for a zero-length slice.
        unsafe { slice::from_raw_parts(self.buf_ptr(), self.len) }
    }
}

impl<T, S: BlockSource> DerefMut for PoolVec<'_, T, S> {
    fn deref_mut(&mut self) -> &mut [T] {
        // SAFETY: as above, plus `&mut self` guarantees exclusivity.
        unsafe { slice::from_raw_parts_mut(self.buf_ptr(), self.len) }
    }
}

impl<T, S: BlockSource> Drop for PoolVec<'_, T, S> {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn push_pop_and_indexing() {
        let pool = BlockPool::new(64, 4).unwrap();
        let mut vec = PoolVec::new(&pool);

        for n in [1u32, 2, 3] {
            vec.push(n).unwrap();
        }
        assert_eq!(vec.len(), 3);
        assert_eq!(&vec[..], &[1, 2, 3]);

        assert_eq!(vec.pop(), Some(3));
        assert_eq!(vec.pop(), Some(2));
        assert_eq!(vec.pop(), Some(1));
        assert_eq!(vec.pop(), None);
        assert!(vec.is_empty());
    }

    #[test]
    fn growth_preserves_elements() {
        let pool = BlockPool::new(128, 4).unwrap();
        let mut vec = PoolVec::new(&pool);

        for n in 0..16u64 {
            vec.push(n).unwrap();
        }
        assert_eq!(vec.len(), 16);
        for (i, value) in vec.iter().enumerate() {
            assert_eq!(*value, i as u64);
        }
    }

    #[test]
    fn empty_sequence_allocates_nothing() {
        let pool = BlockPool::new(64, 2).unwrap();
        let vec: PoolVec<'_, u32> = PoolVec::new(&pool);
        assert_eq!(pool.available(), 2);
        assert!(vec.is_empty());
        drop(vec);
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn drop_returns_the_buffer() {
        let pool = BlockPool::new(64, 2).unwrap();
        {
            let mut vec = PoolVec::new(&pool);
            vec.push(1u8).unwrap();
            assert_eq!(pool.available(), 1);
        }
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn growth_beyond_one_block_is_rejected() {
        // 16-byte blocks hold at most two u64s.
        let pool = BlockPool::new(16, 4).unwrap();
        let mut vec = PoolVec::new(&pool);

        vec.push(1u64).unwrap();
        vec.push(2u64).unwrap();
        let err = vec.push(3u64).unwrap_err();
        assert!(matches!(err, PoolError::BlockTooSmall { .. }));

        // The failed push left the sequence intact.
        assert_eq!(&vec[..], &[1, 2]);
    }

    #[test]
    fn single_container_can_exhaust_the_pool() {
        // One block total: the first growth succeeds, the reallocation for
        // the second cannot get a block while the first is still held.
        let pool = BlockPool::new(64, 1).unwrap();
        let mut vec = PoolVec::new(&pool);

        vec.push(1u32).unwrap();
        assert_eq!(vec.push(2u32).unwrap_err(), PoolError::Exhausted);
        assert_eq!(&vec[..], &[1]);
    }

    #[test]
    fn clear_drops_elements_and_frees_the_buffer() {
        let pool = BlockPool::new(64, 2).unwrap();
        let mut vec = PoolVec::new(&pool);
        vec.push(String::from("a")).unwrap();
        vec.push(String::from("b")).unwrap();

        vec.clear();
        assert!(vec.is_empty());
        assert_eq!(vec.capacity(), 0);
        assert_eq!(pool.available(), 2);

        // Still usable after a clear.
        vec.push(String::from("c")).unwrap();
        assert_eq!(vec[0], "c");
    }

    /// Wrapper source that counts grants and returns, exercising the
    /// capability seam with a non-pool implementation.
    struct CountingSource<'p> {
        pool: &'p BlockPool,
        grants: Cell<usize>,
        returns: Cell<usize>,
    }

    impl BlockSource for CountingSource<'_> {
        fn allocate(&self) -> Result<RawBlock, PoolError> {
            let block = self.pool.allocate()?;
            self.grants.set(self.grants.get() + 1);
            Ok(block)
        }

        unsafe fn deallocate(&self, block: RawBlock) {
            self.returns.set(self.returns.get() + 1);
            // SAFETY: forwarded contract.
            unsafe { self.pool.deallocate(block) };
        }

        fn block_size(&self) -> usize {
            self.pool.block_size()
        }
    }

    #[test]
    fn each_growth_issues_its_own_allocate_and_deallocate() {
        let pool = BlockPool::new(32, 4).unwrap();
        let source = CountingSource {
            pool: &pool,
            grants: Cell::new(0),
            returns: Cell::new(0),
        };

        let mut vec: PoolVec<'_, u64, _> = PoolVec::new(&source);
        vec.push(1).unwrap(); // capacity 0 -> 1
        vec.push(2).unwrap(); // capacity 1 -> 2, realloc
        vec.push(3).unwrap(); // capacity 2 -> 4, realloc

        assert_eq!(source.grants.get(), 3);
        assert_eq!(source.returns.get(), 2);

        drop(vec);
        assert_eq!(source.returns.get(), 3);
        assert_eq!(pool.available(), 4);
    }
}
