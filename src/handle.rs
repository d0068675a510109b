//! Typed ownership handles over pool blocks.
//!
//! A [`PooledBox`] binds the lifetime of a constructed value to the
//! lifetime of the block it lives in: release runs the value's destructor
//! first, then returns the block to the pool, exactly once. The handle is
//! move-only and release consumes it, so a second release is unreachable
//! rather than merely discouraged.

use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};

use crate::error::{CreateError, PoolError};
use crate::pool::{BlockPool, RawBlock};

/// Exclusive owner of one constructed `T` inside one checked-out block.
pub struct PooledBox<'pool, T> {
    value: NonNull<T>,
    pool: &'pool BlockPool,
    _marker: PhantomData<T>,
}

impl<'pool, T> PooledBox<'pool, T> {
    /// Allocates a block from `pool` and moves `value` into it.
    ///
    /// Fails with [`PoolError::Exhausted`] before constructing anything,
    /// or with [`PoolError::BlockTooSmall`] /
    /// [`PoolError::AlignmentUnsupported`] when `T` cannot live in a
    /// block.
    pub fn new(pool: &'pool BlockPool, value: T) -> Result<Self, PoolError> {
        let block = pool.allocate_for::<T>()?;
        let ptr = block.into_raw().cast::<T>();
        // SAFETY: the block holds at least `size_of::<T>()` bytes, is
        // aligned for `T`, and is exclusively ours until release.
        unsafe { ptr::write(ptr.as_ptr(), value) };
        Ok(Self {
            value: ptr,
            pool,
            _marker: PhantomData,
        })
    }

    /// Allocates a block and constructs a `T` in it with a fallible
    /// constructor.
    ///
    /// If `build` fails, the block is returned to the pool before the
    /// error propagates; nothing leaks and no partial state remains.
    pub fn try_new_with<E>(
        pool: &'pool BlockPool,
        build: impl FnOnce() -> Result<T, E>,
    ) -> Result<Self, CreateError<E>> {
        let block = pool.allocate_for::<T>().map_err(CreateError::Pool)?;
        match build() {
            Ok(value) => {
                let ptr = block.into_raw().cast::<T>();
                // SAFETY: same as `new`.
                unsafe { ptr::write(ptr.as_ptr(), value) };
                Ok(Self {
                    value: ptr,
                    pool,
                    _marker: PhantomData,
                })
            }
            Err(error) => {
                // The block goes back before the error propagates.
                // SAFETY: `block` came from this pool, just above.
                unsafe { pool.deallocate(block) };
                Err(CreateError::Constructor(error))
            }
        }
    }

    /// Moves the value out, reclaiming the block without running the
    /// value's destructor.
    pub fn into_inner(this: Self) -> T {
        let ptr = this.value;
        let pool = this.pool;
        mem::forget(this);
        // SAFETY: the handle held a live value; forgetting it above makes
        // this read the only release path taken.
        let value = unsafe { ptr::read(ptr.as_ptr()) };
        // SAFETY: the block came from `pool` and is released exactly once.
        unsafe { pool.deallocate(RawBlock::new(ptr.cast())) };
        value
    }

    /// Returns the pool this handle draws from.
    pub fn pool(&self) -> &'pool BlockPool {
        self.pool
    }
}

impl<T> Deref for PooledBox<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // SAFETY: the handle exclusively owns a live, initialized value.
        unsafe { self.value.as_ref() }
    }
}

impl<T> DerefMut for PooledBox<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: as above, plus `&mut self` guarantees exclusivity.
        unsafe { self.value.as_mut() }
    }
}

impl<T> Drop for PooledBox<'_, T> {
    fn drop(&mut self) {
        // Destructor first, while the block is still valid memory; only
        // then does the block rejoin the free set.
        // SAFETY: the value is live and dropped exactly once; the block
        // came from `self.pool` and is released exactly once.
        unsafe {
            ptr::drop_in_place(self.value.as_ptr());
            self.pool.deallocate(RawBlock::new(self.value.cast()));
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for PooledBox<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T: fmt::Display> fmt::Display for PooledBox<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}
