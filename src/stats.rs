//! Pool operation counters.
//!
//! Tracks checkout/return traffic and exhaustion failures so callers can
//! size pools from observed behavior instead of guesswork.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters for a single pool instance.
pub struct PoolStats {
    allocations: AtomicUsize,
    deallocations: AtomicUsize,
    exhaustions: AtomicUsize,
}

impl PoolStats {
    /// Creates a new `PoolStats` instance with all counters at zero.
    pub fn new() -> Self {
        PoolStats {
            allocations: AtomicUsize::new(0),
            deallocations: AtomicUsize::new(0),
            exhaustions: AtomicUsize::new(0),
        }
    }

    /// Increments the count of successful block checkouts.
    #[inline]
    pub(crate) fn increment_allocations(&self) {
        self.allocations.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the count of block returns.
    #[inline]
    pub(crate) fn increment_deallocations(&self) {
        self.deallocations.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the count of allocate calls that found no free block.
    #[inline]
    pub(crate) fn increment_exhaustions(&self) {
        self.exhaustions.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of successful block checkouts.
    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }

    /// Returns the number of block returns.
    pub fn deallocations(&self) -> usize {
        self.deallocations.load(Ordering::Relaxed)
    }

    /// Returns the number of allocate calls rejected for exhaustion.
    pub fn exhaustions(&self) -> usize {
        self.exhaustions.load(Ordering::Relaxed)
    }

    /// Returns the number of blocks currently checked out.
    pub fn in_use(&self) -> usize {
        self.allocations().saturating_sub(self.deallocations())
    }
}

impl Default for PoolStats {
    fn default() -> Self {
        Self::new()
    }
}
