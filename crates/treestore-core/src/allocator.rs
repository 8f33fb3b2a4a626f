//! Identity Allocator: hands out user-range identifiers
//!
//! Dataset-origin records arrive with their final id (a multiple of 10).
//! Everything else goes through the allocator, which never returns a
//! multiple of 10 and never returns an id the caller reports as occupied.
//!
//! The counter only moves forward. A candidate that is examined is consumed
//! whether or not it is returned, so two calls made before either result is
//! committed cannot be handed the same id. The store still runs allocation
//! and commit under one write lock: the counter alone does not see ids that
//! were inserted verbatim after it passed them.

use crate::tree::is_dataset_id;

/// Monotonic allocator over the user-origin partition.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    /// Next candidate to examine
    next: u64,
}

impl IdAllocator {
    /// Create an allocator starting at 1.
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Next candidate the allocator will examine.
    pub fn peek_next(&self) -> u64 {
        self.next
    }

    /// Pick an id for a record.
    ///
    /// `requested` is kept when it is non-zero, outside the dataset
    /// partition, and not occupied. Otherwise the first acceptable value at
    /// or after the counter is returned and the counter moves past it.
    pub fn allocate<F>(&mut self, requested: Option<u64>, is_occupied: F) -> u64
    where
        F: Fn(u64) -> bool,
    {
        if let Some(id) = requested {
            if id != 0 && !is_dataset_id(id) && !is_occupied(id) {
                return id;
            }
        }

        loop {
            let candidate = self.next;
            self.next = candidate.saturating_add(1);
            if !is_dataset_id(candidate) && !is_occupied(candidate) {
                return candidate;
            }
        }
    }
}

impl Default for IdAllocator {
    fn default() -> Self { Self::new() }
}
