//! Block storage for the two engines
//!
//! A block pairs an occupancy word with the index of the next block in the
//! free list. Links are indices into the owning pool, never addresses, so a
//! pool can be reallocated or cloned without fixing them up.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use super::block_word::{AtomicBlockWord, BlockWord};

/// End-of-list marker for atomic free-list links and cursors
pub(crate) const NO_BLOCK: usize = usize::MAX;

/// Block of the single-threaded engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Block<W: BlockWord> {
    /// 1 = allocated, 0 = free
    pub occupancy: W,
    /// Next block with free capacity (None = end of list)
    pub next_free: Option<usize>,
}

impl<W: BlockWord> Block<W> {
    pub fn empty() -> Self {
        Self {
            occupancy: W::EMPTY,
            next_free: None,
        }
    }

    pub fn is_full(&self) -> bool {
        self.occupancy == W::FULL
    }
}

/// Block of the concurrent engine
///
/// `next_free` and `linked` are only touched inside the takeover window;
/// `occupancy` is claimed and released lock-free.
#[derive(Debug)]
pub(crate) struct AtomicBlock<W: BlockWord> {
    /// 1 = allocated, 0 = free
    pub occupancy: W::Atomic,
    /// Next block with free capacity (NO_BLOCK = end of list)
    pub next_free: AtomicUsize,
    /// Whether the block currently sits in the free list (head included)
    pub linked: AtomicBool,
}

impl<W: BlockWord> AtomicBlock<W> {
    pub fn new(occupancy: W, next_free: usize) -> Self {
        Self {
            occupancy: W::Atomic::new(occupancy),
            next_free: AtomicUsize::new(next_free),
            linked: AtomicBool::new(true),
        }
    }

    pub fn load(&self) -> W {
        self.occupancy.load(Ordering::Acquire)
    }
}
