//! Lock-minimized, fixed-capacity slot allocation engine
//!
//! Slot claims and releases are single atomic read-modify-writes on a block's
//! occupancy word. Only moving the free-list cursors is serialized, through a
//! short "takeover" window:
//!
//! - Allocating threads *pin* the current head (`active_readers`) before
//!   reading it, so the head cannot be replaced under them.
//! - A thread replacing head or tail first raises `takeover` (no new pins),
//!   then, if it replaces the head, spins until every pin is released.
//! - The pin handshake is a Dekker-style store/load pair on two different
//!   atomics, so both sides use `SeqCst`.
//!
//! A thread never spins on `takeover` while holding a pin.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use crossbeam_utils::{Backoff, CachePadded};
use crate::block::{self, AtomicBlock, BlockWord, NO_BLOCK};
use crate::error::{Error, Result};
use super::report_precondition_violation;

const SOURCE: &str = "slotalloc::ConcurrentSlotAllocatorEngine";

/// Thread-safe slot allocation engine with a capacity fixed at construction.
///
/// Same block/free-list layout as [`SlotAllocatorEngine`](super::SlotAllocatorEngine),
/// but `allocate` and `deallocate` take `&self` and may be called from any
/// number of threads. Freed blocks are appended to the tail of the free list
/// so that only the thread that filled the head block ever advances it.
///
/// # Example
///
/// ```
/// use slot_allocator_engine::slotalloc::ConcurrentSlotAllocatorEngine;
///
/// let engine = ConcurrentSlotAllocatorEngine::<u64>::new(256);
/// std::thread::scope(|s| {
///     for _ in 0..4 {
///         s.spawn(|| {
///             let slot = engine.allocate().unwrap();
///             engine.deallocate(slot);
///         });
///     }
/// });
/// assert!(engine.is_empty());
/// ```
pub struct ConcurrentSlotAllocatorEngine<W: BlockWord = usize> {
    /// Number of usable slots
    capacity: usize,
    /// One occupancy word per `W::BITS` slots
    blocks: Box<[AtomicBlock<W>]>,
    /// First block of the free list (NO_BLOCK = pool full)
    head: CachePadded<AtomicUsize>,
    /// Last block of the free list (NO_BLOCK = list empty)
    tail: CachePadded<AtomicUsize>,
    /// Threads currently pinning `head`
    active_readers: CachePadded<AtomicUsize>,
    /// Set while head/tail are replaced; no new pins meanwhile
    takeover: CachePadded<AtomicBool>,
}

impl<W: BlockWord> ConcurrentSlotAllocatorEngine<W> {
    /// Slots tracked by one block
    pub const SLOTS_PER_BLOCK: usize = W::BITS;

    /// Create an engine with `capacity` slots, all free
    pub fn new(capacity: usize) -> Self {
        let count = block::block_count::<W>(capacity);
        let blocks: Box<[AtomicBlock<W>]> = (0..count)
            .map(|index| {
                let is_last = index + 1 == count;
                let occupancy = if is_last {
                    block::excess_mask::<W>(capacity)
                } else {
                    W::EMPTY
                };
                AtomicBlock::new(occupancy, if is_last { NO_BLOCK } else { index + 1 })
            })
            .collect();

        crate::slot_trace!(SOURCE, "Created with {} slots in {} blocks", capacity, count);

        Self {
            capacity,
            blocks,
            head: CachePadded::new(AtomicUsize::new(if count > 0 { 0 } else { NO_BLOCK })),
            tail: CachePadded::new(AtomicUsize::new(count.checked_sub(1).unwrap_or(NO_BLOCK))),
            active_readers: CachePadded::new(AtomicUsize::new(0)),
            takeover: CachePadded::new(AtomicBool::new(false)),
        }
    }

    /// Allocate a free slot
    ///
    /// Never returns a slot that another thread currently holds.
    ///
    /// # Errors
    ///
    /// Returns `Error::CapacityExhausted` if the free list is empty.
    pub fn allocate(&self) -> Result<usize> {
        let backoff = Backoff::new();
        loop {
            self.pin();

            let head = self.head.load(Ordering::Acquire);
            if head == NO_BLOCK {
                self.unpin();
                crate::slot_debug!(SOURCE, "Capacity exhausted ({} slots)", self.capacity);
                return Err(Error::CapacityExhausted { capacity: self.capacity });
            }

            let block = &self.blocks[head];
            let bit = match block::first_free_bit(block.load()) {
                Some(bit) => bit,
                None => {
                    // Head was just filled; its filler is about to advance it
                    self.unpin();
                    backoff.snooze();
                    continue;
                }
            };

            let mask = W::bit(bit);
            let previous = block::atomic_test_and_set_bit(&block.occupancy, bit, Ordering::AcqRel);
            if previous & mask != W::EMPTY {
                // Lost the race for this bit
                self.unpin();
                backoff.spin();
                continue;
            }

            let slot = block::slot_index::<W>(head, bit);
            self.unpin();

            // Exactly one claim observes the word turning full
            if previous | mask == W::FULL {
                self.advance_head(head);
            }
            return Ok(slot);
        }
    }

    /// Return a slot to the pool
    ///
    /// Releasing a slot that is not allocated is a programmer error: it is
    /// logged and panics in debug builds, and leaves the pool untouched in
    /// release builds.
    #[track_caller]
    pub fn deallocate(&self, slot: usize) {
        if let Err(error) = self.try_deallocate(slot) {
            report_precondition_violation(SOURCE, &error);
        }
    }

    /// Return a slot to the pool, reporting misuse as an error
    ///
    /// # Errors
    ///
    /// - `Error::SlotOutOfRange` if `slot >= capacity`
    /// - `Error::SlotNotAllocated` if the slot is currently free
    pub fn try_deallocate(&self, slot: usize) -> Result<()> {
        if slot >= self.capacity {
            return Err(Error::SlotOutOfRange { slot, capacity: self.capacity });
        }

        let (index, bit) = block::slot_location::<W>(slot);
        let previous = block::atomic_test_and_clear_bit(
            &self.blocks[index].occupancy,
            bit,
            Ordering::AcqRel,
        );

        if !block::is_bit_set(previous, bit) {
            return Err(Error::SlotNotAllocated { slot });
        }

        if previous == W::FULL {
            self.relink_block(index);
        }
        Ok(())
    }

    /// Total number of slots (free + allocated)
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of allocated slots (snapshot)
    pub fn len(&self) -> usize {
        let set: usize = self.blocks.iter().map(|b| b.load().count_ones()).sum();
        set - block::excess_mask::<W>(self.capacity).count_ones()
    }

    /// Whether no slots are allocated (snapshot)
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of free slots (snapshot)
    pub fn available(&self) -> usize {
        self.capacity - self.len()
    }

    /// Number of occupancy blocks backing the pool
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Whether `slot` is currently allocated (snapshot, false when out of range)
    pub fn is_allocated(&self, slot: usize) -> bool {
        if slot >= self.capacity {
            return false;
        }
        let (index, bit) = block::slot_location::<W>(slot);
        block::is_bit_set(self.blocks[index].load(), bit)
    }

    // ===== FREE-LIST MAINTENANCE (takeover window) =====

    /// Move head past `filled` if it is still the head and still full
    fn advance_head(&self, filled: usize) {
        self.begin_takeover();
        self.wait_for_readers();

        let block = &self.blocks[filled];
        // A release may have landed in between, or another filler got here first
        if self.head.load(Ordering::Relaxed) == filled && block.load() == W::FULL {
            let next = block.next_free.load(Ordering::Relaxed);
            block.next_free.store(NO_BLOCK, Ordering::Relaxed);
            block.linked.store(false, Ordering::Relaxed);

            self.head.store(next, Ordering::Release);
            if next == NO_BLOCK {
                self.tail.store(NO_BLOCK, Ordering::Relaxed);
            }
        }

        self.end_takeover();
    }

    /// Append a block that just gained a free slot to the tail of the free list
    fn relink_block(&self, index: usize) {
        self.begin_takeover();

        let block = &self.blocks[index];
        // Still linked (pending head advance) or already refilled: nothing to do
        if !block.linked.load(Ordering::Relaxed) && block.load() != W::FULL {
            block.next_free.store(NO_BLOCK, Ordering::Relaxed);
            block.linked.store(true, Ordering::Relaxed);

            let tail = self.tail.load(Ordering::Relaxed);
            if tail == NO_BLOCK {
                if self.head.load(Ordering::Relaxed) != NO_BLOCK {
                    crate::slot_error!(SOURCE, "Free list has a head but no tail");
                    panic!("free-list tail lost while head is {}", self.head.load(Ordering::Relaxed));
                }
                self.wait_for_readers();
                self.head.store(index, Ordering::Release);
            } else {
                self.blocks[tail].next_free.store(index, Ordering::Relaxed);
            }
            self.tail.store(index, Ordering::Relaxed);
        }

        self.end_takeover();
    }

    // ===== PIN / TAKEOVER PRIMITIVES =====

    fn pin(&self) {
        let backoff = Backoff::new();
        loop {
            while self.takeover.load(Ordering::Acquire) {
                backoff.snooze();
            }
            self.active_readers.fetch_add(1, Ordering::SeqCst);
            // A takeover raised between the check and the increment wins
            if !self.takeover.load(Ordering::SeqCst) {
                return;
            }
            self.active_readers.fetch_sub(1, Ordering::Release);
        }
    }

    fn unpin(&self) {
        self.active_readers.fetch_sub(1, Ordering::Release);
    }

    fn begin_takeover(&self) {
        let backoff = Backoff::new();
        while self
            .takeover
            .compare_exchange_weak(false, true, Ordering::SeqCst, Ordering::Relaxed)
            .is_err()
        {
            backoff.snooze();
        }
    }

    fn wait_for_readers(&self) {
        let backoff = Backoff::new();
        while self.active_readers.load(Ordering::SeqCst) != 0 {
            backoff.snooze();
        }
    }

    fn end_takeover(&self) {
        self.takeover.store(false, Ordering::Release);
    }
}

impl<W: BlockWord> fmt::Debug for ConcurrentSlotAllocatorEngine<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentSlotAllocatorEngine")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("blocks", &self.blocks.len())
            .field("head", &self.head.load(Ordering::Relaxed))
            .field("tail", &self.tail.load(Ordering::Relaxed))
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "concurrent_slot_allocator_engine_tests.rs"]
mod tests;
