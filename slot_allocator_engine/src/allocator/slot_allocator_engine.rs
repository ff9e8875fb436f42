//! Single-threaded, resizable slot allocation engine

use std::fmt;
use crate::block::{self, Block, BlockWord};
use crate::error::{Error, Result};
use super::report_precondition_violation;

const SOURCE: &str = "slotalloc::SlotAllocatorEngine";

/// Single-threaded, resizable slot allocation engine.
///
/// Hands out unique slot indices in `0..capacity` from a fixed pool and
/// takes them back, in O(1) amortized time. Slots are grouped into blocks
/// of `W::BITS` slots tracked by one occupancy word; blocks with at least
/// one free slot are chained into an index-linked free list.
///
/// This type does not allocate storage for the objects living in the slots,
/// only the indices. It has no internal synchronization.
///
/// # Example
///
/// ```
/// use slot_allocator_engine::slotalloc::SlotAllocatorEngine;
///
/// let mut engine = SlotAllocatorEngine::<u8>::new(4);
/// assert_eq!(engine.allocate().unwrap(), 0);
/// assert_eq!(engine.allocate().unwrap(), 1);
/// engine.deallocate(0);
/// assert_eq!(engine.allocate().unwrap(), 0); // recycled
/// ```
#[derive(Clone)]
pub struct SlotAllocatorEngine<W: BlockWord = usize> {
    /// Number of usable slots
    capacity: usize,
    /// One occupancy word per `W::BITS` slots
    blocks: Vec<Block<W>>,
    /// First block of the free list
    head: Option<usize>,
    /// Number of currently allocated slots
    len: usize,
}

impl<W: BlockWord> SlotAllocatorEngine<W> {
    /// Slots tracked by one block
    pub const SLOTS_PER_BLOCK: usize = W::BITS;

    /// Create an engine with `capacity` slots, all free
    pub fn new(capacity: usize) -> Self {
        let mut engine = Self {
            capacity,
            blocks: vec![Block::empty(); block::block_count::<W>(capacity)],
            head: None,
            len: 0,
        };
        engine.clear();
        crate::slot_trace!(SOURCE, "Created with {} slots in {} blocks", capacity, engine.blocks.len());
        engine
    }

    /// Allocate a free slot
    ///
    /// # Errors
    ///
    /// Returns `Error::CapacityExhausted` if every slot is allocated.
    pub fn allocate(&mut self) -> Result<usize> {
        let head = match self.head {
            Some(head) => head,
            None => {
                crate::slot_debug!(SOURCE, "Capacity exhausted ({} slots)", self.capacity);
                return Err(Error::CapacityExhausted { capacity: self.capacity });
            }
        };

        let block = &mut self.blocks[head];
        let bit = match block::first_free_bit(block.occupancy) {
            Some(bit) => bit,
            None => {
                crate::slot_error!(SOURCE, "Full block {} is the free-list head", head);
                panic!("free-list head block {} has no free slot", head);
            }
        };

        let was_set = block::test_and_set_bit(&mut block.occupancy, bit);
        debug_assert!(!was_set);

        if block.is_full() {
            self.head = block.next_free;
        }

        self.len += 1;
        Ok(block::slot_index::<W>(head, bit))
    }

    /// Return a slot to the pool
    ///
    /// Releasing a slot that is not allocated is a programmer error: it is
    /// logged and panics in debug builds, and leaves the pool untouched in
    /// release builds.
    #[track_caller]
    pub fn deallocate(&mut self, slot: usize) {
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
    pub fn try_deallocate(&mut self, slot: usize) -> Result<()> {
        if slot >= self.capacity {
            return Err(Error::SlotOutOfRange { slot, capacity: self.capacity });
        }

        let (index, bit) = block::slot_location::<W>(slot);
        let block = &mut self.blocks[index];
        let was_full = block.is_full();

        if !block::test_and_clear_bit(&mut block.occupancy, bit) {
            return Err(Error::SlotNotAllocated { slot });
        }
        self.len -= 1;

        // Freed blocks go to the front: reuse them before scanning further
        if was_full && self.head != Some(index) {
            block.next_free = self.head;
            self.head = Some(index);
        }
        Ok(())
    }

    /// Change the number of slots
    ///
    /// Allocated slots below the new capacity stay allocated. Slots beyond it
    /// are dropped; the caller must have vacated them.
    pub fn resize(&mut self, new_capacity: usize) {
        let old_capacity = self.capacity;

        if new_capacity == 0 {
            self.blocks.clear();
            self.head = None;
            self.capacity = 0;
            self.len = 0;
            crate::slot_debug!(SOURCE, "Resized {} -> 0 slots", old_capacity);
            return;
        }

        let old_block_count = self.blocks.len();
        let new_block_count = block::block_count::<W>(new_capacity);

        // Overlapping prefix keeps its occupancy, new blocks start empty
        self.blocks.resize(new_block_count, Block::empty());

        // Slots pinned beyond the old capacity become usable
        if old_block_count > 0 && new_capacity > old_capacity {
            let old_last = &mut self.blocks[old_block_count - 1];
            old_last.occupancy = old_last.occupancy & !block::excess_mask::<W>(old_capacity);
        }

        let new_last = &mut self.blocks[new_block_count - 1];
        new_last.occupancy = new_last.occupancy | block::excess_mask::<W>(new_capacity);

        self.capacity = new_capacity;
        self.relink_free_blocks();
        self.len = self.count_allocated();

        crate::slot_debug!(
            SOURCE,
            "Resized {} -> {} slots ({} blocks, {} allocated)",
            old_capacity,
            new_capacity,
            new_block_count,
            self.len
        );
    }

    /// Mark every slot free, keeping the capacity
    pub fn reset(&mut self) {
        self.clear();
        crate::slot_trace!(SOURCE, "Reset {} slots", self.capacity);
    }

    fn clear(&mut self) {
        let block_count = self.blocks.len();
        for (index, block) in self.blocks.iter_mut().enumerate() {
            block.occupancy = W::EMPTY;
            block.next_free = (index + 1 < block_count).then_some(index + 1);
        }

        if let Some(last) = self.blocks.last_mut() {
            last.occupancy = block::excess_mask::<W>(self.capacity);
        }

        self.head = (block_count > 0).then_some(0);
        self.len = 0;
    }

    /// Total number of slots (free + allocated)
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of currently allocated slots
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no slots are currently allocated
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of free slots
    pub fn available(&self) -> usize {
        self.capacity - self.len
    }

    /// Number of occupancy blocks backing the pool
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Whether `slot` is currently allocated (false when out of range)
    pub fn is_allocated(&self, slot: usize) -> bool {
        if slot >= self.capacity {
            return false;
        }
        let (index, bit) = block::slot_location::<W>(slot);
        block::is_bit_set(self.blocks[index].occupancy, bit)
    }

    /// Chain every block with a free slot, lowest index first
    fn relink_free_blocks(&mut self) {
        let mut next = None;
        for index in (0..self.blocks.len()).rev() {
            let block = &mut self.blocks[index];
            if !block.is_full() {
                block.next_free = next;
                next = Some(index);
            }
        }
        self.head = next;
    }

    /// Count set bits, minus the pinned tail of the last block
    fn count_allocated(&self) -> usize {
        let set: usize = self.blocks.iter().map(|b| b.occupancy.count_ones()).sum();
        set - block::excess_mask::<W>(self.capacity).count_ones()
    }
}

impl<W: BlockWord> Default for SlotAllocatorEngine<W> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<W: BlockWord> fmt::Debug for SlotAllocatorEngine<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotAllocatorEngine")
            .field("capacity", &self.capacity)
            .field("len", &self.len)
            .field("blocks", &self.blocks.len())
            .field("head", &self.head)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "slot_allocator_engine_tests.rs"]
mod tests;
