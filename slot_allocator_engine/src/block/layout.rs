//! Slot <-> (block, bit) index arithmetic
//!
//! The mapping is fixed for a given word type: `block = slot / W`,
//! `bit = slot % W`.

use super::block_word::BlockWord;

/// Number of blocks needed to hold `capacity` slots
#[inline]
pub fn block_count<W: BlockWord>(capacity: usize) -> usize {
    capacity.div_ceil(W::BITS)
}

/// Block index and bit index of a slot
#[inline]
pub fn slot_location<W: BlockWord>(slot: usize) -> (usize, usize) {
    (slot / W::BITS, slot % W::BITS)
}

/// Flattened slot index of a (block, bit) pair
#[inline]
pub fn slot_index<W: BlockWord>(block: usize, bit: usize) -> usize {
    block * W::BITS + bit
}

/// Bits of the last block lying beyond `capacity`.
///
/// These are pinned to 1 so they are never handed out. Empty when
/// `capacity` is a multiple of the word width.
#[inline]
pub fn excess_mask<W: BlockWord>(capacity: usize) -> W {
    match capacity % W::BITS {
        0 => W::EMPTY,
        used => !W::low_bits(used),
    }
}
