//! Block module
//!
//! Occupancy words, bit primitives and slot index arithmetic shared by
//! both engine variants.

mod block_word;
mod layout;
mod slot_block;

pub use block_word::{
    BlockWord, AtomicBlockWord,
    first_free_bit, test_and_set_bit, test_and_clear_bit,
    atomic_test_and_set_bit, atomic_test_and_clear_bit, is_bit_set,
};
pub use layout::{block_count, slot_location, slot_index, excess_mask};
pub(crate) use slot_block::{Block, AtomicBlock, NO_BLOCK};
