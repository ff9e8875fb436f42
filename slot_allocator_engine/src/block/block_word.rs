//! Occupancy words and the bit operations both engines build on.
//!
//! A block word holds one bit per slot (1 = allocated, 0 = free). The plain
//! word is used by the single-threaded engine; its atomic counterpart by the
//! concurrent one, where every claim and release is a single `fetch_or` /
//! `fetch_and` so the pre-operation value tells the caller who won.

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};
use std::sync::atomic::{AtomicU16, AtomicU32, AtomicU64, AtomicU8, AtomicUsize, Ordering};

/// An unsigned machine word used as a block occupancy bitmap.
///
/// Implemented for `u8`, `u16`, `u32`, `u64` and `usize`. The word width
/// is the number of slots per block.
pub trait BlockWord:
    Copy
    + Eq
    + fmt::Debug
    + Send
    + Sync
    + 'static
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + Not<Output = Self>
{
    /// Number of slots tracked by one word
    const BITS: usize;

    /// All slots free
    const EMPTY: Self;

    /// All slots allocated
    const FULL: Self;

    /// Atomic version of this word, used by the concurrent engine
    type Atomic: AtomicBlockWord<Word = Self>;

    /// Word with only bit `index` set
    fn bit(index: usize) -> Self;

    /// Word with the lowest `count` bits set (`count` may equal `BITS`)
    fn low_bits(count: usize) -> Self;

    /// Number of trailing zero bits
    fn trailing_zeros(self) -> usize;

    /// Number of set bits
    fn count_ones(self) -> usize;
}

/// Atomic storage for a [`BlockWord`].
pub trait AtomicBlockWord: Send + Sync + fmt::Debug {
    /// The plain word stored inside
    type Word: BlockWord;

    fn new(word: Self::Word) -> Self;
    fn load(&self, order: Ordering) -> Self::Word;
    fn store(&self, word: Self::Word, order: Ordering);
    fn fetch_or(&self, mask: Self::Word, order: Ordering) -> Self::Word;
    fn fetch_and(&self, mask: Self::Word, order: Ordering) -> Self::Word;
}

macro_rules! impl_block_word {
    ($($word:ty => $atomic:ty),* $(,)?) => {
        $(
            impl BlockWord for $word {
                const BITS: usize = <$word>::BITS as usize;
                const EMPTY: Self = 0;
                const FULL: Self = <$word>::MAX;
                type Atomic = $atomic;

                #[inline]
                fn bit(index: usize) -> Self {
                    debug_assert!(index < <Self as BlockWord>::BITS, "bit index {} out of word", index);
                    1 << index
                }

                #[inline]
                fn low_bits(count: usize) -> Self {
                    if count >= <Self as BlockWord>::BITS {
                        Self::FULL
                    } else {
                        (1 << count) - 1
                    }
                }

                #[inline]
                fn trailing_zeros(self) -> usize {
                    <$word>::trailing_zeros(self) as usize
                }

                #[inline]
                fn count_ones(self) -> usize {
                    <$word>::count_ones(self) as usize
                }
            }

            impl AtomicBlockWord for $atomic {
                type Word = $word;

                #[inline]
                fn new(word: $word) -> Self {
                    <$atomic>::new(word)
                }

                #[inline]
                fn load(&self, order: Ordering) -> $word {
                    <$atomic>::load(self, order)
                }

                #[inline]
                fn store(&self, word: $word, order: Ordering) {
                    <$atomic>::store(self, word, order)
                }

                #[inline]
                fn fetch_or(&self, mask: $word, order: Ordering) -> $word {
                    <$atomic>::fetch_or(self, mask, order)
                }

                #[inline]
                fn fetch_and(&self, mask: $word, order: Ordering) -> $word {
                    <$atomic>::fetch_and(self, mask, order)
                }
            }
        )*
    };
}

impl_block_word! {
    u8 => AtomicU8,
    u16 => AtomicU16,
    u32 => AtomicU32,
    u64 => AtomicU64,
    usize => AtomicUsize,
}

// ===== BIT PRIMITIVES =====

/// Index of the lowest free (zero) bit, or `None` if the word is full.
#[inline]
pub fn first_free_bit<W: BlockWord>(word: W) -> Option<usize> {
    if word == W::FULL {
        None
    } else {
        Some((!word).trailing_zeros())
    }
}

/// Set bit `index` and return its previous value.
#[inline]
pub fn test_and_set_bit<W: BlockWord>(word: &mut W, index: usize) -> bool {
    let mask = W::bit(index);
    let previous = *word & mask != W::EMPTY;
    *word = *word | mask;
    previous
}

/// Clear bit `index` and return its previous value.
#[inline]
pub fn test_and_clear_bit<W: BlockWord>(word: &mut W, index: usize) -> bool {
    let mask = W::bit(index);
    let previous = *word & mask != W::EMPTY;
    *word = *word & !mask;
    previous
}

/// Atomically set bit `index`; returns the whole word as it was before.
///
/// The caller owns the bit iff it was clear in the returned word.
#[inline]
pub fn atomic_test_and_set_bit<A: AtomicBlockWord>(
    word: &A,
    index: usize,
    order: Ordering,
) -> A::Word {
    word.fetch_or(<A::Word as BlockWord>::bit(index), order)
}

/// Atomically clear bit `index`; returns the whole word as it was before.
#[inline]
pub fn atomic_test_and_clear_bit<A: AtomicBlockWord>(
    word: &A,
    index: usize,
    order: Ordering,
) -> A::Word {
    word.fetch_and(!<A::Word as BlockWord>::bit(index), order)
}

/// Whether bit `index` is set in `word`
#[inline]
pub fn is_bit_set<W: BlockWord>(word: W, index: usize) -> bool {
    word & W::bit(index) != W::EMPTY
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "block_word_tests.rs"]
mod tests;
