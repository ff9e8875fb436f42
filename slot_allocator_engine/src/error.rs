//! Error types for the slot allocation engines
//!
//! This module defines the errors reported by both engine variants:
//! pool exhaustion on allocation and misuse of slot indices on release.

use std::fmt;

/// Result type for slot engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Slot engine errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Every slot of the pool is currently allocated
    CapacityExhausted {
        /// Number of slots in the pool
        capacity: usize,
    },

    /// Slot index does not belong to the pool
    SlotOutOfRange {
        /// The offending slot index
        slot: usize,
        /// Number of slots in the pool
        capacity: usize,
    },

    /// Slot is inside the pool but is not currently allocated
    SlotNotAllocated {
        /// The offending slot index
        slot: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::CapacityExhausted { capacity } => {
                write!(f, "Capacity exhausted: all {} slots are allocated", capacity)
            }
            Error::SlotOutOfRange { slot, capacity } => {
                write!(f, "Slot out of range: {} (capacity {})", slot, capacity)
            }
            Error::SlotNotAllocated { slot } => {
                write!(f, "Slot not allocated: {}", slot)
            }
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
