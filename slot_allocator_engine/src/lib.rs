/*!
# Slot Allocator Engine

Fixed-size slot allocation: hand out unique integer indices from a pool of `N`
identical slots and take them back, in O(1) amortized time.

Slots are grouped into blocks tracked by one occupancy word each (bit = 1
means allocated). Blocks with free slots form an index-linked free list, so
allocation only ever looks at the free-list head.

## Architecture

- **BlockWord**: occupancy word type (`u8` .. `u64`, `usize`) and its atomic twin
- **SlotAllocatorEngine**: single-threaded engine, supports resize and reset
- **ConcurrentSlotAllocatorEngine**: thread-safe engine with fixed capacity,
  lock-free slot claims and a short spin-based takeover for free-list updates

The engines manage indices only; the storage behind a slot belongs to the caller.
*/

// Internal modules
mod error;
mod allocator;
pub mod block;
pub mod log;

// Main slotalloc namespace module
pub mod slotalloc {
    // Error types
    pub use crate::error::{Error, Result};

    // Engines
    pub use crate::allocator::{SlotAllocatorEngine, ConcurrentSlotAllocatorEngine};

    // Block word types and bit primitives
    pub use crate::block::{BlockWord, AtomicBlockWord};

    // Logging sub-module (types and configuration, macros stay at crate root)
    pub mod log {
        pub use crate::log::{
            Logger, LogEntry, LogSeverity, DefaultLogger,
            set_logger, reset_logger, set_min_severity, min_severity,
        };
    }
}
