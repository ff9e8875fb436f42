//! Slot allocation engines
//!
//! Two variants of the same block/free-list algorithm:
//! - `SlotAllocatorEngine`: single-threaded, resizable
//! - `ConcurrentSlotAllocatorEngine`: lock-minimized, fixed capacity

mod slot_allocator_engine;
mod concurrent_slot_allocator_engine;

pub use slot_allocator_engine::SlotAllocatorEngine;
pub use concurrent_slot_allocator_engine::ConcurrentSlotAllocatorEngine;

use std::panic::Location;
use crate::error::Error;
use crate::log::{self, LogSeverity};

/// Log a misuse of `deallocate` and stop in debug builds.
///
/// The ERROR entry carries the location of the `deallocate` call.
#[track_caller]
fn report_precondition_violation(source: &str, error: &Error) {
    if log::is_enabled(LogSeverity::Error) {
        let caller = Location::caller();
        log::log_detailed(
            LogSeverity::Error,
            source,
            format!("Precondition violated: {}", error),
            caller.file(),
            caller.line(),
        );
    }
    if cfg!(debug_assertions) {
        panic!("deallocate precondition violated: {}", error);
    }
}
