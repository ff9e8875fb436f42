//! Integration tests for the engine logging system
//!
//! These tests install a capturing logger and check which entries the
//! engines emit, at which severity, and how the minimum severity filter
//! gates them.
//!
//! Run with: cargo test --test logging_integration_tests

use slot_allocator_engine::slotalloc::log::{self, LogEntry, LogSeverity, Logger};
use slot_allocator_engine::slotalloc::{ConcurrentSlotAllocatorEngine, SlotAllocatorEngine};
use serial_test::serial;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

// ============================================================================
// TEST LOGGER IMPLEMENTATION
// ============================================================================

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

/// Install a capturing logger with the given minimum severity
fn capture(min: LogSeverity) -> Arc<Mutex<Vec<LogEntry>>> {
    let (test_logger, entries) = TestLogger::new();
    log::set_logger(test_logger);
    log::set_min_severity(min);
    entries
}

/// Restore default logger and severity
fn restore() {
    log::reset_logger();
    log::set_min_severity(LogSeverity::Info);
}

// ============================================================================
// ENGINE LOGGING TESTS
// ============================================================================

#[test]
#[serial]
fn test_integration_engine_lifecycle_is_traced() {
    let entries = capture(LogSeverity::Trace);

    let mut engine = SlotAllocatorEngine::<u8>::new(4);
    engine.reset();

    {
        let captured = entries.lock().unwrap();
        assert_eq!(captured.len(), 2);

        assert_eq!(captured[0].severity, LogSeverity::Trace);
        assert_eq!(captured[0].source, "slotalloc::SlotAllocatorEngine");
        assert_eq!(captured[0].message, "Created with 4 slots in 1 blocks");

        assert_eq!(captured[1].severity, LogSeverity::Trace);
        assert_eq!(captured[1].message, "Reset 4 slots");
        assert!(captured[1].file.is_none());
    }

    restore();
}

#[test]
#[serial]
fn test_integration_resize_and_exhaustion_are_debug() {
    let entries = capture(LogSeverity::Debug);

    let mut engine = SlotAllocatorEngine::<u8>::new(4);
    for _ in 0..4 {
        engine.allocate().unwrap();
    }
    assert!(engine.allocate().is_err());
    engine.resize(12);

    {
        let captured = entries.lock().unwrap();
        // Construction is TRACE and filtered out
        assert_eq!(captured.len(), 2);

        assert_eq!(captured[0].severity, LogSeverity::Debug);
        assert_eq!(captured[0].message, "Capacity exhausted (4 slots)");

        assert_eq!(captured[1].severity, LogSeverity::Debug);
        assert!(captured[1].message.starts_with("Resized 4 -> 12 slots"));
        assert!(captured[1].message.contains("4 allocated"));
    }

    restore();
}

#[test]
#[serial]
fn test_integration_precondition_violation_is_error_with_location() {
    let entries = capture(LogSeverity::Info);

    let mut engine = SlotAllocatorEngine::<u8>::new(8);
    let slot = engine.allocate().unwrap();
    engine.deallocate(slot);

    // Debug builds panic after logging, release builds return quietly
    let misuse_line = line!() + 1;
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| engine.deallocate(slot)));
    assert_eq!(outcome.is_err(), cfg!(debug_assertions));

    {
        let captured = entries.lock().unwrap();
        assert_eq!(captured.len(), 1);

        let entry = &captured[0];
        assert_eq!(entry.severity, LogSeverity::Error);
        assert_eq!(entry.source, "slotalloc::SlotAllocatorEngine");
        assert_eq!(entry.message, "Precondition violated: Slot not allocated: 0");
        // Location of the offending call, not of the engine internals
        assert_eq!(entry.file, Some(file!()));
        assert_eq!(entry.line, Some(misuse_line));
    }

    restore();
}

#[test]
#[serial]
fn test_integration_concurrent_engine_logs_out_of_range_release() {
    let entries = capture(LogSeverity::Trace);

    let engine = ConcurrentSlotAllocatorEngine::<u16>::new(10);
    let misuse_line = line!() + 1;
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| engine.deallocate(42)));
    assert_eq!(outcome.is_err(), cfg!(debug_assertions));

    {
        let captured = entries.lock().unwrap();
        assert_eq!(captured.len(), 2);

        assert_eq!(captured[0].severity, LogSeverity::Trace);
        assert_eq!(captured[0].source, "slotalloc::ConcurrentSlotAllocatorEngine");
        assert_eq!(captured[0].message, "Created with 10 slots in 1 blocks");

        assert_eq!(captured[1].severity, LogSeverity::Error);
        assert_eq!(
            captured[1].message,
            "Precondition violated: Slot out of range: 42 (capacity 10)"
        );
        assert_eq!(captured[1].file, Some(file!()));
        assert_eq!(captured[1].line, Some(misuse_line));
    }

    restore();
}

#[test]
#[serial]
fn test_integration_try_deallocate_does_not_log() {
    let entries = capture(LogSeverity::Trace);

    let mut engine = SlotAllocatorEngine::<u8>::new(8);
    assert!(engine.try_deallocate(3).is_err());

    {
        // Only the construction entry
        let captured = entries.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].severity, LogSeverity::Trace);
    }

    restore();
}

// ============================================================================
// LOGGER ROUTING TESTS
// ============================================================================

#[test]
#[serial]
fn test_integration_default_severity_hides_engine_chatter() {
    let (test_logger, entries) = TestLogger::new();
    log::set_logger(test_logger);
    assert_eq!(log::min_severity(), LogSeverity::Info);

    let mut engine = SlotAllocatorEngine::<u8>::new(1);
    engine.allocate().unwrap();
    assert!(engine.allocate().is_err());
    engine.resize(2);

    assert!(entries.lock().unwrap().is_empty());

    restore();
}

#[test]
#[serial]
fn test_integration_error_logging_with_location() {
    let entries = capture(LogSeverity::Info);

    slot_allocator_engine::log::log_detailed(
        LogSeverity::Error,
        "test::error",
        "Critical error occurred".to_string(),
        "test_file.rs",
        42,
    );

    {
        let captured = entries.lock().unwrap();
        assert_eq!(captured.len(), 1);

        let entry = &captured[0];
        assert_eq!(entry.severity, LogSeverity::Error);
        assert_eq!(entry.source, "test::error");
        assert_eq!(entry.message, "Critical error occurred");
        assert_eq!(entry.file, Some("test_file.rs"));
        assert_eq!(entry.line, Some(42));
    }

    restore();
}

#[test]
#[serial]
fn test_integration_logger_reset() {
    let entries = capture(LogSeverity::Trace);

    let _first = SlotAllocatorEngine::<u8>::new(1);
    assert_eq!(entries.lock().unwrap().len(), 1);

    // Back to the default logger: nothing more is captured
    log::reset_logger();
    let _second = SlotAllocatorEngine::<u8>::new(1);
    assert_eq!(entries.lock().unwrap().len(), 1);

    restore();
}
