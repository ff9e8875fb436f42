//! Stress tests for ConcurrentSlotAllocatorEngine
//!
//! T threads each perform M interleaved allocate/deallocate calls against a
//! shared engine whose capacity is smaller than T*M. Afterwards the live
//! slots must be distinct and match the net number of allocations.
//!
//! Run with: cargo test --release --test concurrent_stress_tests

use rustc_hash::FxHashSet;
use slot_allocator_engine::slotalloc::{ConcurrentSlotAllocatorEngine, Error};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Small xorshift generator so each thread gets its own operation mix
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }
}

fn run_stress<W>(capacity: usize, threads: usize, operations: usize)
where
    W: slot_allocator_engine::slotalloc::BlockWord,
{
    assert!(capacity < threads * operations);

    let engine = Arc::new(ConcurrentSlotAllocatorEngine::<W>::new(capacity));
    let allocations = Arc::new(AtomicUsize::new(0));
    let deallocations = Arc::new(AtomicUsize::new(0));
    let live = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = (0..threads)
        .map(|thread| {
            let engine = Arc::clone(&engine);
            let allocations = Arc::clone(&allocations);
            let deallocations = Arc::clone(&deallocations);
            let live = Arc::clone(&live);
            std::thread::spawn(move || {
                let mut rng = XorShift(0x9E37_79B9_7F4A_7C15 ^ (thread as u64 + 1));
                let mut held: Vec<usize> = Vec::new();

                for _ in 0..operations {
                    // ~60% allocations so the pool keeps hitting exhaustion
                    if rng.next() % 10 < 6 || held.is_empty() {
                        match engine.allocate() {
                            Ok(slot) => {
                                assert!(slot < capacity);
                                allocations.fetch_add(1, Ordering::Relaxed);
                                held.push(slot);
                            }
                            Err(error) => {
                                assert_eq!(error, Error::CapacityExhausted { capacity });
                            }
                        }
                    } else {
                        let victim = rng.next() as usize % held.len();
                        let slot = held.swap_remove(victim);
                        engine.deallocate(slot);
                        deallocations.fetch_add(1, Ordering::Relaxed);
                    }
                }

                live.lock().unwrap().extend(held);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let live = live.lock().unwrap();
    let unique: FxHashSet<usize> = live.iter().copied().collect();
    assert_eq!(unique.len(), live.len(), "a slot is held by two threads");

    let net = allocations.load(Ordering::Relaxed) - deallocations.load(Ordering::Relaxed);
    assert_eq!(unique.len(), net);
    assert_eq!(engine.len(), net);
    for slot in &unique {
        assert!(engine.is_allocated(*slot));
    }
}

#[test]
fn test_stress_small_blocks() {
    run_stress::<u8>(61, 8, 5_000);
}

#[test]
fn test_stress_word_blocks() {
    run_stress::<u64>(500, 8, 5_000);
}

#[test]
fn test_stress_single_block() {
    run_stress::<u32>(20, 4, 10_000);
}

#[test]
fn test_stress_then_drain_and_refill() {
    const CAPACITY: usize = 300;
    let engine = ConcurrentSlotAllocatorEngine::<u16>::new(CAPACITY);

    // Every thread grabs as much as it can, then releases everything
    std::thread::scope(|s| {
        for _ in 0..6 {
            s.spawn(|| {
                for _ in 0..50 {
                    let held: Vec<usize> =
                        std::iter::from_fn(|| engine.allocate().ok()).take(40).collect();
                    for slot in held {
                        engine.deallocate(slot);
                    }
                }
            });
        }
    });

    assert!(engine.is_empty());

    let mut all: Vec<usize> = std::iter::from_fn(|| engine.allocate().ok()).collect();
    all.sort_unstable();
    assert_eq!(all, (0..CAPACITY).collect::<Vec<_>>());
}
