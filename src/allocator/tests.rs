//! Arena tests
//!
//! Organized by component:
//! - Construction: capacity handling and the backing buffer
//! - Bump: fresh allocations from the high-water mark
//! - Reuse: first-fit recycling of freed blocks
//! - Deallocation quirks: unknown and repeated frees
//! - Observer: event stream and leak diagnostic

use super::*;
use core::ptr::NonNull;

fn recorded_arena(capacity: usize) -> (FixedBlockResource, RecordingObserver) {
    let recorder = RecordingObserver::new();
    let arena = FixedBlockResource::with_observer(capacity, recorder.clone()).expect("arena");
    (arena, recorder)
}

// ===== Construction =====

#[test]
fn arena_starts_empty() {
    let arena = FixedBlockResource::new(1024).expect("arena creation");
    let stats = arena.stats();

    assert_eq!(stats.capacity, 1024);
    assert_eq!(stats.high_water, 0);
    assert_eq!(stats.used_blocks, 0);
    assert_eq!(stats.free_blocks, 0);
    assert_eq!(stats.untouched(), 1024);
}

#[test]
fn oversized_capacity_is_rejected() {
    let err = FixedBlockResource::new(usize::MAX).unwrap_err();
    assert_eq!(err, AllocError::InvalidCapacity { capacity: usize::MAX });
}

#[test]
fn zero_capacity_arena_refuses_everything() {
    let arena = FixedBlockResource::new(0).expect("empty arena");
    let err = arena.allocate(1, 1).unwrap_err();
    assert_eq!(err, AllocError::OutOfMemory { requested: 1, available: 0 });
}

#[test]
fn buffer_base_is_aligned() {
    let arena = FixedBlockResource::new(64).expect("arena");
    let ptr = arena.allocate(8, 8).expect("alloc");
    assert_eq!(ptr.as_ptr() as usize % BUFFER_ALIGN, 0);
}

// ===== Bump =====

#[test]
fn sequential_allocations_are_contiguous() {
    let arena = FixedBlockResource::new(64).expect("arena");

    let a = arena.allocate(16, 8).expect("first");
    let b = arena.allocate(16, 8).expect("second");
    let c = arena.allocate(8, 8).expect("third");

    assert_eq!(b.as_ptr() as usize - a.as_ptr() as usize, 16);
    assert_eq!(c.as_ptr() as usize - b.as_ptr() as usize, 16);
    assert_eq!(arena.high_water(), 40);
}

#[test]
fn exhaustion_leaves_state_unchanged() {
    let arena = FixedBlockResource::new(40).expect("arena");
    arena.allocate(32, 8).expect("fits");
    let before = arena.stats();

    let err = arena.allocate(16, 8).unwrap_err();
    assert_eq!(err, AllocError::OutOfMemory { requested: 16, available: 8 });
    assert_eq!(arena.stats(), before);

    // The remainder is still usable by a request that fits
    arena.allocate(8, 8).expect("exact fit");
    assert_eq!(arena.high_water(), 40);
}

#[test]
fn zero_byte_request_gets_distinct_block() {
    let arena = FixedBlockResource::new(8).expect("arena");
    let a = arena.allocate(0, 1).expect("zero");
    let b = arena.allocate(0, 1).expect("zero again");

    assert_ne!(a, b);
    assert_eq!(arena.high_water(), 2);
}

#[test]
fn alignment_hint_is_ignored() {
    let arena = FixedBlockResource::new(64).expect("arena");
    arena.allocate(3, 1).expect("odd size");
    let ptr = arena.allocate(8, 8).expect("second");

    assert_eq!(ptr.as_ptr() as usize % 8, 3);
}

// ===== Reuse =====

#[test]
fn freed_block_is_reused_before_bumping() {
    let arena = FixedBlockResource::new(64).expect("arena");
    let a = arena.allocate(16, 8).expect("a");
    arena.allocate(16, 8).expect("b");

    unsafe { arena.deallocate(a, 16, 8) };
    let c = arena.allocate(16, 8).expect("reuse");

    assert_eq!(a, c);
    assert_eq!(arena.high_water(), 32);
}

#[test]
fn reuse_is_first_fit_not_best_fit() {
    let arena = FixedBlockResource::new(128).expect("arena");
    let big = arena.allocate(48, 8).expect("big");
    let small = arena.allocate(16, 8).expect("small");
    arena.allocate(8, 8).expect("spacer");

    unsafe {
        arena.deallocate(big, 48, 8);
        arena.deallocate(small, 16, 8);
    }

    // The 48-byte block was freed first and is large enough, so it wins
    let got = arena.allocate(16, 8).expect("first fit");
    assert_eq!(got, big);

    let stats = arena.stats();
    assert_eq!(stats.used_bytes, 48 + 8);
    assert_eq!(arena.free_blocks(), vec![MemoryBlock::new(48, 16)]);
}

#[test]
fn free_blocks_are_never_coalesced() {
    let arena = FixedBlockResource::new(32).expect("arena");
    let a = arena.allocate(16, 8).expect("a");
    let b = arena.allocate(16, 8).expect("b");

    unsafe {
        arena.deallocate(a, 16, 8);
        arena.deallocate(b, 16, 8);
    }

    assert_eq!(arena.stats().free_bytes, 32);
    let err = arena.allocate(32, 8).unwrap_err();
    assert_eq!(err, AllocError::OutOfMemory { requested: 32, available: 0 });
}

// ===== Deallocation quirks =====

#[test]
fn unknown_address_is_silently_ignored() {
    let (arena, recorder) = recorded_arena(64);
    let a = arena.allocate(16, 8).expect("a");
    recorder.drain();

    let mut foreign = 0u64;
    unsafe {
        arena.deallocate(NonNull::from(&mut foreign).cast(), 8, 8);
        // Interior address of a live block is not a block start
        arena.deallocate(NonNull::new_unchecked(a.as_ptr().add(4)), 16, 8);
    }

    assert!(recorder.is_empty());
    assert_eq!(arena.stats().used_blocks, 1);
}

#[test]
fn double_free_is_a_no_op() {
    let (arena, recorder) = recorded_arena(64);
    let a = arena.allocate(16, 8).expect("a");

    unsafe {
        arena.deallocate(a, 16, 8);
        arena.deallocate(a, 16, 8);
    }

    let frees = recorder
        .events()
        .iter()
        .filter(|e| matches!(e, ArenaEvent::DeallocFree { .. }))
        .count();
    assert_eq!(frees, 1);
    assert_eq!(arena.stats().free_blocks, 1);
}

#[test]
fn owns_tracks_live_blocks() {
    let arena = FixedBlockResource::new(64).expect("arena");
    let a = arena.allocate(16, 8).expect("a");
    assert!(arena.owns(a));

    unsafe { arena.deallocate(a, 16, 8) };
    assert!(!arena.owns(a));
}

#[test]
fn equality_is_identity() {
    let a = FixedBlockResource::new(64).expect("a");
    let b = FixedBlockResource::new(64).expect("b");

    assert!(a.is_equal(&a));
    assert!(!a.is_equal(&b));
    assert_eq!(a, a);
    assert_ne!(a, b);
}

// ===== Observer =====

#[test]
fn events_report_kind_address_and_size() {
    let (arena, recorder) = recorded_arena(64);
    let a = arena.allocate(16, 8).expect("a");
    unsafe { arena.deallocate(a, 16, 8) };
    arena.allocate(8, 8).expect("reuse");

    let addr = a.as_ptr() as usize;
    assert_eq!(
        recorder.events(),
        vec![
            ArenaEvent::AllocNew { address: addr, offset: 0, size: 16 },
            ArenaEvent::DeallocFree { address: addr, offset: 0, size: 16 },
            ArenaEvent::AllocReuse { address: addr, offset: 0, size: 16 },
        ]
    );
}

#[test]
fn failed_allocation_emits_nothing() {
    let (arena, recorder) = recorded_arena(8);
    assert!(arena.allocate(16, 8).is_err());
    assert!(recorder.is_empty());
}

#[test]
fn leak_reported_on_drop() {
    let (arena, recorder) = recorded_arena(64);
    arena.allocate(16, 8).expect("a");
    arena.allocate(8, 8).expect("b");
    drop(arena);

    assert_eq!(recorder.last(), Some(ArenaEvent::Leak { blocks: 2, bytes: 24 }));
}

#[test]
fn clean_drop_reports_no_leak() {
    let (arena, recorder) = recorded_arena(64);
    let a = arena.allocate(16, 8).expect("a");
    unsafe { arena.deallocate(a, 16, 8) };
    drop(arena);

    assert!(recorder.events().iter().all(|e| e.kind() != "leak"));
}
