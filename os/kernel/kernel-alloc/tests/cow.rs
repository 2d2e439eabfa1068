mod common;

use common::{Arena, TestHart, pa};
use kernel_alloc::cow::CowFrameAllocator;
use kernel_alloc::phys_mapper::OffsetPhysMapper;
use kernel_alloc::{CowError, FrameAllocator, FrameError, FrameRegion, RegionError};
use kernel_info::memory::{ALLOC_JUNK, FREE_JUNK, KERNBASE, MANAGED_FRAMES, PHYSTOP};
use kernel_memory_addresses::{PhysicalPage, Size4K};
use std::collections::HashSet;
use std::sync::Barrier;

type Kmem<'t> = CowFrameAllocator<'t, OffsetPhysMapper, TestHart>;

/// Allocator over the whole arena, fully populated.
fn kmem<'t>(arena: &Arena, refs: &'t mut [u32]) -> Kmem<'t> {
    let mut kmem = Kmem::new(arena.region(), refs, arena.mapper(), TestHart).unwrap();
    let released = kmem.init(arena.base(), arena.top());
    assert_eq!(released, arena.frames());
    kmem
}

fn drain(kmem: &Kmem<'_>) -> Vec<PhysicalPage<Size4K>> {
    std::iter::from_fn(|| kmem.alloc()).collect()
}

#[test]
fn init_over_managed_ram_yields_32768_frames() {
    let arena = Arena::new(MANAGED_FRAMES);
    let mut refs = vec![0; MANAGED_FRAMES];
    let mut kmem =
        Kmem::new(FrameRegion::kernel(), &mut refs, arena.mapper(), TestHart).unwrap();

    let released = kmem.init(pa(KERNBASE), pa(PHYSTOP));
    assert_eq!(released, 32768);
    assert_eq!(kmem.free_frames(), 32768);
    assert_eq!(kmem.refcount_get(pa(KERNBASE)), 0);
    assert_eq!(kmem.refcount_get(pa(PHYSTOP - 4096)), 0);
}

#[test]
fn init_rounds_start_up_and_drops_partial_tail() {
    let arena = Arena::new(8);
    let mut refs = vec![0; 8];
    let mut kmem = Kmem::new(arena.region(), &mut refs, arena.mapper(), TestHart).unwrap();

    let released = kmem.init(pa(KERNBASE + 0x10), pa(KERNBASE + 5 * 4096 + 0x800));
    assert_eq!(released, 4);

    // The first partial frame was skipped, so it is not ours to free.
    assert_eq!(
        kmem.try_free(pa(KERNBASE)),
        Err(FrameError::OutOfRange(pa(KERNBASE)))
    );
}

#[test]
fn new_rejects_short_refcount_table() {
    let arena = Arena::new(4);
    let mut refs = vec![0; 3];
    let err = Kmem::new(arena.region(), &mut refs, arena.mapper(), TestHart).err();
    assert_eq!(
        err,
        Some(RegionError::TableTooSmall {
            needed: 4,
            actual: 3
        })
    );
}

#[test]
fn early_allocations_return_high_addresses() {
    let arena = Arena::new(4);
    let mut refs = vec![0; 4];
    let kmem = kmem(&arena, &mut refs);

    let first = kmem.alloc().unwrap();
    assert_eq!(first.base(), pa(KERNBASE + 3 * 4096));
}

#[test]
fn alloc_sets_refcount_and_alloc_junk() {
    let arena = Arena::new(4);
    let mut refs = vec![0; 4];
    let kmem = kmem(&arena, &mut refs);

    let p = kmem.alloc().unwrap();
    assert_eq!(kmem.refcount_get(p.base()), 1);
    assert!(arena.bytes(p).iter().all(|&b| b == ALLOC_JUNK));
    assert_eq!(kmem.free_frames(), 3);
}

#[test]
fn last_free_fills_free_junk_and_recycles() {
    let arena = Arena::new(4);
    let mut refs = vec![0; 4];
    let kmem = kmem(&arena, &mut refs);

    let p = kmem.alloc().unwrap();
    arena.write(p, b"payload");
    kmem.free(p.base());

    assert_eq!(kmem.refcount_get(p.base()), 0);
    assert_eq!(kmem.free_frames(), 4);
    // The first word holds the list link.
    assert!(arena.bytes(p)[8..].iter().all(|&b| b == FREE_JUNK));
    assert_eq!(kmem.alloc(), Some(p));
}

#[test]
fn shared_frame_survives_until_last_free() {
    let arena = Arena::new(4);
    let mut refs = vec![0; 4];
    let kmem = kmem(&arena, &mut refs);

    let p = kmem.alloc().unwrap();
    assert_eq!(kmem.refcount_get(p.base()), 1);

    kmem.refcount_set(p.base(), 2);
    assert_eq!(kmem.refcount_get(p.base()), 2);

    kmem.free(p.base());
    assert_eq!(kmem.refcount_get(p.base()), 1);
    assert_eq!(kmem.free_frames(), 3);

    // Not reusable: the remaining frames are handed out, then nothing.
    let rest = drain(&kmem);
    assert_eq!(rest.len(), 3);
    assert!(!rest.contains(&p));
    assert!(kmem.alloc().is_none());

    kmem.free(p.base());
    assert_eq!(kmem.refcount_get(p.base()), 0);
    assert_eq!(kmem.alloc(), Some(p));
}

#[test]
fn refcount_set_then_get_round_trips() {
    let arena = Arena::new(2);
    let mut refs = vec![0; 2];
    let kmem = kmem(&arena, &mut refs);

    let p = kmem.alloc().unwrap();
    for n in [0, 1, 7, u32::MAX] {
        kmem.refcount_set(p.base(), n);
        assert_eq!(kmem.refcount_get(p.base()), n);
    }
}

#[test]
fn refcount_zero_iff_on_free_list() {
    let arena = Arena::new(16);
    let mut refs = vec![0; 16];
    let kmem = kmem(&arena, &mut refs);
    let region = arena.region();

    let taken = drain(&kmem);
    assert_eq!(taken.len(), 16);
    let unique: HashSet<_> = taken.iter().copied().collect();
    assert_eq!(unique.len(), 16, "a frame was handed out twice");

    // Give back every other frame.
    for f in taken.iter().step_by(2) {
        kmem.free(f.base());
    }
    let free: HashSet<_> = taken.iter().step_by(2).copied().collect();

    for i in 0..region.frame_count() {
        let f = region.frame_at(i).unwrap();
        let n = kmem.refcount_get(f.base());
        assert_eq!(n == 0, free.contains(&f), "frame {f} refcount {n}");
    }

    // free + outstanding is constant
    assert_eq!(kmem.free_frames() + (taken.len() - free.len()), 16);
    let again: HashSet<_> = drain(&kmem).into_iter().collect();
    assert_eq!(again, free);
}

#[test]
fn try_free_rejects_bad_addresses() {
    let arena = Arena::new(4);
    let mut refs = vec![0; 4];
    let kmem = kmem(&arena, &mut refs);

    let p = kmem.alloc().unwrap();
    let odd = pa(p.base().as_u64() + 8);
    assert_eq!(kmem.try_free(odd), Err(FrameError::Misaligned(odd)));
    assert_eq!(
        kmem.try_free(arena.top()),
        Err(FrameError::OutOfRange(arena.top()))
    );
    assert_eq!(
        kmem.try_free(pa(KERNBASE - 4096)),
        Err(FrameError::OutOfRange(pa(KERNBASE - 4096)))
    );

    kmem.free(p.base());
    assert_eq!(kmem.try_free(p.base()), Err(FrameError::DoubleFree(p.base())));
    assert!(TestHart::irq_on());
}

#[test]
#[should_panic(expected = "already free")]
fn double_free_panics() {
    let arena = Arena::new(2);
    let mut refs = vec![0; 2];
    let kmem = kmem(&arena, &mut refs);

    let p = kmem.alloc().unwrap();
    kmem.free(p.base());
    kmem.free(p.base());
}

#[test]
#[should_panic(expected = "not page aligned")]
fn misaligned_free_panics() {
    let arena = Arena::new(2);
    let mut refs = vec![0; 2];
    let kmem = kmem(&arena, &mut refs);
    kmem.free(pa(KERNBASE + 12));
}

#[test]
fn increment_shares_a_frame() {
    let arena = Arena::new(2);
    let mut refs = vec![0; 2];
    let kmem = kmem(&arena, &mut refs);

    let p = kmem.alloc().unwrap();
    assert_eq!(kmem.refcount_increment(p.base()), 2);
    assert_eq!(kmem.refcount_increment(p.base()), 3);
    kmem.free(p.base());
    kmem.free(p.base());
    assert_eq!(kmem.free_frames(), 1);
    kmem.free(p.base());
    assert_eq!(kmem.free_frames(), 2);
}

#[test]
#[should_panic(expected = "is free")]
fn increment_of_free_frame_panics() {
    let arena = Arena::new(2);
    let mut refs = vec![0; 2];
    let kmem = kmem(&arena, &mut refs);
    let _ = kmem.refcount_increment(pa(KERNBASE));
}

#[test]
fn copy_on_write_keeps_sole_owner_in_place() {
    let arena = Arena::new(2);
    let mut refs = vec![0; 2];
    let kmem = kmem(&arena, &mut refs);

    let p = kmem.alloc().unwrap();
    assert_eq!(kmem.copy_on_write(p.base()), Ok(p));
    assert_eq!(kmem.refcount_get(p.base()), 1);
    assert_eq!(kmem.free_frames(), 1);
}

#[test]
fn copy_on_write_copies_shared_frame() {
    let arena = Arena::new(4);
    let mut refs = vec![0; 4];
    let kmem = kmem(&arena, &mut refs);

    let p = kmem.alloc().unwrap();
    arena.write(p, b"shared contents");
    kmem.refcount_increment(p.base());

    let copy = kmem.copy_on_write(p.base()).unwrap();
    assert_ne!(copy, p);
    assert_eq!(arena.bytes(copy), arena.bytes(p));
    assert_eq!(&arena.bytes(copy)[..15], b"shared contents");
    assert_eq!(kmem.refcount_get(p.base()), 1);
    assert_eq!(kmem.refcount_get(copy.base()), 1);

    // The remaining owner now resolves its fault without copying.
    assert_eq!(kmem.copy_on_write(p.base()), Ok(p));
}

#[test]
fn copy_on_write_reports_exhaustion_and_free_frames() {
    let arena = Arena::new(1);
    let mut refs = vec![0; 1];
    let kmem = kmem(&arena, &mut refs);

    let p = kmem.alloc().unwrap();
    kmem.refcount_set(p.base(), 2);
    assert_eq!(kmem.copy_on_write(p.base()), Err(CowError::OutOfMemory));
    assert_eq!(kmem.refcount_get(p.base()), 2);

    kmem.refcount_set(p.base(), 1);
    kmem.free(p.base());
    assert_eq!(
        kmem.copy_on_write(p.base()),
        Err(CowError::NotAllocated(p.base()))
    );
    assert_eq!(
        kmem.copy_on_write(arena.top()),
        Err(CowError::Frame(FrameError::OutOfRange(arena.top())))
    );
}

#[test]
fn works_through_the_frame_allocator_trait() {
    fn churn(a: &dyn FrameAllocator) -> usize {
        let frames: Vec<_> = std::iter::from_fn(|| a.alloc()).collect();
        for f in &frames {
            a.free(f.base());
        }
        frames.len()
    }

    let arena = Arena::new(8);
    let mut refs = vec![0; 8];
    let kmem = kmem(&arena, &mut refs);
    assert_eq!(churn(&kmem), 8);
    assert_eq!(kmem.free_frames(), 8);
    assert!(TestHart::irq_on());
}

#[test]
fn concurrent_alloc_free_never_duplicates() {
    const THREADS: usize = 4;
    const ROUNDS: usize = 200;

    let arena = Arena::new(64);
    let mut refs = vec![0; 64];
    let kmem = kmem(&arena, &mut refs);
    let start = Barrier::new(THREADS);

    let held: Vec<Vec<_>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    start.wait();
                    for _ in 0..ROUNDS {
                        let batch: Vec<_> = (0..4).filter_map(|_| kmem.alloc()).collect();
                        for f in &batch {
                            assert_eq!(kmem.refcount_get(f.base()), 1);
                        }
                        for f in batch {
                            kmem.free(f.base());
                        }
                    }
                    (0..8).filter_map(|_| kmem.alloc()).collect::<Vec<_>>()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let all: Vec<_> = held.into_iter().flatten().collect();
    let unique: HashSet<_> = all.iter().copied().collect();
    assert_eq!(unique.len(), all.len(), "a frame was handed out twice");
    assert_eq!(kmem.free_frames() + all.len(), 64);
}

#[test]
fn init_in_two_pieces_accepts_frees_from_both() {
    let arena = Arena::new(8);
    let mut refs = vec![0; 8];
    let mut kmem = Kmem::new(arena.region(), &mut refs, arena.mapper(), TestHart).unwrap();

    let middle = pa(KERNBASE + 4 * 4096);
    assert_eq!(kmem.init(arena.base(), middle), 4);
    assert_eq!(kmem.init(middle, arena.top()), 4);

    let all = drain(&kmem);
    assert_eq!(all.len(), 8);
    for f in &all {
        assert_eq!(kmem.try_free(f.base()), Ok(()));
    }
    assert_eq!(kmem.free_frames(), 8);
}

#[test]
fn concurrent_frees_of_a_shared_frame_list_it_once() {
    const THREADS: u32 = 4;
    const ROUNDS: usize = 100;

    let arena = Arena::new(8);
    let mut refs = vec![0; 8];
    let kmem = kmem(&arena, &mut refs);

    for _ in 0..ROUNDS {
        let p = kmem.alloc().unwrap();
        kmem.refcount_set(p.base(), THREADS);
        let start = Barrier::new(THREADS as usize);

        std::thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    start.wait();
                    kmem.free(p.base());
                });
            }
        });

        assert_eq!(kmem.refcount_get(p.base()), 0);
        assert_eq!(kmem.free_frames(), 8);

        let all = drain(&kmem);
        assert_eq!(all.iter().filter(|&&f| f == p).count(), 1);
        for f in all {
            kmem.free(f.base());
        }
    }
}
