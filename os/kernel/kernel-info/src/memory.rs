//! # Memory Layout

/// Size of one physical frame.
pub const PAGE_SIZE: u64 = 4096;

/// Lowest physical address of RAM; the kernel image is loaded here.
pub const KERNBASE: u64 = 0x8000_0000;

/// One past the highest physical address of RAM managed by the kernel.
pub const PHYSTOP: u64 = KERNBASE + 128 * 1024 * 1024;

/// Number of frames in `[KERNBASE, PHYSTOP)`; sizes the reference-count table.
#[allow(clippy::cast_possible_truncation)]
pub const MANAGED_FRAMES: usize = ((PHYSTOP - KERNBASE) / PAGE_SIZE) as usize;

/// Maximum number of harts the kernel brings up.
pub const MAX_CPUS: usize = 8;

/// Byte pattern written over a frame when it is handed out.
pub const ALLOC_JUNK: u8 = 0x05;

/// Byte pattern written over a frame when it is returned.
pub const FREE_JUNK: u8 = 0x01;

const _: () = {
    assert!(PAGE_SIZE.is_power_of_two());
    assert!(KERNBASE.is_multiple_of(PAGE_SIZE));
    assert!(PHYSTOP.is_multiple_of(PAGE_SIZE));
    assert!(PHYSTOP > KERNBASE);
    assert!(MANAGED_FRAMES == 32768);
    assert!(MAX_CPUS > 0);
    assert!(ALLOC_JUNK != FREE_JUNK);
};
