//! The interface shared by the physical frame allocators.

use crate::phys_mapper::PhysMapper;
use kernel_info::memory::PAGE_SIZE;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K};

/// Hands out and takes back 4 KiB physical frames.
///
/// Implemented by [`CowFrameAllocator`](crate::cow::CowFrameAllocator) and
/// [`PerCpuFrameAllocator`](crate::sharded::PerCpuFrameAllocator). The two
/// are alternatives; a kernel picks one.
pub trait FrameAllocator {
    /// A free frame, or `None` once memory is exhausted.
    fn alloc(&self) -> Option<PhysicalPage<Size4K>>;

    /// Returns the frame at `pa` (or, for shared frames, drops one reference).
    ///
    /// # Panics
    /// If `pa` is misaligned, outside the managed region, or already free.
    fn free(&self, pa: PhysicalAddress);
}

impl<A: FrameAllocator + ?Sized> FrameAllocator for &A {
    #[inline]
    fn alloc(&self) -> Option<PhysicalPage<Size4K>> {
        (**self).alloc()
    }

    #[inline]
    fn free(&self, pa: PhysicalAddress) {
        (**self).free(pa);
    }
}

#[allow(clippy::cast_possible_truncation)]
pub(crate) const FRAME_BYTES: usize = PAGE_SIZE as usize;

/// Overwrites the whole frame with `pattern`.
///
/// # Safety
/// The frame must be mapped through `mapper` and owned by the caller.
pub(crate) unsafe fn fill<M: PhysMapper + ?Sized>(
    mapper: &M,
    frame: PhysicalPage<Size4K>,
    pattern: u8,
) {
    // SAFETY: forwarded to the caller.
    unsafe {
        core::ptr::write_bytes(mapper.phys_to_ptr(frame.base()), pattern, FRAME_BYTES);
    }
}
