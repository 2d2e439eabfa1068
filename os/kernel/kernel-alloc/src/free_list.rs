use crate::phys_mapper::PhysMapper;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K};

/// Link stored in the first 8 bytes of every **free** frame.
///
/// ```text
/// +----------------------+------------------------------+
/// | next (u64, PA)       |  junk (FREE_JUNK) ...        |
/// +----------------------+------------------------------+
/// ^ frame base           ^ frame base + 8
/// ```
///
/// The link holds the physical address of the next free frame, or
/// [`END`] for the last one. Physical addresses are stored (rather than
/// pointers) so the list is independent of the active mapping.
const END: u64 = u64::MAX;

/// An intrusive LIFO list of free 4 KiB frames.
///
/// The list itself is two words; every other byte of state lives inside the
/// free frames. It is not synchronized; owners keep it behind a
/// [`SpinLock`](kernel_sync::SpinLock).
///
/// # Invariants
/// - Every frame reachable from `head` is free and appears exactly once.
/// - `len` equals the number of reachable frames.
#[derive(Debug, Default)]
pub struct FrameList {
    head: Option<PhysicalPage<Size4K>>,
    len: usize,
}

impl FrameList {
    #[must_use]
    pub const fn new() -> Self {
        Self { head: None, len: 0 }
    }

    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Frame that the next [`pop`](Self::pop) returns.
    #[inline]
    #[must_use]
    pub const fn peek(&self) -> Option<PhysicalPage<Size4K>> {
        self.head
    }

    /// Pushes `frame` onto the list, overwriting its first 8 bytes.
    ///
    /// # Safety
    /// - `frame` must be mapped writable through `mapper`.
    /// - `frame` must not be on this or any other list, and no one else may
    ///   access it until it is popped again.
    pub unsafe fn push<M: PhysMapper + ?Sized>(
        &mut self,
        mapper: &M,
        frame: PhysicalPage<Size4K>,
    ) {
        let next = self.head.map_or(END, |h| h.base().as_u64());
        // SAFETY: the frame is page aligned, mapped and exclusively ours.
        unsafe {
            mapper.phys_to_ptr(frame.base()).cast::<u64>().write(next);
        }
        self.head = Some(frame);
        self.len += 1;
    }

    /// Removes the most recently pushed frame.
    ///
    /// # Safety
    /// - Every frame on the list must still be mapped through `mapper`.
    pub unsafe fn pop<M: PhysMapper + ?Sized>(
        &mut self,
        mapper: &M,
    ) -> Option<PhysicalPage<Size4K>> {
        let frame = self.head?;
        // SAFETY: the frame is on the list, so its link word is valid.
        let next = unsafe { mapper.phys_to_ptr(frame.base()).cast::<u64>().read() };
        self.head = if next == END {
            None
        } else {
            Some(PhysicalPage::containing(PhysicalAddress::new(next)))
        };
        self.len -= 1;
        Some(frame)
    }
}
