use crate::error::{FrameError, RegionError};
use kernel_info::memory::{KERNBASE, PHYSTOP};
use kernel_memory_addresses::{PageSize, PhysicalAddress, PhysicalPage, Size4K};

/// The physical range `[base, top)` whose 4 KiB frames an allocator manages.
///
/// Frames are identified by their dense index `(pa - base) / 4096`, which is
/// also the slot in a reference-count table.
///
/// ```rust
/// use kernel_alloc::FrameRegion;
/// use kernel_memory_addresses::PhysicalAddress;
///
/// let region = FrameRegion::kernel();
/// assert_eq!(region.frame_count(), 32768);
/// assert_eq!(region.index_of(PhysicalAddress::new(0x8000_3000)), Some(3));
/// assert_eq!(region.index_of(PhysicalAddress::new(0x8800_0000)), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRegion {
    base: PhysicalAddress,
    top: PhysicalAddress,
}

impl FrameRegion {
    /// # Errors
    /// [`RegionError::Misaligned`] if either bound is not page aligned,
    /// [`RegionError::Empty`] if `top <= base`.
    pub const fn new(base: PhysicalAddress, top: PhysicalAddress) -> Result<Self, RegionError> {
        if !base.is_aligned::<Size4K>() {
            return Err(RegionError::Misaligned(base));
        }
        if !top.is_aligned::<Size4K>() {
            return Err(RegionError::Misaligned(top));
        }
        if top.as_u64() <= base.as_u64() {
            return Err(RegionError::Empty { base, top });
        }
        Ok(Self { base, top })
    }

    /// RAM from the kernel base to the top of managed memory.
    #[must_use]
    pub const fn kernel() -> Self {
        Self {
            base: PhysicalAddress::new(KERNBASE),
            top: PhysicalAddress::new(PHYSTOP),
        }
    }

    #[inline]
    #[must_use]
    pub const fn base(&self) -> PhysicalAddress {
        self.base
    }

    #[inline]
    #[must_use]
    pub const fn top(&self) -> PhysicalAddress {
        self.top
    }

    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn frame_count(&self) -> usize {
        ((self.top.as_u64() - self.base.as_u64()) >> Size4K::SHIFT) as usize
    }

    #[inline]
    #[must_use]
    pub const fn contains(&self, pa: PhysicalAddress) -> bool {
        pa.as_u64() >= self.base.as_u64() && pa.as_u64() < self.top.as_u64()
    }

    /// Dense index of the frame containing `pa`.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn index_of(&self, pa: PhysicalAddress) -> Option<usize> {
        if self.contains(pa) {
            Some(((pa.as_u64() - self.base.as_u64()) >> Size4K::SHIFT) as usize)
        } else {
            None
        }
    }

    /// Frame with dense index `index`.
    #[inline]
    #[must_use]
    pub const fn frame_at(&self, index: usize) -> Option<PhysicalPage<Size4K>> {
        if index < self.frame_count() {
            let pa = self.base.as_u64() + ((index as u64) << Size4K::SHIFT);
            Some(PhysicalPage::containing(PhysicalAddress::new(pa)))
        } else {
            None
        }
    }

    /// Checks that `pa` is the aligned base of a frame in `[floor, top)`.
    ///
    /// `floor` narrows the lower bound to the lowest frame an allocator was
    /// populated with, so frames below it (kernel image) are never accepted.
    ///
    /// # Errors
    /// [`FrameError::Misaligned`] or [`FrameError::OutOfRange`].
    pub const fn validate(
        &self,
        floor: PhysicalAddress,
        pa: PhysicalAddress,
    ) -> Result<PhysicalPage<Size4K>, FrameError> {
        if !pa.is_aligned::<Size4K>() {
            return Err(FrameError::Misaligned(pa));
        }
        if pa.as_u64() < floor.as_u64() || !self.contains(pa) {
            return Err(FrameError::OutOfRange(pa));
        }
        Ok(PhysicalPage::containing(pa))
    }

    /// `[start, end)` clamped to this region.
    #[must_use]
    pub fn clamp(
        &self,
        start: PhysicalAddress,
        end: PhysicalAddress,
    ) -> (PhysicalAddress, PhysicalAddress) {
        let start = start.max(self.base);
        let end = end.min(self.top);
        (start, end.max(start))
    }
}
