//! # Physical memory access
//!
//! The allocators keep their free-list links inside the free frames and fill
//! frames with junk patterns, so they have to touch physical memory. Code can
//! only dereference virtual addresses; a [`PhysMapper`] turns a
//! [`PhysicalAddress`] into a pointer in the current address space and back.
//!
//! Two strategies are provided:
//!
//! * [`IdentityMapper`]: physical and virtual addresses coincide (the kernel
//!   runs with RAM identity-mapped).
//! * [`OffsetPhysMapper`]: every physical address is visible at a constant
//!   offset. This covers a higher-half direct map, and lets host tests place
//!   "physical" RAM inside a heap arena.
//!
//! ## Example
//! ```rust
//! use kernel_alloc::phys_mapper::{OffsetPhysMapper, PhysMapper};
//! use kernel_memory_addresses::PhysicalAddress;
//!
//! let mapper = OffsetPhysMapper::new(0xFFFF_8000_0000_0000);
//! let pa = PhysicalAddress::new(0x8000_1000);
//! let va = mapper.phys_to_ptr(pa);
//! assert_eq!(va.addr(), 0xFFFF_8000_8000_1000);
//! assert_eq!(mapper.ptr_to_phys(va), pa);
//! ```

use kernel_memory_addresses::PhysicalAddress;

/// Translation between physical addresses and pointers.
pub trait PhysMapper {
    /// Pointer at which `pa` is visible in the current address space.
    ///
    /// Computing the pointer is safe; dereferencing it is only sound if the
    /// mapping covers `pa`.
    fn phys_to_ptr(&self, pa: PhysicalAddress) -> *mut u8;

    /// Physical address backing `va`.
    fn ptr_to_phys(&self, va: *const u8) -> PhysicalAddress;
}

impl<M: PhysMapper + ?Sized> PhysMapper for &M {
    #[inline]
    fn phys_to_ptr(&self, pa: PhysicalAddress) -> *mut u8 {
        (**self).phys_to_ptr(pa)
    }

    #[inline]
    fn ptr_to_phys(&self, va: *const u8) -> PhysicalAddress {
        (**self).ptr_to_phys(va)
    }
}

/// [`PhysMapper`] for identity-mapped RAM: `VA == PA`.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityMapper;

impl PhysMapper for IdentityMapper {
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn phys_to_ptr(&self, pa: PhysicalAddress) -> *mut u8 {
        core::ptr::with_exposed_provenance_mut(pa.as_u64() as usize)
    }

    #[inline]
    fn ptr_to_phys(&self, va: *const u8) -> PhysicalAddress {
        PhysicalAddress::new(va.expose_provenance() as u64)
    }
}

/// [`PhysMapper`] for a linear window: `VA = PA + offset` (wrapping).
///
/// # Example
/// ```rust
/// use kernel_alloc::phys_mapper::{OffsetPhysMapper, PhysMapper};
/// use kernel_memory_addresses::PhysicalAddress;
///
/// // Window whose virtual base lies *below* the physical base.
/// let mapper = OffsetPhysMapper::between(PhysicalAddress::new(0x8000_0000), 0x1000);
/// assert_eq!(mapper.phys_to_ptr(PhysicalAddress::new(0x8000_0040)).addr(), 0x1040);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetPhysMapper {
    offset: u64,
}

impl OffsetPhysMapper {
    #[inline]
    #[must_use]
    pub const fn new(offset: u64) -> Self {
        Self { offset }
    }

    /// Window in which physical `pa_base` is visible at virtual address `va_base`.
    #[inline]
    #[must_use]
    pub const fn between(pa_base: PhysicalAddress, va_base: usize) -> Self {
        Self::new((va_base as u64).wrapping_sub(pa_base.as_u64()))
    }

    #[inline]
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }
}

impl PhysMapper for OffsetPhysMapper {
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn phys_to_ptr(&self, pa: PhysicalAddress) -> *mut u8 {
        core::ptr::with_exposed_provenance_mut(pa.as_u64().wrapping_add(self.offset) as usize)
    }

    #[inline]
    fn ptr_to_phys(&self, va: *const u8) -> PhysicalAddress {
        PhysicalAddress::new((va.expose_provenance() as u64).wrapping_sub(self.offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_round_trips() {
        let mut word = 0u64;
        let va = (&raw mut word).cast::<u8>();
        let pa = IdentityMapper.ptr_to_phys(va);
        assert_eq!(pa.as_u64(), va.addr() as u64);
        assert_eq!(IdentityMapper.phys_to_ptr(pa), va);
    }

    #[test]
    fn offset_mapper_writes_land_in_the_window() {
        let mut backing = [0u64; 4];
        let va_base = (&raw mut backing).cast::<u8>();
        let mapper = OffsetPhysMapper::between(
            PhysicalAddress::new(0x8000_0000),
            va_base.expose_provenance(),
        );

        unsafe {
            let slot = mapper.phys_to_ptr(PhysicalAddress::new(0x8000_0010));
            slot.cast::<u64>().write(0xDEAD_BEEF);
        }
        assert_eq!(backing[2], 0xDEAD_BEEF);
        assert_eq!(
            mapper.ptr_to_phys(va_base.wrapping_add(8)),
            PhysicalAddress::new(0x8000_0008)
        );
    }
}
