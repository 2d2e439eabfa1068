//! # Physical Memory Address Types
//!
//! Strongly typed wrappers for physical addresses and page frames used by the
//! frame allocators and by DMA-capable drivers.
//!
//! ## Overview
//!
//! | Type | Description |
//! |------|-------------|
//! | [`PhysicalAddress`] | A raw 64-bit physical address (RAM or MMIO). |
//! | [`PhysicalPage<S>`] | The page-aligned base of a physical page of size `S`. |
//! | [`PageRange<S>`] | An iterator over every whole page of size `S` inside a byte range. |
//!
//! Page sizes are marker types implementing [`PageSize`]:
//!
//! - [`Size4K`]: 4 KiB frames (allocator granularity)
//!
//! ## Typical Usage
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let pa = PhysicalAddress::new(0x8000_1234);
//! let page = pa.page::<Size4K>();
//! assert_eq!(page.base().as_u64(), 0x8000_1000);
//! assert_eq!(pa.offset::<Size4K>(), 0x234);
//!
//! // Every whole 4 KiB page in [0x8000_0010, 0x8000_3000): the first partial
//! // page is skipped.
//! let pages: Vec<_> = PageRange::<Size4K>::whole_pages(
//!     PhysicalAddress::new(0x8000_0010),
//!     PhysicalAddress::new(0x8000_3000),
//! )
//! .collect();
//! assert_eq!(pages.len(), 2);
//! assert_eq!(pages[0].base().as_u64(), 0x8000_1000);
//! ```
//!
//! ## Design Notes
//!
//! - The types are `#[repr(transparent)]` and implement `Copy`, `Eq`, `Ord`, and
//!   `Hash`, making them suitable as map keys or descriptor fields.
//! - The phantom marker `S` carries the page size at the type level, so a page
//!   base and an arbitrary address cannot be confused.

#![cfg_attr(not(any(test, doctest)), no_std)]

mod page_range;
mod physical_address;
mod physical_page;

use core::fmt;
use core::hash::Hash;

pub use page_range::PageRange;
pub use physical_address::PhysicalAddress;
pub use physical_page::PhysicalPage;

/// Sealed trait pattern to restrict `PageSize` impls to our markers.
mod sealed {
    pub trait Sealed {}
}

/// Marker trait for supported page sizes.
pub trait PageSize:
    sealed::Sealed + Clone + Copy + Eq + PartialEq + Ord + PartialOrd + Hash + fmt::Debug
{
    /// Page size in bytes (power of two).
    const SIZE: u64;
    /// log2(SIZE), i.e., number of low bits used for the offset.
    const SHIFT: u32;

    fn as_str() -> &'static str;
}

/// 4 KiB page (4096 bytes).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Size4K;
impl sealed::Sealed for Size4K {}
impl PageSize for Size4K {
    const SIZE: u64 = 4096;
    const SHIFT: u32 = 12;

    fn as_str() -> &'static str {
        "4K"
    }
}

const _: () = {
    assert!(Size4K::SIZE == 1 << Size4K::SHIFT);
};
