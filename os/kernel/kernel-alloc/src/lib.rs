//! # Physical Frame Allocation
//!
//! This crate hands out and takes back 4 KiB physical frames. Two allocators
//! implement the common [`FrameAllocator`] interface; a kernel picks one:
//!
//! ```text
//! ┌──────────────────────────────┐   ┌──────────────────────────────┐
//! │      CowFrameAllocator       │   │     PerCpuFrameAllocator     │
//! │  • one free-list (kmem)      │   │  • one free-list per CPU     │
//! │  • per-frame refcount (pgref)│   │  • steal one frame when the  │
//! │  • copy-on-write helper      │   │    local list runs dry       │
//! └──────────────┬───────────────┘   └──────────────┬───────────────┘
//!                │                                  │
//! ┌──────────────▼──────────────────────────────────▼───────────────┐
//! │                FrameList (intrusive LIFO, link in frame)         │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                PhysMapper (physical address -> pointer)          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core Components
//!
//! * [`FrameRegion`]: the managed range `[base, top)` and the dense frame
//!   index used by reference-count tables.
//! * [`free_list::FrameList`]: the free frames themselves store the list
//!   links, so no memory beyond the frames is needed.
//! * [`phys_mapper::PhysMapper`]: how the allocator reaches a frame's bytes.
//! * [`cow::CowFrameAllocator`]: a frame is only recycled when its last
//!   reference is freed.
//! * [`sharded::PerCpuFrameAllocator`]: the common path only touches the
//!   executing CPU's list.
//!
//! ## Debug hygiene
//!
//! Allocated frames are filled with [`ALLOC_JUNK`](kernel_info::memory::ALLOC_JUNK)
//! and released frames with [`FREE_JUNK`](kernel_info::memory::FREE_JUNK), so
//! use of uninitialised or dangling memory shows up as a recognisable pattern.
//!
//! ## Failure model
//!
//! * Exhaustion is `None` from `alloc`.
//! * Returning a misaligned, out-of-range or already free frame is a kernel
//!   bug: `free` panics. `try_free` reports the same conditions as
//!   [`FrameError`].
//!
//! ## Usage
//! ```rust,no_run
//! use kernel_alloc::FrameRegion;
//! use kernel_alloc::cow::CowFrameAllocator;
//! use kernel_alloc::phys_mapper::IdentityMapper;
//! use kernel_info::memory::MANAGED_FRAMES;
//! use kernel_memory_addresses::PhysicalAddress;
//! # use kernel_sync::Hart;
//! # struct BootHart;
//! # impl Hart for BootHart {
//! #     fn id(&self) -> usize { 0 }
//! #     fn interrupts_enabled(&self) -> bool { false }
//! #     fn disable_interrupts(&self) {}
//! #     fn enable_interrupts(&self) {}
//! # }
//! # fn kernel_end() -> PhysicalAddress { PhysicalAddress::new(0x8010_0000) }
//!
//! static mut PGREF: [u32; MANAGED_FRAMES] = [0; MANAGED_FRAMES];
//!
//! let region = FrameRegion::kernel();
//! let refs = unsafe { &mut *(&raw mut PGREF) };
//! let mut kmem = CowFrameAllocator::new(region, refs, IdentityMapper, BootHart).unwrap();
//! kmem.init(kernel_end(), region.top());
//!
//! let frame = kmem.alloc().expect("out of memory");
//! kmem.free(frame.base());
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod cow;
mod error;
pub mod frame_alloc;
pub mod free_list;
pub mod phys_mapper;
mod region;
pub mod sharded;

pub use error::{CowError, FrameError, RegionError};
pub use frame_alloc::FrameAllocator;
pub use region::FrameRegion;
