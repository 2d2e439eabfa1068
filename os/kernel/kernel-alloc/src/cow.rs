//! # Reference-counting frame allocator
//!
//! A single free-list plus a per-frame reference count, so that page tables
//! can share physical frames copy-on-write.
//!
//! ```text
//!  fork:   refcount_increment(pa)        1 -> 2   (both PTEs read-only)
//!  fault:  copy_on_write(pa)             alloc + copy, free(pa): 2 -> 1
//!  exit:   free(pa)                      1 -> 0   frame back on the list
//! ```
//!
//! [`free`](CowFrameAllocator::free) only recycles a frame once its last
//! reference is dropped; earlier calls merely decrement.
//!
//! ## Locking
//!
//! Two locks, `kmem` for the list and `pgref` for the reference counts. No
//! operation ever holds both: the count update in `free` is one critical
//! section and the list push a second one. Both locks are taken with local
//! interrupts disabled because interrupt handlers allocate too.
//!
//! Between the two sections a released frame has count 0 but is not yet on
//! the list. Only the owner of a frame may inspect its count, so nobody can
//! observe that window.

use crate::error::{CowError, FrameError, RegionError};
use crate::frame_alloc::{FRAME_BYTES, FrameAllocator, fill};
use crate::free_list::FrameList;
use crate::phys_mapper::PhysMapper;
use crate::region::FrameRegion;
use kernel_info::memory::{ALLOC_JUNK, FREE_JUNK};
use kernel_memory_addresses::{PageRange, PhysicalAddress, PhysicalPage, Size4K};
use kernel_sync::{Hart, SpinLock};
use log::{info, trace};

/// Frame allocator with per-frame reference counts.
///
/// The reference-count table is borrowed: one `u32` per frame of the region,
/// typically a `static` array sized with
/// [`MANAGED_FRAMES`](kernel_info::memory::MANAGED_FRAMES).
pub struct CowFrameAllocator<'t, M, H> {
    region: FrameRegion,
    /// Lowest frame handed to [`init`](Self::init).
    floor: PhysicalAddress,
    mapper: M,
    hart: H,
    list: SpinLock<FrameList>,
    refs: SpinLock<&'t mut [u32]>,
}

impl<'t, M: PhysMapper, H: Hart> CowFrameAllocator<'t, M, H> {
    /// Creates an empty allocator for `region`.
    ///
    /// # Errors
    /// [`RegionError::TableTooSmall`] if `refs` has fewer entries than the
    /// region has frames.
    pub fn new(
        region: FrameRegion,
        refs: &'t mut [u32],
        mapper: M,
        hart: H,
    ) -> Result<Self, RegionError> {
        let needed = region.frame_count();
        if refs.len() < needed {
            return Err(RegionError::TableTooSmall {
                needed,
                actual: refs.len(),
            });
        }
        let refs = &mut refs[..needed];
        refs.fill(0);
        Ok(Self {
            region,
            floor: region.top(),
            mapper,
            hart,
            list: SpinLock::new("kmem", FrameList::new()),
            refs: SpinLock::new("pgref", refs),
        })
    }

    #[inline]
    #[must_use]
    pub const fn region(&self) -> FrameRegion {
        self.region
    }

    /// Releases every whole frame in `[start, end)` (clamped to the region)
    /// and returns how many were released.
    ///
    /// Runs before the allocator is shared, so reference counts are not
    /// consulted: every released frame simply starts at zero.
    pub fn init(&mut self, start: PhysicalAddress, end: PhysicalAddress) -> usize {
        let (start, end) = self.region.clamp(start, end);
        let list = self.list.get_mut();
        let refs = self.refs.get_mut();

        let mut released = 0;
        for frame in PageRange::<Size4K>::whole_pages(start, end) {
            if frame.base() < self.floor {
                self.floor = frame.base();
            }
            if let Some(i) = self.region.index_of(frame.base()) {
                refs[i] = 0;
            }
            // SAFETY: the caller hands us ownership of [start, end).
            unsafe {
                fill(&self.mapper, frame, FREE_JUNK);
                list.push(&self.mapper, frame);
            }
            released += 1;
        }

        info!("kmem: {released} frames free in [{start}, {end})");
        released
    }

    /// Pops a frame, fills it with [`ALLOC_JUNK`] and gives it one reference.
    pub fn alloc(&self) -> Option<PhysicalPage<Size4K>> {
        // SAFETY: frames on the list are mapped and owned by the list.
        let frame = unsafe { self.list.lock_irq(&self.hart).pop(&self.mapper) }?;

        // SAFETY: popped, so exclusively ours.
        unsafe { fill(&self.mapper, frame, ALLOC_JUNK) };
        let i = self.index(frame.base());
        self.refs.lock_irq(&self.hart)[i] = 1;

        trace!("kalloc {frame}");
        Some(frame)
    }

    /// Drops one reference to `pa`; recycles the frame when it was the last.
    ///
    /// # Panics
    /// On any [`FrameError`]: misaligned, out of range or double free.
    pub fn free(&self, pa: PhysicalAddress) {
        if let Err(e) = self.try_free(pa) {
            panic!("{e}");
        }
    }

    /// Fallible [`free`](Self::free).
    ///
    /// # Errors
    /// - [`FrameError::Misaligned`] / [`FrameError::OutOfRange`] for an
    ///   address the allocator never handed out.
    /// - [`FrameError::DoubleFree`] if the frame has no references.
    pub fn try_free(&self, pa: PhysicalAddress) -> Result<(), FrameError> {
        let frame = self.region.validate(self.floor, pa)?;
        let i = self.index(pa);

        {
            let mut refs = self.refs.lock_irq(&self.hart);
            let count = refs[i];
            match count {
                0 => return Err(FrameError::DoubleFree(pa)),
                1 => refs[i] = 0,
                n => {
                    refs[i] = n - 1;
                    trace!("kfree {frame}: {} references left", n - 1);
                    return Ok(());
                }
            }
        }

        // SAFETY: the last reference is gone and the frame is not yet listed.
        unsafe {
            fill(&self.mapper, frame, FREE_JUNK);
            self.list.lock_irq(&self.hart).push(&self.mapper, frame);
        }
        trace!("kfree {frame}");
        Ok(())
    }

    /// Current number of references to the frame containing `pa`.
    ///
    /// # Panics
    /// If `pa` is outside the managed region.
    #[must_use]
    pub fn refcount_get(&self, pa: PhysicalAddress) -> u32 {
        let i = self.index(pa);
        self.refs.lock_irq(&self.hart)[i]
    }

    /// Overwrites the reference count of the frame containing `pa`.
    ///
    /// # Panics
    /// If `pa` is outside the managed region.
    pub fn refcount_set(&self, pa: PhysicalAddress, n: u32) {
        let i = self.index(pa);
        self.refs.lock_irq(&self.hart)[i] = n;
    }

    /// Adds a reference to an allocated frame and returns the new count.
    ///
    /// # Panics
    /// If `pa` is outside the managed region or the frame is free.
    pub fn refcount_increment(&self, pa: PhysicalAddress) -> u32 {
        let i = self.index(pa);
        let mut refs = self.refs.lock_irq(&self.hart);
        assert!(refs[i] != 0, "pgref: {pa} is free");
        refs[i] += 1;
        refs[i]
    }

    /// Resolves a write fault on the shared frame `pa`.
    ///
    /// A sole owner keeps the frame. Otherwise the contents are copied into a
    /// fresh frame, one reference to `pa` is dropped, and the copy returned.
    ///
    /// # Errors
    /// - [`CowError::OutOfMemory`] if no frame is left for the copy; `pa`
    ///   is left untouched.
    /// - [`CowError::NotAllocated`] if `pa` has no references.
    /// - [`CowError::Frame`] if `pa` is not a managed frame.
    pub fn copy_on_write(
        &self,
        pa: PhysicalAddress,
    ) -> Result<PhysicalPage<Size4K>, CowError> {
        let frame = self.region.validate(self.floor, pa)?;
        match self.refcount_get(pa) {
            0 => Err(CowError::NotAllocated(pa)),
            1 => Ok(frame),
            _ => {
                let copy = self.alloc().ok_or(CowError::OutOfMemory)?;
                // SAFETY: we hold a reference to `frame` and own `copy`.
                unsafe {
                    core::ptr::copy_nonoverlapping(
                        self.mapper.phys_to_ptr(frame.base()).cast_const(),
                        self.mapper.phys_to_ptr(copy.base()),
                        FRAME_BYTES,
                    );
                }
                self.try_free(pa)?;
                trace!("cow {frame} -> {copy}");
                Ok(copy)
            }
        }
    }

    /// Number of frames on the free-list.
    #[must_use]
    pub fn free_frames(&self) -> usize {
        self.list.lock_irq(&self.hart).len()
    }

    fn index(&self, pa: PhysicalAddress) -> usize {
        match self.region.index_of(pa) {
            Some(i) => i,
            None => panic!(
                "pgref: {pa} outside [{}, {})",
                self.region.base(),
                self.region.top()
            ),
        }
    }
}

impl<M: PhysMapper, H: Hart> FrameAllocator for CowFrameAllocator<'_, M, H> {
    #[inline]
    fn alloc(&self) -> Option<PhysicalPage<Size4K>> {
        Self::alloc(self)
    }

    #[inline]
    fn free(&self, pa: PhysicalAddress) {
        Self::free(self, pa);
    }
}
