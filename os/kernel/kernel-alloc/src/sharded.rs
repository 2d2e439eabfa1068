//! # Per-CPU frame allocator
//!
//! One free-list per CPU, each behind its own lock. `alloc` and `free` work
//! on the executing CPU's list; only an empty local list makes `alloc` reach
//! into another CPU's list, stealing a single frame.
//!
//! ```text
//!   cpu 0        cpu 1        cpu 2        cpu 3
//! ┌───────┐    ┌───────┐    ┌───────┐    ┌───────┐
//! │ kmem  │    │ kmem  │    │ kmem  │    │ kmem  │
//! └───┬───┘    └───┬───┘    └───┬───┘    └───┬───┘
//!     ▼            ▼            ▼            ▼
//!   frame        frame        (empty)      frame
//!     ▼                                      ▼
//!   frame                                  frame
//! ```
//!
//! Both operations run entirely inside an [`IrqGuard`]: the CPU id is only
//! read through the guard, and the guard outlives every lock taken for that
//! id, so the caller cannot migrate between learning its id and using it.
//! At most one list lock is held at any time, stealing included.

use crate::error::FrameError;
use crate::frame_alloc::{FrameAllocator, fill};
use crate::free_list::FrameList;
use crate::phys_mapper::PhysMapper;
use crate::region::FrameRegion;
use kernel_info::memory::{ALLOC_JUNK, FREE_JUNK, MAX_CPUS};
use kernel_memory_addresses::{PageRange, PhysicalAddress, PhysicalPage, Size4K};
use kernel_sync::{Hart, IrqGuard, SpinLock};
use log::{debug, info, trace};

/// The kernel's allocator: one free-list per hart it can bring up.
pub type KernelFrameAllocator<M, H> = PerCpuFrameAllocator<M, H, MAX_CPUS>;

/// Frame allocator sharded into `CPUS` independent free-lists.
pub struct PerCpuFrameAllocator<M, H, const CPUS: usize> {
    region: FrameRegion,
    floor: PhysicalAddress,
    mapper: M,
    hart: H,
    lists: [SpinLock<FrameList>; CPUS],
}

impl<M: PhysMapper, H: Hart, const CPUS: usize> PerCpuFrameAllocator<M, H, CPUS> {
    /// Creates the allocator with every per-CPU list empty.
    #[must_use]
    pub fn new(region: FrameRegion, mapper: M, hart: H) -> Self {
        const { assert!(CPUS > 0, "at least one CPU") };
        Self {
            region,
            floor: region.top(),
            mapper,
            hart,
            lists: core::array::from_fn(|_| SpinLock::new("kmem", FrameList::new())),
        }
    }

    #[inline]
    #[must_use]
    pub const fn region(&self) -> FrameRegion {
        self.region
    }

    /// Releases every whole frame in `[start, end)` (clamped to the region)
    /// onto the list of the CPU running `init`.
    ///
    /// Interrupts stay disabled for the whole loop so that CPU does not change
    /// halfway through.
    ///
    /// # Panics
    /// If the executing CPU's id is not below `CPUS`.
    pub fn init(&mut self, start: PhysicalAddress, end: PhysicalAddress) -> usize {
        let (start, end) = self.region.clamp(start, end);
        let irq = IrqGuard::new(&self.hart);
        let cpu = checked_cpu::<_, CPUS>(&irq);
        let list = self.lists[cpu].get_mut();

        let mut released = 0;
        for frame in PageRange::<Size4K>::whole_pages(start, end) {
            if frame.base() < self.floor {
                self.floor = frame.base();
            }
            // SAFETY: the caller hands us ownership of [start, end).
            unsafe {
                fill(&self.mapper, frame, FREE_JUNK);
                list.push(&self.mapper, frame);
            }
            released += 1;
        }
        drop(irq);

        info!("kmem: {released} frames free in [{start}, {end}) on cpu {cpu}");
        released
    }

    /// Pops a frame from the local list, stealing one from another CPU if the
    /// local list is empty.
    ///
    /// # Panics
    /// If the executing CPU's id is not below `CPUS`.
    pub fn alloc(&self) -> Option<PhysicalPage<Size4K>> {
        let frame = {
            let irq = IrqGuard::new(&self.hart);
            let cpu = checked_cpu::<_, CPUS>(&irq);
            // SAFETY: frames on the list are mapped and owned by the list.
            let local = unsafe { self.lists[cpu].lock().pop(&self.mapper) };
            local.or_else(|| self.steal(cpu))
        }?;

        // SAFETY: popped, so exclusively ours.
        unsafe { fill(&self.mapper, frame, ALLOC_JUNK) };
        trace!("kalloc {frame}");
        Some(frame)
    }

    /// Probes `cpu + 1, cpu + 2, ...` (wrapping) for a single frame.
    ///
    /// Must run with interrupts disabled.
    fn steal(&self, cpu: usize) -> Option<PhysicalPage<Size4K>> {
        for k in 1..CPUS {
            let victim = (cpu + k) % CPUS;
            // SAFETY: as in `alloc`; the victim's lock is released at the end
            // of this statement.
            let stolen = unsafe { self.lists[victim].lock().pop(&self.mapper) };
            if let Some(frame) = stolen {
                debug!("cpu {cpu} stole {frame} from cpu {victim}");
                return Some(frame);
            }
        }
        None
    }

    /// Returns `pa` to the executing CPU's list.
    ///
    /// # Panics
    /// On a misaligned or out-of-range address, or if the executing CPU's id
    /// is not below `CPUS`.
    pub fn free(&self, pa: PhysicalAddress) {
        if let Err(e) = self.try_free(pa) {
            panic!("{e}");
        }
    }

    /// Fallible [`free`](Self::free).
    ///
    /// # Errors
    /// [`FrameError::Misaligned`] or [`FrameError::OutOfRange`]; frames carry
    /// no ownership record here, so a double free is not detected.
    ///
    /// # Panics
    /// If the executing CPU's id is not below `CPUS`.
    pub fn try_free(&self, pa: PhysicalAddress) -> Result<(), FrameError> {
        let irq = IrqGuard::new(&self.hart);
        let cpu = checked_cpu::<_, CPUS>(&irq);
        let frame = self.region.validate(self.floor, pa)?;

        // SAFETY: the caller returns ownership of a frame we handed out.
        unsafe {
            fill(&self.mapper, frame, FREE_JUNK);
            self.lists[cpu].lock().push(&self.mapper, frame);
        }
        drop(irq);

        trace!("kfree {frame} on cpu {cpu}");
        Ok(())
    }

    /// Number of frames on `cpu`'s list.
    ///
    /// # Panics
    /// If `cpu >= CPUS`.
    #[must_use]
    pub fn free_frames_on(&self, cpu: usize) -> usize {
        self.lists[cpu].lock_irq(&self.hart).len()
    }

    /// Number of free frames across all CPUs.
    ///
    /// Each list is sampled under its own lock; with concurrent callers the
    /// sum is only a snapshot.
    #[must_use]
    pub fn free_frames(&self) -> usize {
        (0..CPUS).map(|cpu| self.free_frames_on(cpu)).sum()
    }
}

fn checked_cpu<H: Hart + ?Sized, const CPUS: usize>(irq: &IrqGuard<'_, H>) -> usize {
    let cpu = irq.cpu_id();
    assert!(cpu < CPUS, "kmem: cpu {cpu} exceeds {CPUS} lists");
    cpu
}

impl<M: PhysMapper, H: Hart, const CPUS: usize> FrameAllocator
    for PerCpuFrameAllocator<M, H, CPUS>
{
    #[inline]
    fn alloc(&self) -> Option<PhysicalPage<Size4K>> {
        Self::alloc(self)
    }

    #[inline]
    fn free(&self, pa: PhysicalAddress) {
        Self::free(self, pa);
    }
}
