#![allow(dead_code)]

use kernel_alloc::FrameRegion;
use kernel_alloc::phys_mapper::{OffsetPhysMapper, PhysMapper};
use kernel_info::memory::{KERNBASE, PAGE_SIZE};
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K};
use kernel_sync::Hart;
use std::alloc::{Layout, alloc_zeroed, dealloc};
use std::cell::Cell;

/// Host memory standing in for physical RAM at `[KERNBASE, KERNBASE + len)`.
pub struct Arena {
    ptr: *mut u8,
    layout: Layout,
}

// The arena is only accessed through the allocators under test.
unsafe impl Send for Arena {}
unsafe impl Sync for Arena {}

impl Arena {
    pub fn new(frames: usize) -> Self {
        let layout = Layout::from_size_align(frames * PAGE_SIZE as usize, PAGE_SIZE as usize)
            .expect("arena layout");
        let ptr = unsafe { alloc_zeroed(layout) };
        assert!(!ptr.is_null(), "arena allocation failed");
        Self { ptr, layout }
    }

    pub fn frames(&self) -> usize {
        self.layout.size() / PAGE_SIZE as usize
    }

    pub fn base(&self) -> PhysicalAddress {
        PhysicalAddress::new(KERNBASE)
    }

    pub fn top(&self) -> PhysicalAddress {
        PhysicalAddress::new(KERNBASE + self.layout.size() as u64)
    }

    pub fn region(&self) -> FrameRegion {
        FrameRegion::new(self.base(), self.top()).expect("arena region")
    }

    pub fn mapper(&self) -> OffsetPhysMapper {
        OffsetPhysMapper::between(self.base(), self.ptr.expose_provenance())
    }

    /// The 4096 bytes of `frame`.
    pub fn bytes(&self, frame: PhysicalPage<Size4K>) -> &[u8] {
        let ptr = self.mapper().phys_to_ptr(frame.base());
        assert!(ptr >= self.ptr && ptr < self.ptr.wrapping_add(self.layout.size()));
        unsafe { std::slice::from_raw_parts(ptr, PAGE_SIZE as usize) }
    }

    /// Copies `data` to the start of `frame`.
    pub fn write(&self, frame: PhysicalPage<Size4K>, data: &[u8]) {
        assert!(data.len() <= PAGE_SIZE as usize);
        let ptr = self.mapper().phys_to_ptr(frame.base());
        assert!(ptr >= self.ptr && ptr < self.ptr.wrapping_add(self.layout.size()));
        unsafe { std::ptr::copy_nonoverlapping(data.as_ptr(), ptr, data.len()) };
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        unsafe { dealloc(self.ptr, self.layout) };
    }
}

thread_local! {
    static CPU: Cell<usize> = const { Cell::new(0) };
    static IRQ_ON: Cell<bool> = const { Cell::new(true) };
}

/// A hart whose id and interrupt flag belong to the calling thread.
///
/// Reading the id with interrupts enabled fails the test: the caller could
/// have migrated.
#[derive(Debug, Default, Clone, Copy)]
pub struct TestHart;

impl TestHart {
    /// Pins the calling thread to `cpu`.
    pub fn run_on(cpu: usize) {
        CPU.with(|c| c.set(cpu));
    }

    pub fn irq_on() -> bool {
        IRQ_ON.with(Cell::get)
    }
}

impl Hart for TestHart {
    fn id(&self) -> usize {
        assert!(!Self::irq_on(), "cpu id read with interrupts enabled");
        CPU.with(Cell::get)
    }

    fn interrupts_enabled(&self) -> bool {
        Self::irq_on()
    }

    fn disable_interrupts(&self) {
        IRQ_ON.with(|f| f.set(false));
    }

    fn enable_interrupts(&self) {
        IRQ_ON.with(|f| f.set(true));
    }
}

pub fn pa(v: u64) -> PhysicalAddress {
    PhysicalAddress::new(v)
}
