#![allow(dead_code)]

use kernel_alloc::FrameRegion;
use kernel_alloc::cow::CowFrameAllocator;
use kernel_alloc::phys_mapper::{OffsetPhysMapper, PhysMapper};
use kernel_e1000::desc::{DescriptorRings, RxDescriptor, RxStatus, TxDescriptor, TxStatus};
use kernel_e1000::mbuf::{Mbuf, MbufPool};
use kernel_e1000::regs::{DeviceControl, Register, RegisterBlock};
use kernel_e1000::{BufferPool, E1000, E1000Config};
use kernel_info::memory::{KERNBASE, PAGE_SIZE};
use kernel_info::net::{RX_RING_SIZE, TX_RING_SIZE};
use kernel_memory_addresses::PhysicalAddress;
use kernel_sync::Hart;
use std::alloc::{Layout, alloc_zeroed, dealloc};
use std::cell::Cell;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Host memory standing in for physical RAM at `[KERNBASE, KERNBASE + len)`.
pub struct Arena {
    ptr: *mut u8,
    layout: Layout,
}

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

    pub fn contains(&self, pa: PhysicalAddress) -> bool {
        pa >= self.base() && pa < self.top()
    }

    pub fn mapper(&self) -> OffsetPhysMapper {
        OffsetPhysMapper::between(self.base(), self.ptr.expose_provenance())
    }

    /// A populated allocator over the whole arena.
    pub fn kmem(&self) -> Kmem {
        let refs = Box::leak(vec![0u32; self.frames()].into_boxed_slice());
        let region = FrameRegion::new(self.base(), self.top()).expect("arena region");
        let mut kmem = Kmem::new(region, refs, self.mapper(), TestHart).expect("allocator");
        assert_eq!(kmem.init(self.base(), self.top()), self.frames());
        kmem
    }

    pub fn pool(&self) -> Pool {
        MbufPool::new(self.kmem(), self.mapper())
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        unsafe { dealloc(self.ptr, self.layout) };
    }
}

thread_local! {
    static IRQ_ON: Cell<bool> = const { Cell::new(true) };
}

/// A single hart whose interrupt flag belongs to the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct TestHart;

impl TestHart {
    pub fn irq_on() -> bool {
        IRQ_ON.with(Cell::get)
    }
}

impl Hart for TestHart {
    fn id(&self) -> usize {
        0
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

pub type Kmem = CowFrameAllocator<'static, OffsetPhysMapper, TestHart>;
pub type Pool = MbufPool<Kmem, OffsetPhysMapper>;

/// A simulated 82540EM: a register file plus a DMA engine that walks the
/// descriptor rings the way the NIC does.
///
/// Nothing moves on its own; tests call [`SimNic::complete_tx`] and
/// [`SimNic::inject_rx`] to play the hardware side.
pub struct SimNic {
    regs: Mutex<HashMap<Register, u32>>,
    writes: Mutex<Vec<(Register, u32)>>,
    resets: AtomicUsize,
    mapper: OffsetPhysMapper,
}

impl SimNic {
    pub fn new(mapper: OffsetPhysMapper) -> Self {
        Self {
            regs: Mutex::new(HashMap::new()),
            writes: Mutex::new(Vec::new()),
            resets: AtomicUsize::new(0),
            mapper,
        }
    }

    /// Current register value, without side effects.
    pub fn reg(&self, reg: Register) -> u32 {
        self.regs.lock().unwrap().get(&reg).copied().unwrap_or(0)
    }

    /// Sets a register as the device would, bypassing the write log.
    pub fn set_reg(&self, reg: Register, value: u32) {
        self.regs.lock().unwrap().insert(reg, value);
    }

    /// Every driver write, in order.
    pub fn writes(&self) -> Vec<(Register, u32)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn writes_to(&self, reg: Register) -> Vec<u32> {
        self.writes()
            .into_iter()
            .filter(|&(r, _)| r == reg)
            .map(|(_, v)| v)
            .collect()
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    fn ring_base(&self, low: Register, high: Register) -> PhysicalAddress {
        PhysicalAddress::new(u64::from(self.reg(high)) << 32 | u64::from(self.reg(low)))
    }

    fn tx_ring(&self) -> *mut TxDescriptor {
        self.mapper
            .phys_to_ptr(self.ring_base(Register::TDBAL, Register::TDBAH))
            .cast()
    }

    fn rx_ring(&self) -> *mut RxDescriptor {
        self.mapper
            .phys_to_ptr(self.ring_base(Register::RDBAL, Register::RDBAH))
            .cast()
    }

    pub fn tx_desc(&self, slot: usize) -> TxDescriptor {
        assert!(slot < TX_RING_SIZE);
        unsafe { self.tx_ring().add(slot).read_volatile() }
    }

    pub fn rx_desc(&self, slot: usize) -> RxDescriptor {
        assert!(slot < RX_RING_SIZE);
        unsafe { self.rx_ring().add(slot).read_volatile() }
    }

    /// Sends everything between `TDH` and `TDT`: copies each payload out,
    /// sets `DD` and advances the head. Returns the frames as sent.
    pub fn complete_tx(&self) -> Vec<Vec<u8>> {
        let mut sent = Vec::new();
        loop {
            let head = self.reg(Register::TDH) as usize;
            if head == self.reg(Register::TDT) as usize {
                break;
            }
            let slot = unsafe { self.tx_ring().add(head) };
            let mut desc = unsafe { slot.read_volatile() };
            sent.push(self.read_dma(PhysicalAddress::new(desc.addr), desc.length.into()));
            desc.status = TxStatus::new().with_dd(true).into_bits();
            unsafe { slot.write_volatile(desc) };
            self.set_reg(Register::TDH, ((head + 1) % TX_RING_SIZE) as u32);
        }
        sent
    }

    /// Receives one frame into the descriptor at `RDH`. Returns `false`
    /// (dropping the frame) if the NIC owns no free descriptor.
    pub fn inject_rx(&self, frame: &[u8]) -> bool {
        self.inject_rx_reporting(frame, u16::try_from(frame.len()).expect("frame length"))
    }

    /// Like [`SimNic::inject_rx`], but the descriptor reports `length` bytes
    /// whatever was written.
    pub fn inject_rx_reporting(&self, frame: &[u8], length: u16) -> bool {
        let head = self.reg(Register::RDH) as usize;
        if head == self.reg(Register::RDT) as usize {
            return false;
        }
        let slot = unsafe { self.rx_ring().add(head) };
        let mut desc = unsafe { slot.read_volatile() };
        self.write_dma(PhysicalAddress::new(desc.addr), frame);
        desc.length = length;
        desc.status = RxStatus::new().with_dd(true).with_eop(true).into_bits();
        unsafe { slot.write_volatile(desc) };
        self.set_reg(Register::RDH, ((head + 1) % RX_RING_SIZE) as u32);
        true
    }

    /// Wire loopback: completes pending transmits and receives each frame.
    /// Returns how many frames were received.
    pub fn loopback(&self) -> usize {
        self.complete_tx()
            .iter()
            .filter(|frame| self.inject_rx(frame))
            .count()
    }

    fn read_dma(&self, pa: PhysicalAddress, len: usize) -> Vec<u8> {
        let ptr = self.mapper.phys_to_ptr(pa);
        unsafe { std::slice::from_raw_parts(ptr, len) }.to_vec()
    }

    fn write_dma(&self, pa: PhysicalAddress, data: &[u8]) {
        let ptr = self.mapper.phys_to_ptr(pa);
        unsafe { std::ptr::copy_nonoverlapping(data.as_ptr(), ptr, data.len()) };
    }
}

impl RegisterBlock for SimNic {
    fn read(&self, reg: Register) -> u32 {
        self.reg(reg)
    }

    fn write(&self, reg: Register, value: u32) {
        self.writes.lock().unwrap().push((reg, value));
        let value = if reg == Register::CTRL && DeviceControl::from_bits(value).rst() {
            // Reset completes immediately and the bit self-clears.
            self.resets.fetch_add(1, Ordering::SeqCst);
            DeviceControl::from_bits(value).with_rst(false).into_bits()
        } else if reg == Register::ICR {
            0
        } else {
            value
        };
        self.set_reg(reg, value);
    }
}

pub type Nic = E1000<&'static SimNic, Pool, TestHart>;

/// A NIC brought up over a fresh arena.
///
/// Field order matters: the driver drops before the memory it points into.
pub struct Bench {
    pub nic: Nic,
    pub sim: &'static SimNic,
    pub arena: Arena,
}

impl Bench {
    pub fn new(frames: usize) -> Self {
        let arena = Arena::new(frames);
        let sim: &'static SimNic = Box::leak(Box::new(SimNic::new(arena.mapper())));
        let rings = Box::leak(Box::new(DescriptorRings::new()));
        let nic = E1000::init(
            E1000Config::default(),
            sim,
            arena.pool(),
            TestHart,
            rings,
            &arena.mapper(),
        );
        Self { nic, sim, arena }
    }

    /// A buffer holding `payload`.
    pub fn packet(&self, payload: &[u8]) -> Mbuf {
        let mut m = self.nic.pool().alloc(0).expect("mbuf");
        m.put(payload.len()).expect("tailroom").copy_from_slice(payload);
        m
    }

    pub fn free_frames(&self) -> usize {
        self.nic.pool().allocator().free_frames()
    }
}

/// A distinct, recognisable payload.
pub fn frame(n: u8, len: usize) -> Vec<u8> {
    (0..len).map(|i| n.wrapping_add(i as u8)).collect()
}
