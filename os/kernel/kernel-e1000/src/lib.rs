//! # e1000 Network Driver
//!
//! A descriptor-ring driver for the Intel 82540EM, the NIC QEMU emulates as
//! `-device e1000`. The driver moves whole Ethernet frames between the NIC
//! and a network stack; everything above the MAC layer belongs to the stack.
//!
//! ```text
//!               transmit(buf)                    net_rx(buf)
//!                    │                               ▲
//! ┌──────────────────▼───────────────────────────────┴──────────────────┐
//! │ E1000          device lock: registers, both rings, parked buffers    │
//! ├──────────────────────────────────┬───────────────────────────────────┤
//! │ TX ring (16)  TDH ──► TDT        │ RX ring (16)  RDH ──► RDT         │
//! │ driver posts at TDT              │ NIC fills from RDH                │
//! │ NIC sets DD when sent            │ driver drains RDT+1 while DD      │
//! └──────────────────────────────────┴───────────────────────────────────┘
//!                    │  DMA                          ▲  DMA
//!                    ▼                               │
//!                 wire ───────────────────────────► wire
//! ```
//!
//! ## Core Components
//!
//! * [`E1000`]: bring-up ([`E1000::init`]), [`E1000::transmit`] and the
//!   interrupt handler [`E1000::intr`].
//! * [`regs`]: register offsets and typed bitfield views, accessed through a
//!   [`RegisterBlock`](regs::RegisterBlock) so the driver also runs against a
//!   simulated device.
//! * [`desc`]: the legacy transmit and receive descriptor formats.
//! * [`buffer`]: what the driver needs from packet buffers and the stack.
//! * [`mbuf`]: frame-backed packet buffers over any
//!   [`FrameAllocator`](kernel_alloc::FrameAllocator).
//!
//! ## Failure model
//!
//! * A full transmit ring is reported to the caller with the buffer handed
//!   back; the driver never retries.
//! * Running out of buffers while filling or re-arming the receive ring is
//!   fatal.
//!
//! ## Usage
//! ```rust,no_run
//! use core::ptr::NonNull;
//! use kernel_alloc::phys_mapper::IdentityMapper;
//! use kernel_e1000::desc::DescriptorRings;
//! use kernel_e1000::mbuf::{Mbuf, MbufPool};
//! use kernel_e1000::regs::MmioRegisters;
//! use kernel_e1000::{BufferPool, E1000, E1000Config};
//! # use kernel_alloc::FrameAllocator;
//! # use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K};
//! # use kernel_sync::Hart;
//! # struct BootHart;
//! # impl Hart for BootHart {
//! #     fn id(&self) -> usize { 0 }
//! #     fn interrupts_enabled(&self) -> bool { false }
//! #     fn disable_interrupts(&self) {}
//! #     fn enable_interrupts(&self) {}
//! # }
//! # struct Kmem;
//! # impl FrameAllocator for Kmem {
//! #     fn alloc(&self) -> Option<PhysicalPage<Size4K>> { None }
//! #     fn free(&self, _: PhysicalAddress) {}
//! # }
//! # let bar0: *mut u32 = core::ptr::null_mut();
//!
//! static mut RINGS: DescriptorRings = DescriptorRings::new();
//!
//! let regs = unsafe { MmioRegisters::new(NonNull::new(bar0).unwrap()) };
//! let pool = MbufPool::new(Kmem, IdentityMapper);
//! let rings = unsafe { &mut *(&raw mut RINGS) };
//! let nic = E1000::init(E1000Config::default(), regs, pool, BootHart, rings, &IdentityMapper);
//!
//! // From the NIC's interrupt handler:
//! nic.intr(&|packet: Mbuf| nic.pool().free(packet));
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod buffer;
pub mod desc;
mod driver;
mod error;
pub mod mbuf;
pub mod regs;

pub use buffer::{BufferPool, NetStack, PacketBuffer};
pub use driver::{E1000, E1000Config, E1000Stats};
pub use error::{MbufError, TransmitError};
