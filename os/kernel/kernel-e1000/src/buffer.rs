//! The interfaces between the driver, its packet buffers and the network stack.
//!
//! ```text
//!           net_rx(buf)            transmit(buf)
//!   ┌──────────────────────┐   ┌─────────────────────┐
//!   │       NetStack       │◄──┤                     │
//!   └──────────────────────┘   │        E1000        │
//!   ┌──────────────────────┐   │                     │
//!   │      BufferPool      │◄──┤ alloc / free        │
//!   └──────────────────────┘   └─────────────────────┘
//! ```
//!
//! Ownership of a buffer moves with every call: `transmit` takes it, the
//! driver frees it once the NIC has retired its slot, and `net_rx` hands a
//! received buffer to the stack for good.

use core::fmt::Debug;
use kernel_memory_addresses::PhysicalAddress;

/// A packet buffer the NIC can reach by DMA.
pub trait PacketBuffer: Debug {
    /// Physical address of the first payload byte.
    fn dma_address(&self) -> PhysicalAddress;

    /// Payload length in bytes.
    fn len(&self) -> usize;

    /// Largest length [`set_len`](Self::set_len) accepts.
    fn capacity(&self) -> usize;

    /// Sets the payload length, e.g. to what the NIC reported on receive.
    fn set_len(&mut self, len: usize);

    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Source of packet buffers.
pub trait BufferPool {
    type Buffer: PacketBuffer;

    /// A fresh buffer with `headroom` bytes reserved in front of the payload,
    /// or `None` if memory is exhausted.
    fn alloc(&self, headroom: usize) -> Option<Self::Buffer>;

    /// Returns a buffer to the pool.
    fn free(&self, buf: Self::Buffer);
}

impl<P: BufferPool + ?Sized> BufferPool for &P {
    type Buffer = P::Buffer;

    #[inline]
    fn alloc(&self, headroom: usize) -> Option<Self::Buffer> {
        (**self).alloc(headroom)
    }

    #[inline]
    fn free(&self, buf: Self::Buffer) {
        (**self).free(buf);
    }
}

/// Receives packets from the driver.
///
/// Called without the device lock held, so the stack may call back into the
/// driver (for instance to transmit a reply).
pub trait NetStack<B> {
    fn net_rx(&self, buf: B);
}

impl<B, F: Fn(B)> NetStack<B> for F {
    #[inline]
    fn net_rx(&self, buf: B) {
        self(buf);
    }
}
