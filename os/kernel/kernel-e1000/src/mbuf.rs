//! # Packet buffers carved from physical frames
//!
//! An [`Mbuf`] is one 4 KiB frame of which the first [`MBUF_SIZE`] bytes hold
//! a packet. The payload is the window `[head, head + len)`; headers are
//! prepended by moving `head` down ([`Mbuf::push`]) and stripped by moving it
//! up ([`Mbuf::pull`]).
//!
//! ```text
//!  0          head           head + len           MBUF_SIZE
//!  ├──────────┼──────────────────┼────────────────────┤
//!  │ headroom │     payload      │      tailroom      │
//! ```

use crate::buffer::{BufferPool, PacketBuffer};
use crate::error::MbufError;
use core::fmt;
use core::ptr::NonNull;
use kernel_alloc::FrameAllocator;
use kernel_alloc::phys_mapper::PhysMapper;
use kernel_info::net::RX_BUFFER_SIZE;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K};

/// Usable bytes per buffer; matches the NIC's receive buffer size.
pub const MBUF_SIZE: usize = RX_BUFFER_SIZE;

/// A packet buffer backed by one physical frame.
///
/// Buffers are not freed on drop; give them back through [`MbufPool::free`].
pub struct Mbuf {
    frame: PhysicalPage<Size4K>,
    data: NonNull<u8>,
    head: usize,
    len: usize,
}

// Safety: an `Mbuf` exclusively owns its frame.
unsafe impl Send for Mbuf {}

impl Mbuf {
    #[inline]
    #[must_use]
    pub const fn frame(&self) -> PhysicalPage<Size4K> {
        self.frame
    }

    #[inline]
    #[must_use]
    pub const fn headroom(&self) -> usize {
        self.head
    }

    #[inline]
    #[must_use]
    pub const fn tailroom(&self) -> usize {
        MBUF_SIZE - self.head - self.len
    }

    /// Prepends `n` bytes to the payload and returns them.
    ///
    /// # Errors
    /// [`MbufError::NoHeadroom`] if fewer than `n` bytes precede the payload.
    pub fn push(&mut self, n: usize) -> Result<&mut [u8], MbufError> {
        if n > self.head {
            return Err(MbufError::NoHeadroom {
                requested: n,
                available: self.head,
            });
        }
        self.head -= n;
        self.len += n;
        Ok(&mut self.as_mut_slice()[..n])
    }

    /// Strips `n` bytes off the front of the payload and returns them.
    ///
    /// # Errors
    /// [`MbufError::TooShort`] if the payload is shorter than `n`.
    pub fn pull(&mut self, n: usize) -> Result<&[u8], MbufError> {
        if n > self.len {
            return Err(MbufError::TooShort {
                requested: n,
                len: self.len,
            });
        }
        let start = self.head;
        self.head += n;
        self.len -= n;
        Ok(&self.storage()[start..start + n])
    }

    /// Appends `n` bytes to the payload and returns them.
    ///
    /// # Errors
    /// [`MbufError::NoTailroom`] if fewer than `n` bytes follow the payload.
    pub fn put(&mut self, n: usize) -> Result<&mut [u8], MbufError> {
        let available = self.tailroom();
        if n > available {
            return Err(MbufError::NoTailroom {
                requested: n,
                available,
            });
        }
        self.len += n;
        let len = self.len;
        Ok(&mut self.as_mut_slice()[len - n..])
    }

    /// Strips `n` bytes off the end of the payload and returns them.
    ///
    /// # Errors
    /// [`MbufError::TooShort`] if the payload is shorter than `n`.
    pub fn trim(&mut self, n: usize) -> Result<&[u8], MbufError> {
        if n > self.len {
            return Err(MbufError::TooShort {
                requested: n,
                len: self.len,
            });
        }
        self.len -= n;
        let end = self.head + self.len;
        Ok(&self.storage()[end..end + n])
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.storage()[self.head..self.head + self.len]
    }

    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        let range = self.head..self.head + self.len;
        // SAFETY: the frame is mapped and exclusively ours; see `storage`.
        let storage = unsafe { core::slice::from_raw_parts_mut(self.data.as_ptr(), MBUF_SIZE) };
        &mut storage[range]
    }

    fn storage(&self) -> &[u8] {
        // SAFETY: `data` maps the first MBUF_SIZE bytes of the owned frame.
        unsafe { core::slice::from_raw_parts(self.data.as_ptr(), MBUF_SIZE) }
    }
}

impl PacketBuffer for Mbuf {
    #[inline]
    fn dma_address(&self) -> PhysicalAddress {
        self.frame.base() + self.head as u64
    }

    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn capacity(&self) -> usize {
        MBUF_SIZE - self.head
    }

    /// # Panics
    /// If the payload would extend past [`MBUF_SIZE`].
    fn set_len(&mut self, len: usize) {
        assert!(
            self.head + len <= MBUF_SIZE,
            "mbuf: length {len} exceeds buffer at headroom {}",
            self.head
        );
        self.len = len;
    }
}

impl fmt::Debug for Mbuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mbuf")
            .field("frame", &self.frame)
            .field("head", &self.head)
            .field("len", &self.len)
            .finish()
    }
}

/// [`BufferPool`] taking one frame per buffer from a [`FrameAllocator`].
#[derive(Debug)]
pub struct MbufPool<A, M> {
    allocator: A,
    mapper: M,
}

impl<A: FrameAllocator, M: PhysMapper> MbufPool<A, M> {
    #[must_use]
    pub const fn new(allocator: A, mapper: M) -> Self {
        Self { allocator, mapper }
    }

    #[must_use]
    pub const fn allocator(&self) -> &A {
        &self.allocator
    }
}

impl<A: FrameAllocator, M: PhysMapper> BufferPool for MbufPool<A, M> {
    type Buffer = Mbuf;

    fn alloc(&self, headroom: usize) -> Option<Mbuf> {
        if headroom > MBUF_SIZE {
            return None;
        }
        let frame = self.allocator.alloc()?;
        let Some(data) = NonNull::new(self.mapper.phys_to_ptr(frame.base())) else {
            self.allocator.free(frame.base());
            return None;
        };
        Some(Mbuf {
            frame,
            data,
            head: headroom,
            len: 0,
        })
    }

    fn free(&self, buf: Mbuf) {
        self.allocator.free(buf.frame.base());
    }
}
