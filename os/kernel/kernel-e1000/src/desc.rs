//! # Legacy descriptor formats
//!
//! Both rings live in ordinary memory that the NIC reads and writes by DMA.
//! The driver owns a descriptor while its `DD` status bit is set (transmit)
//! or once the NIC has set it (receive); the NIC owns it otherwise. Fields
//! the NIC writes back are only read through the volatile accessors here.

use bitfield_struct::bitfield;
use kernel_info::net::{DESCRIPTOR_SIZE, RX_RING_SIZE, TX_RING_SIZE};
use kernel_memory_addresses::PhysicalAddress;

/// Transmit descriptor command byte (`CMD`).
#[bitfield(u8, order = Lsb)]
#[derive(Eq, PartialEq)]
pub struct TxCommand {
    /// End of packet: last descriptor of the frame.
    pub eop: bool,
    /// Insert FCS.
    pub ifcs: bool,
    /// Insert checksum at `CSO`.
    pub ic: bool,
    /// Report status: write back `DD` once sent.
    pub rs: bool,
    /// Report packet sent (82544 only).
    pub rps: bool,
    /// Descriptor extension; clear for the legacy format.
    pub dext: bool,
    /// VLAN packet enable.
    pub vle: bool,
    /// Interrupt delay enable.
    pub ide: bool,
}

/// Transmit descriptor status byte (`STA`).
#[bitfield(u8, order = Lsb)]
#[derive(Eq, PartialEq)]
pub struct TxStatus {
    /// Descriptor done.
    pub dd: bool,
    /// Excess collisions.
    pub ec: bool,
    /// Late collision.
    pub lc: bool,
    /// Transmit underrun.
    pub tu: bool,
    #[bits(4, access = RO)]
    pub reserved0: u8,
}

/// Receive descriptor status byte.
#[bitfield(u8, order = Lsb)]
#[derive(Eq, PartialEq)]
pub struct RxStatus {
    /// Descriptor done.
    pub dd: bool,
    /// End of packet.
    pub eop: bool,
    /// Ignore checksum indication.
    pub ixsm: bool,
    /// Packet is 802.1Q tagged.
    pub vp: bool,
    #[bits(access = RO)]
    pub reserved0: bool,
    /// TCP checksum calculated.
    pub tcpcs: bool,
    /// IP checksum calculated.
    pub ipcs: bool,
    /// Passed in-exact filter.
    pub pif: bool,
}

/// Legacy transmit descriptor.
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxDescriptor {
    pub addr: u64,
    pub length: u16,
    pub cso: u8,
    pub cmd: u8,
    pub status: u8,
    pub css: u8,
    pub special: u16,
}

impl TxDescriptor {
    pub const EMPTY: Self = Self {
        addr: 0,
        length: 0,
        cso: 0,
        cmd: 0,
        status: 0,
        css: 0,
        special: 0,
    };

    /// The status byte as last written back by the NIC.
    #[inline]
    #[must_use]
    pub fn status(&self) -> TxStatus {
        // SAFETY: reading a field of a live reference.
        TxStatus::from_bits(unsafe { (&raw const self.status).read_volatile() })
    }

    #[inline]
    pub fn set_status(&mut self, status: TxStatus) {
        // SAFETY: writing a field of a live exclusive reference.
        unsafe { (&raw mut self.status).write_volatile(status.into_bits()) }
    }

    /// Hands a packet to the NIC: buffer address, length and command, with
    /// the status cleared.
    #[inline]
    pub fn post(&mut self, addr: PhysicalAddress, length: u16, cmd: TxCommand) {
        self.addr = addr.as_u64();
        self.length = length;
        self.cmd = cmd.into_bits();
        self.set_status(TxStatus::new());
    }
}

/// Legacy receive descriptor.
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RxDescriptor {
    pub addr: u64,
    pub length: u16,
    pub csum: u16,
    pub status: u8,
    pub errors: u8,
    pub special: u16,
}

impl RxDescriptor {
    pub const EMPTY: Self = Self {
        addr: 0,
        length: 0,
        csum: 0,
        status: 0,
        errors: 0,
        special: 0,
    };

    #[inline]
    #[must_use]
    pub fn status(&self) -> RxStatus {
        // SAFETY: reading a field of a live reference.
        RxStatus::from_bits(unsafe { (&raw const self.status).read_volatile() })
    }

    /// Length of the received packet as written back by the NIC.
    #[inline]
    #[must_use]
    pub fn length(&self) -> u16 {
        // SAFETY: reading a field of a live reference.
        unsafe { (&raw const self.length).read_volatile() }
    }

    #[inline]
    pub fn clear_status(&mut self) {
        // SAFETY: writing a field of a live exclusive reference.
        unsafe { (&raw mut self.status).write_volatile(0) }
    }

    /// Gives the slot back to the NIC with a fresh buffer.
    #[inline]
    pub fn arm(&mut self, addr: PhysicalAddress) {
        self.addr = addr.as_u64();
        self.clear_status();
    }
}

/// Both descriptor rings, laid out for DMA.
///
/// Each ring's base address is programmed into the device, which requires
/// 16-byte alignment and a byte length that is a multiple of 128; the block
/// itself is 128-byte aligned so both rings start on such a boundary.
#[repr(C, align(128))]
#[derive(Debug)]
pub struct DescriptorRings {
    pub tx: [TxDescriptor; TX_RING_SIZE],
    pub rx: [RxDescriptor; RX_RING_SIZE],
}

impl DescriptorRings {
    /// Byte length of the transmit ring (`TDLEN`).
    #[allow(clippy::cast_possible_truncation)]
    pub const TX_BYTES: u32 = size_of::<[TxDescriptor; TX_RING_SIZE]>() as u32;

    /// Byte length of the receive ring (`RDLEN`).
    #[allow(clippy::cast_possible_truncation)]
    pub const RX_BYTES: u32 = size_of::<[RxDescriptor; RX_RING_SIZE]>() as u32;

    #[must_use]
    pub const fn new() -> Self {
        Self {
            tx: [TxDescriptor::EMPTY; TX_RING_SIZE],
            rx: [RxDescriptor::EMPTY; RX_RING_SIZE],
        }
    }
}

impl Default for DescriptorRings {
    fn default() -> Self {
        Self::new()
    }
}

const _: () = {
    assert!(size_of::<TxDescriptor>() == DESCRIPTOR_SIZE);
    assert!(size_of::<RxDescriptor>() == DESCRIPTOR_SIZE);
    assert!(DescriptorRings::TX_BYTES.is_multiple_of(128));
    assert!(DescriptorRings::RX_BYTES.is_multiple_of(128));
    assert!(core::mem::offset_of!(DescriptorRings, rx) % 128 == 0);
};
