//! # Network Interface Configuration

/// Number of transmit descriptors.
pub const TX_RING_SIZE: usize = 16;

/// Number of receive descriptors.
pub const RX_RING_SIZE: usize = 16;

/// Size in bytes of a single ring descriptor (legacy format).
pub const DESCRIPTOR_SIZE: usize = 16;

/// Receive buffer size programmed into `RCTL.BSIZE`.
pub const RX_BUFFER_SIZE: usize = 2048;

/// Headroom reserved in front of every received packet.
pub const RX_HEADROOM: usize = 0;

/// QEMU's default station address for the emulated 82540EM, `52:54:00:12:34:56`.
pub const QEMU_MAC: [u8; 6] = [0x52, 0x54, 0x00, 0x12, 0x34, 0x56];

/// Transmit collision threshold (`TCTL.CT`).
pub const TX_COLLISION_THRESHOLD: u8 = 0x10;

/// Transmit collision distance (`TCTL.COLD`), full duplex.
pub const TX_COLLISION_DISTANCE: u16 = 0x40;

/// Inter-packet gap timings (`TIPG.IPGT`, `TIPG.IPGR1`, `TIPG.IPGR2`).
pub const TX_IPG: (u16, u16, u16) = (10, 8, 6);

const _: () = {
    // Ring byte lengths must be multiples of 128 (e1000 `TDLEN`/`RDLEN`).
    assert!((TX_RING_SIZE * DESCRIPTOR_SIZE).is_multiple_of(128));
    assert!((RX_RING_SIZE * DESCRIPTOR_SIZE).is_multiple_of(128));
    assert!(RX_HEADROOM < RX_BUFFER_SIZE);
};
