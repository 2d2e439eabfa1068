use crate::regs::{DeviceRegister, Register};
use bitfield_struct::bitfield;

/// Interrupt cause bits, shared by `ICR`, `ICS`, `IMS` and `IMC`.
///
/// As [`DeviceRegister`] this is `IMS` (`0x00D0`): writing 1s enables the
/// corresponding causes.
#[bitfield(u32, order = Lsb)]
#[derive(Eq, PartialEq)]
pub struct InterruptMask {
    /// Bit 0 — TXDW: transmit descriptor written back.
    pub txdw: bool,

    /// Bit 1 — TXQE: transmit queue empty.
    pub txqe: bool,

    /// Bit 2 — LSC: link status change.
    pub lsc: bool,

    /// Bit 3 — RXSEQ: receive sequence error.
    pub rxseq: bool,

    /// Bit 4 — RXDMT0: receive descriptor minimum threshold reached.
    pub rxdmt0: bool,

    /// Bit 5 — Reserved.
    #[bits(access = RO)]
    pub reserved0: bool,

    /// Bit 6 — RXO: receiver overrun.
    pub rxo: bool,

    /// Bit 7 — RXT0: receiver timer; with zero receive delays this fires on
    /// every receive descriptor write-back.
    pub rxt0: bool,

    /// Bit 8 — Reserved.
    #[bits(access = RO)]
    pub reserved1: bool,

    /// Bit 9 — MDAC: MDI/O access complete.
    pub mdac: bool,

    /// Bit 10 — RXCFG: receiving /C/ ordered sets.
    pub rxcfg: bool,

    /// Bit 11 — Reserved.
    #[bits(access = RO)]
    pub reserved2: bool,

    /// Bit 12 — PHYINT: PHY interrupt.
    pub phyint: bool,

    /// Bits 13–14 — GPI: general purpose interrupts.
    #[bits(2)]
    pub gpi: u8,

    /// Bit 15 — TXD_LOW: transmit descriptor low threshold hit.
    pub txd_low: bool,

    /// Bit 16 — SRPD: small receive packet detected.
    pub srpd: bool,

    /// Bits 17–31 — Reserved.
    #[bits(15, access = RO)]
    pub reserved3: u16,
}

impl DeviceRegister for InterruptMask {
    const REGISTER: Register = Register::IMS;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receive_timer_is_bit_7() {
        assert_eq!(InterruptMask::new().with_rxt0(true).into_bits(), 0x80);
        assert!(!InterruptMask::from_bits(0x80).txdw());
    }
}
