use crate::regs::{DeviceRegister, Register};
use bitfield_struct::bitfield;

/// `TIPG` (`0x0410`): Transmit Inter-Packet Gap.
#[bitfield(u32, order = Lsb)]
#[derive(Eq, PartialEq)]
pub struct TransmitIpg {
    /// Bits 0–9 — IPGT: back-to-back gap.
    #[bits(10)]
    pub ipgt: u16,

    /// Bits 10–19 — IPGR1: part one of the non-back-to-back gap.
    #[bits(10)]
    pub ipgr1: u16,

    /// Bits 20–29 — IPGR2: part two of the non-back-to-back gap.
    #[bits(10)]
    pub ipgr2: u16,

    /// Bits 30–31 — Reserved.
    #[bits(2, access = RO)]
    pub reserved0: u8,
}

impl DeviceRegister for TransmitIpg {
    const REGISTER: Register = Register::TIPG;
}
