use crate::regs::{DeviceRegister, Register};
use bitfield_struct::bitfield;

/// `TCTL` (`0x0400`): Transmit Control.
#[bitfield(u32, order = Lsb)]
#[derive(Eq, PartialEq)]
pub struct TransmitControl {
    /// Bit 0 — Reserved.
    #[bits(access = RO)]
    pub reserved0: bool,

    /// Bit 1 — EN: transmit enable.
    pub en: bool,

    /// Bit 2 — Reserved.
    #[bits(access = RO)]
    pub reserved1: bool,

    /// Bit 3 — PSP: pad short packets to 64 bytes.
    pub psp: bool,

    /// Bits 4–11 — CT: collision threshold (retransmit attempts).
    #[bits(8)]
    pub ct: u8,

    /// Bits 12–21 — COLD: collision distance in byte times.
    #[bits(10)]
    pub cold: u16,

    /// Bit 22 — SWXOFF: software XOFF transmission.
    pub swxoff: bool,

    /// Bit 23 — Reserved.
    #[bits(access = RO)]
    pub reserved2: bool,

    /// Bit 24 — RTLC: retransmit on late collision.
    pub rtlc: bool,

    /// Bit 25 — NRTU: no retransmit on underrun.
    pub nrtu: bool,

    /// Bits 26–31 — Reserved.
    #[bits(6, access = RO)]
    pub reserved3: u8,
}

impl DeviceRegister for TransmitControl {
    const REGISTER: Register = Register::TCTL;
}
