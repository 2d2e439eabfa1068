use crate::regs::{DeviceRegister, Register};
use bitfield_struct::bitfield;

/// `RCTL` (`0x0100`): Receive Control.
#[bitfield(u32, order = Lsb)]
#[derive(Eq, PartialEq)]
pub struct ReceiveControl {
    /// Bit 0 — Reserved.
    #[bits(access = RO)]
    pub reserved0: bool,

    /// Bit 1 — EN: receiver enable.
    pub en: bool,

    /// Bit 2 — SBP: store bad packets.
    pub sbp: bool,

    /// Bit 3 — UPE: unicast promiscuous enable.
    pub upe: bool,

    /// Bit 4 — MPE: multicast promiscuous enable.
    pub mpe: bool,

    /// Bit 5 — LPE: long packet enable.
    pub lpe: bool,

    /// Bits 6–7 — LBM: loopback mode.
    #[bits(2)]
    pub lbm: u8,

    /// Bits 8–9 — RDMTS: receive descriptor minimum threshold size.
    #[bits(2)]
    pub rdmts: u8,

    /// Bits 10–11 — Reserved.
    #[bits(2, access = RO)]
    pub reserved1: u8,

    /// Bits 12–13 — MO: multicast offset.
    #[bits(2)]
    pub mo: u8,

    /// Bit 14 — Reserved.
    #[bits(access = RO)]
    pub reserved2: bool,

    /// Bit 15 — BAM: broadcast accept mode.
    pub bam: bool,

    /// Bits 16–17 — BSIZE: receive buffer size, see [`Self::BSIZE_2048`].
    #[bits(2)]
    pub bsize: u8,

    /// Bit 18 — VFE: VLAN filter enable.
    pub vfe: bool,

    /// Bit 19 — CFIEN: canonical form indicator enable.
    pub cfien: bool,

    /// Bit 20 — CFI: canonical form indicator value.
    pub cfi: bool,

    /// Bit 21 — Reserved.
    #[bits(access = RO)]
    pub reserved3: bool,

    /// Bit 22 — DPF: discard pause frames.
    pub dpf: bool,

    /// Bit 23 — PMCF: pass MAC control frames.
    pub pmcf: bool,

    /// Bit 24 — Reserved.
    #[bits(access = RO)]
    pub reserved4: bool,

    /// Bit 25 — BSEX: buffer size extension (multiplies `BSIZE` by 16).
    pub bsex: bool,

    /// Bit 26 — SECRC: strip Ethernet CRC.
    pub secrc: bool,

    /// Bits 27–31 — Reserved.
    #[bits(5, access = RO)]
    pub reserved5: u8,
}

impl ReceiveControl {
    /// `BSIZE` for 2048-byte buffers (with `BSEX` clear).
    pub const BSIZE_2048: u8 = 0b00;
}

impl DeviceRegister for ReceiveControl {
    const REGISTER: Register = Register::RCTL;
}
