use crate::regs::{DeviceRegister, Register};
use bitfield_struct::bitfield;

/// `CTRL` (`0x0000`): Device Control.
///
/// The driver only asserts [`rst`](Self::rst); the remaining fields are named
/// so that read-modify-write cycles preserve them.
#[bitfield(u32, order = Lsb)]
#[derive(Eq, PartialEq)]
pub struct DeviceControl {
    /// Bit 0 — FD: full duplex.
    pub fd: bool,

    /// Bits 1–2 — Reserved.
    #[bits(2, access = RO)]
    pub reserved0: u8,

    /// Bit 3 — LRST: link reset.
    pub lrst: bool,

    /// Bit 4 — Reserved.
    #[bits(access = RO)]
    pub reserved1: bool,

    /// Bit 5 — ASDE: auto-speed detection enable.
    pub asde: bool,

    /// Bit 6 — SLU: set link up.
    pub slu: bool,

    /// Bit 7 — ILOS: invert loss-of-signal.
    pub ilos: bool,

    /// Bits 8–9 — SPEED: 00 = 10 Mb/s, 01 = 100 Mb/s, 10 = 1000 Mb/s.
    #[bits(2)]
    pub speed: u8,

    /// Bit 10 — Reserved.
    #[bits(access = RO)]
    pub reserved2: bool,

    /// Bit 11 — FRCSPD: force speed.
    pub frcspd: bool,

    /// Bit 12 — FRCDPLX: force duplex.
    pub frcdplx: bool,

    /// Bits 13–17 — Reserved.
    #[bits(5, access = RO)]
    pub reserved3: u8,

    /// Bit 18 — SDP0_DATA.
    pub sdp0_data: bool,

    /// Bit 19 — SDP1_DATA.
    pub sdp1_data: bool,

    /// Bit 20 — ADVD3WUC: D3Cold wakeup capability advertisement.
    pub advd3wuc: bool,

    /// Bit 21 — EN_PHY_PWR_MGMT.
    pub en_phy_pwr_mgmt: bool,

    /// Bit 22 — SDP0_IODIR.
    pub sdp0_iodir: bool,

    /// Bit 23 — SDP1_IODIR.
    pub sdp1_iodir: bool,

    /// Bits 24–25 — Reserved.
    #[bits(2, access = RO)]
    pub reserved4: u8,

    /// Bit 26 — RST: device reset (self-clearing).
    pub rst: bool,

    /// Bit 27 — RFCE: receive flow control enable.
    pub rfce: bool,

    /// Bit 28 — TFCE: transmit flow control enable.
    pub tfce: bool,

    /// Bit 29 — Reserved.
    #[bits(access = RO)]
    pub reserved5: bool,

    /// Bit 30 — VME: VLAN mode enable.
    pub vme: bool,

    /// Bit 31 — PHY_RST: PHY reset.
    pub phy_rst: bool,
}

impl DeviceRegister for DeviceControl {
    const REGISTER: Register = Register::CTRL;
}
