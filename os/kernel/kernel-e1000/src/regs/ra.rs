use crate::regs::{DeviceRegister, Register};
use bitfield_struct::bitfield;

/// `RAH0` (`0x5404`): Receive Address High, filter slot 0.
///
/// Together with `RAL0` (the first four address bytes, little-endian) this
/// is the station address the receive filter accepts.
#[bitfield(u32, order = Lsb)]
#[derive(Eq, PartialEq)]
pub struct ReceiveAddressHigh {
    /// Bits 0–15 — RAH: address bytes 4 and 5, little-endian.
    pub address: u16,

    /// Bits 16–17 — ASEL: address select (00 = destination address).
    #[bits(2)]
    pub asel: u8,

    /// Bits 18–30 — Reserved.
    #[bits(13, access = RO)]
    pub reserved0: u16,

    /// Bit 31 — AV: address valid.
    pub av: bool,
}

impl ReceiveAddressHigh {
    /// Splits a station address into its `RAL0` word and valid `RAH0` view.
    #[must_use]
    pub const fn split_mac(mac: [u8; 6]) -> (u32, Self) {
        let low = u32::from_le_bytes([mac[0], mac[1], mac[2], mac[3]]);
        let high = Self::new()
            .with_address(u16::from_le_bytes([mac[4], mac[5]]))
            .with_av(true);
        (low, high)
    }
}

impl DeviceRegister for ReceiveAddressHigh {
    const REGISTER: Register = Register::RAH0;
}
