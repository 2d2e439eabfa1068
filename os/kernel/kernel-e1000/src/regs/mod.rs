//! # Device registers
//!
//! The 82540EM exposes its registers as 32-bit words in the BAR0 MMIO window.
//! [`Register`] names a word by byte offset, [`RegisterBlock`] reads and
//! writes it, and the typed wrappers in this module give the bits names.
//!
//! | Register | Offset | Typed view |
//! |----------|--------|------------|
//! | `CTRL`   | `0x0000` | [`DeviceControl`] |
//! | `ICR`    | `0x00C0` | [`InterruptMask`] layout |
//! | `IMS`    | `0x00D0` | [`InterruptMask`] |
//! | `RCTL`   | `0x0100` | [`ReceiveControl`] |
//! | `TCTL`   | `0x0400` | [`TransmitControl`] |
//! | `TIPG`   | `0x0410` | [`TransmitIpg`] |
//! | `RAH0`   | `0x5404` | [`ReceiveAddressHigh`] |

mod ctrl;
mod interrupt;
mod ra;
mod rctl;
mod tctl;
mod tipg;

pub use ctrl::DeviceControl;
pub use interrupt::InterruptMask;
pub use ra::ReceiveAddressHigh;
pub use rctl::ReceiveControl;
pub use tctl::TransmitControl;
pub use tipg::TransmitIpg;

use core::fmt;
use core::ptr::NonNull;

/// Byte offset of a 32-bit device register.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Register(pub u32);

impl Register {
    /// Device control.
    pub const CTRL: Self = Self(0x0000);
    /// Interrupt cause read; writing 1s acknowledges.
    pub const ICR: Self = Self(0x00C0);
    /// Interrupt mask set/read.
    pub const IMS: Self = Self(0x00D0);
    /// Receive control.
    pub const RCTL: Self = Self(0x0100);
    /// Transmit control.
    pub const TCTL: Self = Self(0x0400);
    /// Transmit inter-packet gap.
    pub const TIPG: Self = Self(0x0410);
    pub const RDBAL: Self = Self(0x2800);
    pub const RDBAH: Self = Self(0x2804);
    pub const RDLEN: Self = Self(0x2808);
    pub const RDH: Self = Self(0x2810);
    pub const RDT: Self = Self(0x2818);
    /// Receive delay timer.
    pub const RDTR: Self = Self(0x2820);
    /// Receive absolute interrupt delay.
    pub const RADV: Self = Self(0x282C);
    pub const TDBAL: Self = Self(0x3800);
    pub const TDBAH: Self = Self(0x3804);
    pub const TDLEN: Self = Self(0x3808);
    pub const TDH: Self = Self(0x3810);
    pub const TDT: Self = Self(0x3818);
    /// Multicast table array, 128 words.
    pub const MTA: Self = Self(0x5200);
    /// Receive address low, slot 0.
    pub const RAL0: Self = Self(0x5400);
    /// Receive address high, slot 0.
    pub const RAH0: Self = Self(0x5404);

    /// Number of 32-bit words in the multicast table array.
    pub const MTA_LEN: u32 = 4096 / 32;

    /// The `index`-th word of a register array starting here.
    #[inline]
    #[must_use]
    pub const fn at(self, index: u32) -> Self {
        Self(self.0 + 4 * index)
    }

    #[inline]
    #[must_use]
    pub const fn offset(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Register({:#06x})", self.0)
    }
}

/// 32-bit register access to one device.
///
/// Hardware goes through [`MmioRegisters`]; tests substitute a simulated
/// register file.
pub trait RegisterBlock {
    fn read(&self, reg: Register) -> u32;
    fn write(&self, reg: Register, value: u32);
}

impl<R: RegisterBlock + ?Sized> RegisterBlock for &R {
    #[inline]
    fn read(&self, reg: Register) -> u32 {
        (**self).read(reg)
    }

    #[inline]
    fn write(&self, reg: Register, value: u32) {
        (**self).write(reg, value);
    }
}

/// A register with a typed, bitfield view.
pub trait DeviceRegister: Copy + From<u32> + Into<u32> {
    const REGISTER: Register;

    #[inline]
    fn load<R: RegisterBlock + ?Sized>(regs: &R) -> Self {
        Self::from(regs.read(Self::REGISTER))
    }

    #[inline]
    fn store<R: RegisterBlock + ?Sized>(self, regs: &R) {
        regs.write(Self::REGISTER, self.into());
    }
}

/// Volatile access to the memory-mapped register window.
pub struct MmioRegisters {
    base: NonNull<u32>,
}

// Safety: MMIO accesses are single volatile word loads/stores; ordering
// between them is the caller's job (the driver serializes under its lock).
unsafe impl Send for MmioRegisters {}
unsafe impl Sync for MmioRegisters {}

impl MmioRegisters {
    /// # Safety
    /// `base` must point to the device's mapped BAR0 window (at least
    /// `0x6000` bytes, uncached) for as long as the value lives.
    #[inline]
    #[must_use]
    pub const unsafe fn new(base: NonNull<u32>) -> Self {
        Self { base }
    }

    #[inline]
    fn ptr(&self, reg: Register) -> *mut u32 {
        self.base.as_ptr().wrapping_byte_add(reg.offset() as usize)
    }
}

impl RegisterBlock for MmioRegisters {
    #[inline]
    fn read(&self, reg: Register) -> u32 {
        // SAFETY: `new`'s contract covers every register offset we name.
        unsafe { self.ptr(reg).read_volatile() }
    }

    #[inline]
    fn write(&self, reg: Register, value: u32) {
        // SAFETY: as in `read`.
        unsafe { self.ptr(reg).write_volatile(value) }
    }
}

impl fmt::Debug for MmioRegisters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MmioRegisters")
            .field("base", &self.base)
            .finish()
    }
}
