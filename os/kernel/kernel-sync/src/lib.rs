//! # Kernel synchronization primitives
//!
//! * [`SpinLock`]: named TATAS spinlock with RAII guards.
//! * [`Hart`]: the executing CPU, its id and its interrupt flag.
//! * [`IrqGuard`]: nestable "push off / pop off" of local interrupts.
//!
//! Every lock that an interrupt handler may also take is acquired through
//! [`SpinLock::lock_irq`], which disables interrupts on the local hart for
//! the lifetime of the guard.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod irq;
mod spin_lock;

#[cfg(target_arch = "x86_64")]
pub use irq::X86Hart;
pub use irq::{Hart, IrqGuard};
pub use spin_lock::{IrqSpinLockGuard, SpinLock, SpinLockGuard};
