use core::marker::PhantomData;

/// A hardware execution context (CPU core / hart).
///
/// This is the seam between the synchronization primitives and the
/// architecture: it answers "which hart am I on" and toggles the local
/// interrupt-enable flag. The kernel provides one implementation per
/// architecture ([`X86Hart`] on `x86_64`); tests provide a simulated one.
///
/// # Contract
///
/// [`Hart::id`] is only meaningful while local interrupts are disabled:
/// with interrupts enabled the caller may be preempted and migrated between
/// reading the id and acting on it. Code should obtain the id through
/// [`IrqGuard::cpu_id`], which makes that requirement structural.
pub trait Hart {
    /// Logical index of the executing hart.
    fn id(&self) -> usize;

    /// Whether interrupts are currently enabled on the executing hart.
    fn interrupts_enabled(&self) -> bool;

    /// Disables interrupts on the executing hart.
    fn disable_interrupts(&self);

    /// Enables interrupts on the executing hart.
    fn enable_interrupts(&self);
}

impl<H: Hart + ?Sized> Hart for &H {
    #[inline]
    fn id(&self) -> usize {
        (**self).id()
    }

    #[inline]
    fn interrupts_enabled(&self) -> bool {
        (**self).interrupts_enabled()
    }

    #[inline]
    fn disable_interrupts(&self) {
        (**self).disable_interrupts();
    }

    #[inline]
    fn enable_interrupts(&self) {
        (**self).enable_interrupts();
    }
}

/// RAII guard that disables interrupts on creation and restores them on drop.
///
/// `IrqGuard::new()` snapshots the interrupt flag. If interrupts were enabled,
/// it disables them. On drop, it re-enables them **only** if they were
/// previously enabled, so guards nest: the outermost drop re-enables.
///
/// The guard is `!Send`: it describes the state of the hart it was created on.
///
/// # Examples
///
/// ```no_run
/// use kernel_sync::{Hart, IrqGuard};
///
/// fn on_this_cpu<H: Hart>(hart: &H) -> usize {
///     let irq = IrqGuard::new(hart);
///     // No migration possible until `irq` drops.
///     irq.cpu_id()
/// }
/// ```
pub struct IrqGuard<'h, H: Hart + ?Sized> {
    hart: &'h H,
    /// Whether interrupts were enabled when the guard was created.
    were_enabled: bool,
    _not_send: PhantomData<*mut ()>,
}

impl<'h, H: Hart + ?Sized> IrqGuard<'h, H> {
    /// Disables interrupts if they are currently enabled and remembers the state.
    #[inline]
    #[must_use]
    pub fn new(hart: &'h H) -> Self {
        let enabled = hart.interrupts_enabled();
        if enabled {
            hart.disable_interrupts();
        }
        Self {
            hart,
            were_enabled: enabled,
            _not_send: PhantomData,
        }
    }

    /// Index of the hart this guard pins the caller to.
    #[inline]
    #[must_use]
    pub fn cpu_id(&self) -> usize {
        self.hart.id()
    }
}

impl<H: Hart + ?Sized> Drop for IrqGuard<'_, H> {
    /// Restores interrupts only if they were previously enabled.
    fn drop(&mut self) {
        if self.were_enabled {
            self.hart.enable_interrupts();
        }
    }
}

/// The `x86_64` hart: `cli`/`sti`, `RFLAGS.IF` and the initial APIC id.
///
/// # Platform / Privilege
///
/// [`Hart::disable_interrupts`] and [`Hart::enable_interrupts`] execute
/// `cli`/`sti` and therefore require CPL0. Reading the flag and the APIC id
/// is legal at any privilege level.
///
/// The logical hart index is the initial APIC id reported by `CPUID.01h`,
/// which is dense on the single-socket machines this kernel targets.
#[cfg(target_arch = "x86_64")]
#[derive(Debug, Default, Clone, Copy)]
pub struct X86Hart;

#[cfg(target_arch = "x86_64")]
impl X86Hart {
    /// `RFLAGS.IF`
    const IF: u64 = 1 << 9;

    /// Returns the current `RFLAGS` value (via `pushfq/pop`).
    #[inline]
    #[must_use]
    pub fn rflags() -> u64 {
        let r: u64;
        unsafe { core::arch::asm!("pushfq; pop {}", out(reg) r, options(nomem, preserves_flags)) }
        r
    }
}

#[cfg(target_arch = "x86_64")]
impl Hart for X86Hart {
    #[inline]
    fn id(&self) -> usize {
        #[allow(unused_unsafe)]
        let leaf = unsafe { core::arch::x86_64::__cpuid(1) };
        (leaf.ebx >> 24) as usize
    }

    #[inline]
    fn interrupts_enabled(&self) -> bool {
        Self::rflags() & Self::IF != 0
    }

    #[inline]
    fn disable_interrupts(&self) {
        unsafe { core::arch::asm!("cli", options(nomem, nostack, preserves_flags)) }
    }

    #[inline]
    fn enable_interrupts(&self) {
        unsafe { core::arch::asm!("sti", options(nomem, nostack, preserves_flags)) }
    }
}
