//! CPU identity.
//!
//! The pool needs to know which CPU is executing a call so it can pick that
//! CPU's free list. How that is answered is platform business, so it sits
//! behind [`CurrentCpu`].

use core::fmt;

/// Logical CPU index (`0..cpu_count`).
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct CpuId(usize);

impl CpuId {
    #[inline]
    #[must_use]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    #[inline]
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Debug for CpuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cpu#{}", self.0)
    }
}

impl fmt::Display for CpuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<usize> for CpuId {
    #[inline]
    fn from(id: usize) -> Self {
        Self(id)
    }
}

/// Answers "which CPU is running this code right now".
///
/// The answer is only stable while the caller cannot be migrated to another
/// CPU, e.g. with interrupts disabled. A stale answer is harmless for the
/// pool (it merely picks another CPU's list) but defeats the locality the
/// per-CPU split is for.
pub trait CurrentCpu {
    fn current_cpu(&self) -> CpuId;
}

impl<C: CurrentCpu + ?Sized> CurrentCpu for &C {
    #[inline]
    fn current_cpu(&self) -> CpuId {
        (**self).current_cpu()
    }
}

/// Always reports the same CPU. Useful for uniprocessor boots.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FixedCpu(pub CpuId);

impl CurrentCpu for FixedCpu {
    #[inline]
    fn current_cpu(&self) -> CpuId {
        self.0
    }
}

/// Reads the hart id that the boot code parked in the `tp` register.
///
/// RISC-V has no unprivileged "who am I" instruction; small kernels commonly copy
/// `mhartid` into `tp` during machine-mode start and never touch it again.
#[cfg(target_arch = "riscv64")]
#[derive(Debug, Copy, Clone, Default)]
pub struct ThreadPointerHart;

#[cfg(target_arch = "riscv64")]
impl CurrentCpu for ThreadPointerHart {
    #[inline]
    fn current_cpu(&self) -> CpuId {
        let tp: usize;
        // SAFETY: reading a general purpose register has no side effects.
        unsafe {
            core::arch::asm!("mv {}, tp", out(reg) tp, options(nomem, nostack, preserves_flags));
        }
        CpuId(tp)
    }
}
