use crate::address::PhysicalAddress;
use crate::cpu::CpuId;
use crate::layout::PhysRange;

/// Errors reported by [`PagePool`](crate::PagePool) operations.
///
/// Every variant except [`OutOfMemory`](Self::OutOfMemory) means a caller
/// broke the allocator's contract. Those are not expected to be recovered
/// from; [`is_fatal`](Self::is_fatal) tells the two classes apart.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("no free pages on any CPU")]
    OutOfMemory,
    #[error("page address {0} is not 4 KiB aligned")]
    Misaligned(PhysicalAddress),
    #[error("page address {addr} is outside the managed range {range}")]
    OutOfRange { addr: PhysicalAddress, range: PhysRange },
    #[error("CPU {cpu} has no page pool ({cpu_count} configured)")]
    UnknownCpu { cpu: CpuId, cpu_count: usize },
}

impl PoolError {
    /// Whether this error indicates misuse rather than exhaustion.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::OutOfMemory)
    }
}

/// Errors reported by [`PagePool::init`](crate::PagePool::init).
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InitError {
    #[error("at least one CPU is required")]
    NoCpus,
    #[error("{requested} CPUs requested, at most {max} supported")]
    TooManyCpus { requested: usize, max: usize },
    #[error("range {0} ends before it starts")]
    InvertedRange(PhysRange),
    #[error("range {range} holds {pages} pages, more than a page index can address")]
    RangeTooLarge { range: PhysRange, pages: u64 },
    #[error("link table holds {provided} entries, {required} required")]
    LinkTableTooSmall { required: usize, provided: usize },
    #[error("failed to seed page pool: {0}")]
    Seed(#[from] PoolError),
}
