use crate::address::PhysicalAddress;
use crate::error::InitError;
use crate::free_list::PageIndex;
use crate::layout::{NCPU, PHYSTOP, PhysRange};

/// Boot-time parameters of a [`PagePool`](crate::PagePool).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Physical memory handed to the pool. Need not be page aligned.
    pub range: PhysRange,
    /// Number of per-CPU pools, `1..=NCPU`.
    pub cpu_count: usize,
}

impl PoolConfig {
    #[must_use]
    pub const fn new(range: PhysRange, cpu_count: usize) -> Self {
        Self { range, cpu_count }
    }

    /// Everything from the end of the kernel image up to [`PHYSTOP`], split
    /// across [`NCPU`] pools.
    ///
    /// `kernel_end` is the first address after the kernel image, usually the
    /// `end` symbol of the linker script.
    #[must_use]
    pub const fn platform_default(kernel_end: PhysicalAddress) -> Self {
        Self::new(
            PhysRange::new(kernel_end, PhysicalAddress::new(PHYSTOP)),
            NCPU,
        )
    }

    /// Checks the configuration against a link table of `links` entries and
    /// returns the number of pages that will be managed.
    ///
    /// # Errors
    /// Any [`InitError`] other than [`InitError::Seed`].
    pub fn validate(&self, links: usize) -> Result<usize, InitError> {
        if self.cpu_count == 0 {
            return Err(InitError::NoCpus);
        }
        if self.cpu_count > NCPU {
            return Err(InitError::TooManyCpus {
                requested: self.cpu_count,
                max: NCPU,
            });
        }
        if !self.range.is_ordered() {
            return Err(InitError::InvertedRange(self.range));
        }

        let pages = self.range.page_count();
        let too_large = InitError::RangeTooLarge {
            range: self.range,
            pages,
        };
        if pages > u64::from(PageIndex::MAX) + 1 {
            return Err(too_large);
        }
        let pages = usize::try_from(pages).map_err(|_| too_large)?;

        if links < pages {
            return Err(InitError::LinkTableTooSmall {
                required: pages,
                provided: links,
            });
        }
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::PAGE_SIZE;
    use crate::layout::KERNBASE;

    #[test]
    fn platform_default_covers_ram_after_kernel() {
        let cfg = PoolConfig::platform_default(PhysicalAddress::new(KERNBASE + 0x2_1234));
        assert_eq!(cfg.cpu_count, NCPU);
        assert_eq!(cfg.range.first_page(), Some(PhysicalAddress::new(KERNBASE + 0x2_2000)));
        assert_eq!(
            cfg.range.page_count(),
            (PHYSTOP - KERNBASE - 0x2_2000) / PAGE_SIZE
        );
    }

    #[test]
    fn rejects_bad_cpu_counts() {
        let range = PhysRange::from_u64(0x1000, 0x9000);
        assert_eq!(PoolConfig::new(range, 0).validate(8), Err(InitError::NoCpus));
        assert_eq!(
            PoolConfig::new(range, NCPU + 1).validate(8),
            Err(InitError::TooManyCpus {
                requested: NCPU + 1,
                max: NCPU
            })
        );
    }

    #[test]
    fn rejects_inverted_range_and_short_link_table() {
        let inverted = PhysRange::from_u64(0x9000, 0x1000);
        assert_eq!(
            PoolConfig::new(inverted, 1).validate(0),
            Err(InitError::InvertedRange(inverted))
        );

        let range = PhysRange::from_u64(0x1000, 0x9000);
        assert_eq!(
            PoolConfig::new(range, 2).validate(7),
            Err(InitError::LinkTableTooSmall {
                required: 8,
                provided: 7
            })
        );
        assert_eq!(PoolConfig::new(range, 2).validate(8), Ok(8));
    }

    #[test]
    fn rejects_ranges_beyond_page_index() {
        let range = PhysRange::from_u64(0, (u64::from(u32::MAX) + 1) * PAGE_SIZE);
        assert!(matches!(
            PoolConfig::new(range, 1).validate(usize::MAX),
            Err(InitError::RangeTooLarge { .. })
        ));
    }

    #[test]
    fn empty_range_is_valid() {
        let range = PhysRange::from_u64(0x1000, 0x1000);
        assert_eq!(PoolConfig::new(range, 4).validate(0), Ok(0));
    }
}
