//! # Physical Memory Layout
//!
//! The managed physical range and the platform defaults it is usually built
//! from. The defaults describe the QEMU `virt` RISC-V board: RAM starts at
//! [`KERNBASE`], the kernel image is loaded there, and everything from the end
//! of the image up to [`PHYSTOP`] is handed to the page pool.

use crate::address::{PAGE_SIZE, PhysicalAddress, PhysicalPage};
use crate::error::PoolError;
use crate::free_list::PageIndex;
use core::fmt;

/// Start of RAM; the kernel image is loaded here.
pub const KERNBASE: u64 = 0x8000_0000;

/// End of the RAM the kernel uses (exclusive).
pub const PHYSTOP: u64 = KERNBASE + 128 * 1024 * 1024;

/// Maximum number of CPUs (harts) the kernel supports.
pub const NCPU: usize = 8;

/// Upper bound on the pages any range inside `[KERNBASE, PHYSTOP)` holds;
/// sizes a static [`PageLink`](crate::PageLink) table.
#[allow(clippy::cast_possible_truncation)]
pub const MAX_PAGES: usize = ((PHYSTOP - KERNBASE) / PAGE_SIZE) as usize;

const _: () = {
    assert!(KERNBASE.is_multiple_of(PAGE_SIZE));
    assert!(PHYSTOP.is_multiple_of(PAGE_SIZE));
    assert!(PHYSTOP > KERNBASE);
    assert!(NCPU > 0);
};

/// A half-open physical range `[start, end)`.
///
/// The *managed pages* of a range are the page-aligned addresses `p` with
/// `align_up(start) <= p` and `p + PAGE_SIZE <= end`: an unaligned head is
/// skipped and a partial tail page is never handed out.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct PhysRange {
    start: PhysicalAddress,
    end: PhysicalAddress,
}

impl PhysRange {
    #[inline]
    #[must_use]
    pub const fn new(start: PhysicalAddress, end: PhysicalAddress) -> Self {
        Self { start, end }
    }

    #[inline]
    #[must_use]
    pub const fn from_u64(start: u64, end: u64) -> Self {
        Self::new(PhysicalAddress::new(start), PhysicalAddress::new(end))
    }

    #[inline]
    #[must_use]
    pub const fn start(&self) -> PhysicalAddress {
        self.start
    }

    #[inline]
    #[must_use]
    pub const fn end(&self) -> PhysicalAddress {
        self.end
    }

    /// Whether `start <= end`.
    #[inline]
    #[must_use]
    pub const fn is_ordered(&self) -> bool {
        self.start.as_u64() <= self.end.as_u64()
    }

    /// The first managed page address, i.e. `start` rounded up.
    ///
    /// `None` if rounding overflows the address space.
    #[inline]
    #[must_use]
    pub const fn first_page(&self) -> Option<PhysicalAddress> {
        self.start.checked_align_up()
    }

    /// Number of managed pages.
    #[must_use]
    pub const fn page_count(&self) -> u64 {
        match self.first_page() {
            Some(first) if first.as_u64() < self.end.as_u64() => {
                (self.end.as_u64() - first.as_u64()) / PAGE_SIZE
            }
            _ => 0,
        }
    }

    /// Managed pages in increasing address order.
    pub fn pages(&self) -> impl Iterator<Item = PhysicalPage> + use<> {
        let first = self.first_page().unwrap_or_default();
        (0..self.page_count()).filter_map(move |i| PhysicalPage::new(first + i * PAGE_SIZE))
    }

    /// Validates `addr` as a managed page and returns its index.
    ///
    /// # Errors
    /// * [`PoolError::Misaligned`] if `addr` is not page aligned.
    /// * [`PoolError::OutOfRange`] if `addr` is not one of the managed pages.
    pub fn index_of(&self, addr: PhysicalAddress) -> Result<PageIndex, PoolError> {
        if !addr.is_page_aligned() {
            return Err(PoolError::Misaligned(addr));
        }

        let out_of_range = PoolError::OutOfRange { addr, range: *self };
        let Some(first) = self.first_page() else {
            return Err(out_of_range);
        };
        if addr < first {
            return Err(out_of_range);
        }

        let index = (addr - first) / PAGE_SIZE;
        if index >= self.page_count() {
            return Err(out_of_range);
        }
        u32::try_from(index)
            .map(PageIndex::new)
            .map_err(|_| out_of_range)
    }

    /// The managed page with the given index.
    ///
    /// Only meaningful for indices produced by [`index_of`](Self::index_of).
    #[inline]
    pub(crate) fn page_at(&self, index: PageIndex) -> PhysicalPage {
        let first = self.first_page().unwrap_or_default();
        PhysicalPage::containing(first + u64::from(index.get()) * PAGE_SIZE)
    }
}

impl fmt::Debug for PhysRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysRange({self})")
    }
}

impl fmt::Display for PhysRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unaligned_head_and_partial_tail_are_skipped() {
        let r = PhysRange::from_u64(0x1001, 0x5fff);
        assert_eq!(r.first_page(), Some(PhysicalAddress::new(0x2000)));
        assert_eq!(r.page_count(), 3);

        let pages: Vec<u64> = r.pages().map(PhysicalPage::as_u64).collect();
        assert_eq!(pages, [0x2000, 0x3000, 0x4000]);
    }

    #[test]
    fn degenerate_ranges_have_no_pages() {
        assert_eq!(PhysRange::from_u64(0x1000, 0x1000).page_count(), 0);
        assert_eq!(PhysRange::from_u64(0x1001, 0x2000).page_count(), 0);
        assert_eq!(PhysRange::from_u64(0x3000, 0x1000).page_count(), 0);
        assert_eq!(PhysRange::from_u64(u64::MAX - 10, u64::MAX).page_count(), 0);
    }

    #[test]
    fn index_of_validates() {
        let r = PhysRange::from_u64(0x1800, 0x4000);
        assert_eq!(r.index_of(PhysicalAddress::new(0x2000)).unwrap().get(), 0);
        assert_eq!(r.index_of(PhysicalAddress::new(0x3000)).unwrap().get(), 1);

        assert_eq!(
            r.index_of(PhysicalAddress::new(0x2010)),
            Err(PoolError::Misaligned(PhysicalAddress::new(0x2010)))
        );
        for addr in [0x1000, 0x4000, 0x9000] {
            let addr = PhysicalAddress::new(addr);
            assert_eq!(
                r.index_of(addr),
                Err(PoolError::OutOfRange { addr, range: r })
            );
        }
    }

    #[test]
    fn page_at_inverts_index_of() {
        let r = PhysRange::from_u64(KERNBASE, KERNBASE + 16 * PAGE_SIZE);
        for page in r.pages() {
            let index = r.index_of(page.base()).unwrap();
            assert_eq!(r.page_at(index), page);
        }
    }
}
