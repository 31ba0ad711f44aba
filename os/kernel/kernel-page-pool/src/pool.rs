use crate::free_list::{FreeList, PageIndex, PageLink};
use crate::layout::NCPU;
use kernel_sync::SpinLock;

/// Lock names, one per CPU slot.
const LOCK_NAMES: [&str; NCPU] = [
    "page_pool_0",
    "page_pool_1",
    "page_pool_2",
    "page_pool_3",
    "page_pool_4",
    "page_pool_5",
    "page_pool_6",
    "page_pool_7",
];

/// One CPU's free pages.
///
/// Every method takes the lock for exactly one list operation and releases it
/// before returning, so a caller never holds two pools at once.
#[derive(Debug)]
pub(crate) struct Pool {
    free: SpinLock<FreeList>,
}

impl Pool {
    /// An empty pool whose lock is named after CPU slot `cpu`.
    pub(crate) const fn for_cpu(cpu: usize) -> Self {
        Self {
            free: SpinLock::named(LOCK_NAMES[cpu], FreeList::new()),
        }
    }

    #[cfg(test)]
    pub(crate) const fn name(&self) -> &'static str {
        self.free.name()
    }

    #[inline]
    pub(crate) fn push(&self, links: &[PageLink], page: PageIndex) {
        self.free.lock().push(links, page);
    }

    #[inline]
    pub(crate) fn pop(&self, links: &[PageLink]) -> Option<PageIndex> {
        self.free.lock().pop(links)
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.free.lock().is_empty()
    }

    /// Visits the free pages head to tail with the lock held.
    pub(crate) fn for_each(&self, links: &[PageLink], f: impl FnMut(PageIndex)) {
        let free = self.free.lock();
        free.iter(links).for_each(f);
    }
}
