use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

/// Position of a page within the managed range (`0` is the first page).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PageIndex(u32);

impl PageIndex {
    /// Largest index a range may produce; `u32::MAX` marks the end of a list.
    pub const MAX: u32 = u32::MAX - 1;

    #[inline]
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    #[inline]
    const fn slot(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for PageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageIndex({})", self.0)
    }
}

/// "Next free page" link of one managed page.
///
/// The links of all pages form a side table owned by the caller of
/// [`PagePool::init`](crate::PagePool::init), one entry per managed page, so
/// the allocator never stores anything inside page memory. A link is only
/// meaningful while its page sits in a free list, and it is only read or
/// written by the holder of that list's lock; the atomics are there so the
/// table can be shared between pools, not for ordering.
#[repr(transparent)]
pub struct PageLink(AtomicU32);

impl PageLink {
    const NIL: u32 = u32::MAX;

    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU32::new(Self::NIL))
    }

    #[inline]
    fn next(&self) -> Option<PageIndex> {
        match self.0.load(Ordering::Relaxed) {
            Self::NIL => None,
            index => Some(PageIndex(index)),
        }
    }

    #[inline]
    fn set_next(&self, next: Option<PageIndex>) {
        self.0
            .store(next.map_or(Self::NIL, PageIndex::get), Ordering::Relaxed);
    }
}

impl Default for PageLink {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PageLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PageLink").field(&self.next()).finish()
    }
}

/// Head of a LIFO list threaded through a [`PageLink`] table.
///
/// All methods take the link table explicitly; a `FreeList` must always be
/// used with the same table, and callers serialize access (the pool keeps it
/// behind a spin lock).
#[derive(Debug, Default)]
pub(crate) struct FreeList {
    head: Option<PageIndex>,
}

impl FreeList {
    pub(crate) const fn new() -> Self {
        Self { head: None }
    }

    #[inline]
    pub(crate) const fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Links `page` in front of the current head.
    ///
    /// `page` must not already be on any list sharing `links`.
    #[inline]
    pub(crate) fn push(&mut self, links: &[PageLink], page: PageIndex) {
        links[page.slot()].set_next(self.head);
        self.head = Some(page);
    }

    /// Unlinks and returns the head.
    #[inline]
    pub(crate) fn pop(&mut self, links: &[PageLink]) -> Option<PageIndex> {
        let page = self.head?;
        let link = &links[page.slot()];
        self.head = link.next();
        link.set_next(None);
        Some(page)
    }

    /// Walks the list from head to tail.
    pub(crate) fn iter<'a>(
        &self,
        links: &'a [PageLink],
    ) -> impl Iterator<Item = PageIndex> + use<'a> {
        core::iter::successors(self.head, move |page| links[page.slot()].next())
    }
}
