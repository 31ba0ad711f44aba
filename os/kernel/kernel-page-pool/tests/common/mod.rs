//! Host-side stand-ins for physical memory and CPU identity.

#![allow(dead_code)]

use kernel_page_pool::{
    CpuId, CurrentCpu, IdentityMapper, PAGE_SIZE, PageLink, PagePool, PhysRange, PhysicalAddress,
    PhysicalPage, PoolConfig,
};
use std::cell::{Cell, UnsafeCell};

const PAGE: usize = PAGE_SIZE as usize;

/// One page of host memory, aligned like a physical page.
#[repr(C, align(4096))]
struct Frame(UnsafeCell<[u8; PAGE]>);

/// Page-aligned heap memory posing as physical RAM.
///
/// Host addresses double as physical addresses, so the pool under test runs
/// with an [`IdentityMapper`].
pub struct Arena {
    frames: Box<[Frame]>,
}

// SAFETY: frames are only touched by whoever owns the page (pool or test).
unsafe impl Sync for Arena {}

impl Arena {
    pub fn new(pages: usize) -> Self {
        let frames = (0..pages)
            .map(|_| Frame(UnsafeCell::new([0; PAGE])))
            .collect();
        Self { frames }
    }

    pub fn base(&self) -> PhysicalAddress {
        PhysicalAddress::from_ptr(self.frames.as_ptr())
    }

    /// Exactly the arena's pages.
    pub fn range(&self) -> PhysRange {
        let base = self.base();
        PhysRange::new(base, base + (self.frames.len() as u64) * PAGE_SIZE)
    }

    /// Address of the `i`-th frame, whether or not the pool manages it.
    pub fn page(&self, i: usize) -> PhysicalPage {
        PhysicalPage::new(self.base() + (i as u64) * PAGE_SIZE).unwrap()
    }

    fn frame(&self, page: PhysicalPage) -> &Frame {
        let i = (page.base() - self.base()) / PAGE_SIZE;
        &self.frames[usize::try_from(i).unwrap()]
    }

    /// Copies the page content out.
    pub fn read(&self, page: PhysicalPage) -> [u8; PAGE] {
        unsafe { *self.frame(page).0.get() }
    }

    /// Overwrites the page content, as a caller owning the page would.
    pub fn write(&self, page: PhysicalPage, byte: u8) {
        unsafe { (*self.frame(page).0.get()).fill(byte) }
    }

    pub fn is_filled_with(&self, page: PhysicalPage, byte: u8) -> bool {
        self.read(page).iter().all(|&b| b == byte)
    }
}

thread_local! {
    static CPU: Cell<usize> = const { Cell::new(0) };
}

/// Each test thread plays one CPU; see [`ThreadCpu::enter`].
#[derive(Debug, Copy, Clone, Default)]
pub struct ThreadCpu;

impl ThreadCpu {
    /// Makes the calling thread report `cpu` from now on.
    pub fn enter(cpu: usize) {
        CPU.with(|c| c.set(cpu));
    }
}

impl CurrentCpu for ThreadCpu {
    fn current_cpu(&self) -> CpuId {
        CpuId::new(CPU.with(Cell::get))
    }
}

pub type TestPool<'a> = PagePool<'a, IdentityMapper, ThreadCpu>;

pub fn link_table(range: PhysRange) -> Vec<PageLink> {
    (0..range.page_count()).map(|_| PageLink::new()).collect()
}

/// Seeds a pool over `range`, which must lie inside an [`Arena`] that
/// outlives the pool.
pub fn pool_over(range: PhysRange, links: &[PageLink], cpus: usize) -> TestPool<'_> {
    let config = PoolConfig::new(range, cpus);
    // SAFETY: test arenas are exclusively owned by the test using them.
    unsafe { PagePool::init(config, links, IdentityMapper, ThreadCpu) }
        .expect("valid test configuration")
}

/// Free pages of `cpu`, head first.
pub fn free_list(pool: &TestPool<'_>, cpu: usize) -> Vec<PhysicalPage> {
    let mut pages = Vec::new();
    pool.for_each_free_page(CpuId::new(cpu), |p| pages.push(p)).unwrap();
    pages
}

pub fn sizes(pool: &TestPool<'_>) -> Vec<usize> {
    (0..pool.cpu_count())
        .map(|cpu| pool.free_pages_on(CpuId::new(cpu)).unwrap())
        .collect()
}
