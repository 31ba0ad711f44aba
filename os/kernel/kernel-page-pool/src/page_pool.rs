use crate::address::{PAGE_SIZE, PhysicalAddress, PhysicalPage};
use crate::config::PoolConfig;
use crate::cpu::{CpuId, CurrentCpu};
use crate::error::{InitError, PoolError};
use crate::free_list::PageLink;
use crate::layout::{NCPU, PhysRange};
use crate::phys_mapper::PhysMapper;
use crate::pool::Pool;
use log::{debug, error, info, log_enabled, trace};

/// Byte pattern written over a page when it enters a free list.
pub const FREE_POISON: u8 = 0x01;

/// Byte pattern written over a page when it is handed out.
pub const ALLOC_POISON: u8 = 0x05;

#[allow(clippy::cast_possible_truncation)]
const PAGE_BYTES: usize = PAGE_SIZE as usize;

/// Per-CPU physical page allocator.
///
/// Each CPU owns a LIFO free list behind its own spin lock. Allocation pops
/// from the calling CPU's list and, only if that is empty, steals a single
/// page from the first non-empty list of another CPU (ascending CPU index).
/// Freeing always pushes onto the calling CPU's list; pages are never moved
/// back to the CPU that originally owned them.
///
/// No call holds more than one pool lock at a time.
pub struct PagePool<'a, M, C> {
    range: PhysRange,
    cpu_count: usize,
    links: &'a [PageLink],
    pools: [Pool; NCPU],
    mapper: M,
    cpu: C,
}

impl<'a, M, C> PagePool<'a, M, C>
where
    M: PhysMapper,
    C: CurrentCpu,
{
    /// Builds the pools and distributes every managed page of `config.range`
    /// across them round-robin: page `k` goes to CPU `(k + 1) % cpu_count`, so
    /// the lowest page lands on CPU 1 (CPU 0 with a single CPU) and pool sizes
    /// differ by at most one. Each page is filled with
    /// [`FREE_POISON`] before it is linked.
    ///
    /// `links` provides one free-list slot per managed page; use
    /// [`PhysRange::page_count`] to size it.
    ///
    /// # Errors
    /// An [`InitError`] if the configuration is unusable. Seeding errors
    /// ([`InitError::Seed`]) indicate a broken layout.
    ///
    /// # Safety
    /// - Every managed page of `config.range` must be unused and not
    ///   referenced by anything else; ownership passes to the pool.
    /// - `mapper` must map every managed page to writable memory.
    pub unsafe fn init(
        config: PoolConfig,
        links: &'a [PageLink],
        mapper: M,
        cpu: C,
    ) -> Result<Self, InitError> {
        let pages = config.validate(links.len())?;

        let pool = Self {
            range: config.range,
            cpu_count: config.cpu_count,
            links,
            pools: core::array::from_fn(Pool::for_cpu),
            mapper,
            cpu,
        };

        for (k, page) in config.range.pages().enumerate() {
            let owner = CpuId::new((k + 1) % pool.cpu_count);
            // SAFETY: the caller hands us every managed page.
            unsafe { pool.release(owner, page.base())? };
        }

        info!(
            "Distributed {pages} pages of {} across {} CPU page pools",
            pool.range, pool.cpu_count
        );
        if log_enabled!(log::Level::Debug) {
            for cpu in pool.cpus() {
                debug!("CPU {cpu}: {} free pages", pool.free_pages(cpu));
            }
        }

        Ok(pool)
    }

    /// Allocates a page for the calling CPU.
    ///
    /// The page content is filled with [`ALLOC_POISON`].
    ///
    /// # Errors
    /// * [`PoolError::OutOfMemory`] if every pool is empty.
    /// * [`PoolError::UnknownCpu`] if the CPU identity has no pool.
    pub fn allocate(&self) -> Result<PhysicalPage, PoolError> {
        self.allocate_on(self.cpu.current_cpu())
    }

    /// Allocates a page on behalf of `cpu`.
    ///
    /// # Errors
    /// See [`allocate`](Self::allocate).
    pub fn allocate_on(&self, cpu: CpuId) -> Result<PhysicalPage, PoolError> {
        self.pool(cpu).inspect_err(|e| error!("allocate: {e}"))?;

        if let Some(page) = self.pop_from(cpu) {
            return Ok(page);
        }

        for victim in self.cpus().filter(|&other| other != cpu) {
            if let Some(page) = self.pop_from(victim) {
                trace!("CPU {cpu} stole page {page} from CPU {victim}");
                return Ok(page);
            }
        }

        trace!("CPU {cpu}: all page pools are empty");
        Err(PoolError::OutOfMemory)
    }

    /// Returns `page` to the calling CPU's pool.
    ///
    /// The page content is filled with [`FREE_POISON`].
    ///
    /// # Errors
    /// A fatal [`PoolError`] if `page` is misaligned, not managed by this
    /// pool, or the CPU identity has no pool. Nothing is modified in that case.
    ///
    /// # Safety
    /// `page` must have been returned by [`allocate`](Self::allocate) (or
    /// [`allocate_on`](Self::allocate_on)) of this pool and not been freed
    /// since. The caller gives up every reference into the page.
    pub unsafe fn free(&self, page: impl Into<PhysicalAddress>) -> Result<(), PoolError> {
        // SAFETY: forwarded to the caller.
        unsafe { self.free_on(self.cpu.current_cpu(), page) }
    }

    /// Returns `page` to the pool of `cpu`.
    ///
    /// # Errors
    /// See [`free`](Self::free).
    ///
    /// # Safety
    /// See [`free`](Self::free).
    pub unsafe fn free_on(
        &self,
        cpu: CpuId,
        page: impl Into<PhysicalAddress>,
    ) -> Result<(), PoolError> {
        // SAFETY: forwarded to the caller.
        unsafe { self.release(cpu, page.into()) }.inspect_err(|e| error!("free: {e}"))
    }

    /// Number of per-CPU pools.
    #[inline]
    #[must_use]
    pub const fn cpu_count(&self) -> usize {
        self.cpu_count
    }

    /// The range this pool was initialized with.
    #[inline]
    #[must_use]
    pub const fn range(&self) -> PhysRange {
        self.range
    }

    /// Number of pages managed across all CPUs, free or not.
    #[inline]
    #[must_use]
    pub const fn page_count(&self) -> u64 {
        self.range.page_count()
    }

    /// Counts the free pages of `cpu` by walking its list.
    ///
    /// # Errors
    /// [`PoolError::UnknownCpu`] if `cpu` has no pool.
    pub fn free_pages_on(&self, cpu: CpuId) -> Result<usize, PoolError> {
        self.pool(cpu)?;
        Ok(self.free_pages(cpu))
    }

    /// Whether `cpu` has no free page of its own left.
    ///
    /// # Errors
    /// [`PoolError::UnknownCpu`] if `cpu` has no pool.
    pub fn is_empty_on(&self, cpu: CpuId) -> Result<bool, PoolError> {
        Ok(self.pool(cpu)?.is_empty())
    }

    /// Calls `f` for every free page of `cpu`, most recently freed first.
    ///
    /// `f` runs with that pool's lock held and must not call back into the
    /// allocator.
    ///
    /// # Errors
    /// [`PoolError::UnknownCpu`] if `cpu` has no pool.
    pub fn for_each_free_page(
        &self,
        cpu: CpuId,
        mut f: impl FnMut(PhysicalPage),
    ) -> Result<(), PoolError> {
        self.pool(cpu)?
            .for_each(self.links, |index| f(self.range.page_at(index)));
        Ok(())
    }

    fn cpus(&self) -> impl Iterator<Item = CpuId> + use<M, C> {
        (0..self.cpu_count).map(CpuId::new)
    }

    fn pool(&self, cpu: CpuId) -> Result<&Pool, PoolError> {
        self.pools[..self.cpu_count]
            .get(cpu.get())
            .ok_or(PoolError::UnknownCpu {
                cpu,
                cpu_count: self.cpu_count,
            })
    }

    fn free_pages(&self, cpu: CpuId) -> usize {
        let mut count = 0;
        self.pools[cpu.get()].for_each(self.links, |_| count += 1);
        count
    }

    /// Pops the head of one pool and poisons it.
    ///
    /// The pool's lock is released before the page is touched.
    fn pop_from(&self, cpu: CpuId) -> Option<PhysicalPage> {
        let index = self.pools[cpu.get()].pop(self.links)?;
        let page = self.range.page_at(index);
        // SAFETY: we just took the page off a free list; nobody else sees it.
        unsafe { self.fill(page, ALLOC_POISON) };
        Some(page)
    }

    /// Validates `addr`, poisons the page and pushes it onto `cpu`'s list.
    ///
    /// Shared by boot-time seeding and [`free`](Self::free); does not (and
    /// cannot) detect pages that are already free.
    ///
    /// # Safety
    /// The caller owns the page at `addr`.
    unsafe fn release(&self, cpu: CpuId, addr: PhysicalAddress) -> Result<(), PoolError> {
        let index = self.range.index_of(addr)?;
        let pool = self.pool(cpu)?;
        // SAFETY: forwarded to the caller.
        unsafe { self.fill(self.range.page_at(index), FREE_POISON) };
        pool.push(self.links, index);
        Ok(())
    }

    /// # Safety
    /// The page must be exclusively owned by the current call.
    unsafe fn fill(&self, page: PhysicalPage, byte: u8) {
        let ptr = self.mapper.phys_to_ptr(page.base());
        // SAFETY: the mapper covers every managed page; ownership per caller.
        unsafe { ptr.write_bytes(byte, PAGE_BYTES) };
    }
}

impl<M, C> core::fmt::Debug for PagePool<'_, M, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PagePool")
            .field("range", &self.range)
            .field("cpu_count", &self.cpu_count)
            .field("pools", &&self.pools[..self.cpu_count])
            .finish_non_exhaustive()
    }
}
