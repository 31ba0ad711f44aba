//! # Per-CPU Physical Page Pool
//!
//! Hands out and takes back 4 KiB physical pages for process memory, kernel
//! stacks, page tables and pipe buffers. It sits below every other allocator
//! in the kernel and therefore uses no heap itself.
//!
//! ## Layout
//!
//! ```text
//!   CPU 0            CPU 1                 CPU n-1
//! ┌────────────┐   ┌────────────┐        ┌────────────┐
//! │ SpinLock   │   │ SpinLock   │  ...   │ SpinLock   │
//! │  head ─┐   │   │  head ─┐   │        │  head ─┐   │
//! └────────┼───┘   └────────┼───┘        └────────┼───┘
//!          ▼                ▼                     ▼
//!     ┌─────────────── PageLink table ───────────────┐
//!     │ one `next` slot per managed page (by index)  │
//!     └──────────────────────────────────────────────┘
//! ```
//!
//! * **Boot** ([`PagePool::init`]): the managed pages of the physical range
//!   are dealt round-robin to the CPUs, so pool sizes differ by at most one.
//! * **Allocate** ([`PagePool::allocate`]): pop from the calling CPU's pool.
//!   If it is empty, try the other CPUs in ascending order and steal one page
//!   from the first that has any. Exhaustion is reported as
//!   [`PoolError::OutOfMemory`].
//! * **Free** ([`PagePool::free`]): push onto the *calling* CPU's pool, no
//!   matter which pool the page came from. Misaligned or foreign addresses
//!   are rejected with a fatal [`PoolError`] before anything is modified.
//!
//! Every transition poisons the page: [`FREE_POISON`] when it becomes free,
//! [`ALLOC_POISON`] when it is handed out.
//!
//! ## Locking
//!
//! Each pool is guarded by its own [`kernel_sync::SpinLock`]. A lock is held
//! for a single push or pop and never across pools, so no call holds two
//! locks and there is no lock order to get wrong. Page poisoning happens
//! outside of the lock.
//!
//! ## Platform hooks
//!
//! * [`PhysMapper`]: how to reach a physical page from code.
//! * [`CurrentCpu`]: which CPU is running.
//!
//! ## Example
//!
//! ```rust,no_run
//! use kernel_page_pool::{
//!     FixedCpu, IdentityMapper, PageLink, PagePool, PhysicalAddress, PoolConfig, layout::MAX_PAGES,
//! };
//!
//! static LINKS: [PageLink; MAX_PAGES] = [const { PageLink::new() }; MAX_PAGES];
//!
//! # fn kernel_end() -> PhysicalAddress { PhysicalAddress::new(0x8002_1000) }
//! let config = PoolConfig::platform_default(kernel_end());
//! let pool = unsafe { PagePool::init(config, &LINKS, IdentityMapper, FixedCpu::default()) }?;
//!
//! let page = pool.allocate()?;
//! unsafe { pool.free(page) }?;
//! # Ok::<(), Box<dyn core::error::Error>>(())
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

pub mod address;
pub mod config;
pub mod cpu;
pub mod error;
mod free_list;
pub mod layout;
mod page_pool;
pub mod phys_mapper;
mod pool;

pub use address::{PAGE_SIZE, PhysicalAddress, PhysicalPage};
pub use config::PoolConfig;
#[cfg(target_arch = "riscv64")]
pub use cpu::ThreadPointerHart;
pub use cpu::{CpuId, CurrentCpu, FixedCpu};
pub use error::{InitError, PoolError};
pub use free_list::{PageIndex, PageLink};
pub use layout::PhysRange;
pub use page_pool::{ALLOC_POISON, FREE_POISON, PagePool};
pub use phys_mapper::{IdentityMapper, OffsetMapper, PhysMapper};
