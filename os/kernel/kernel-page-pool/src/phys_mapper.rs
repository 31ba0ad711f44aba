//! # Reaching physical pages from code
//!
//! The pool writes poison patterns into pages as they change hands, so it has
//! to turn a [`PhysicalAddress`] into a pointer it can write through. How that
//! works depends on the paging setup:
//! - an identity-mapped kernel (common on RISC-V) dereferences the physical
//!   address directly, see [`IdentityMapper`];
//! - a higher-half kernel reaches RAM through a direct map at a fixed offset,
//!   see [`OffsetMapper`].

use crate::address::PhysicalAddress;

/// Converts physical addresses of managed pages into usable pointers.
///
/// # Safety
/// Implementors guarantee that for every page the pool manages, the returned
/// pointer is valid for writes of a whole page and that the mapping stays in
/// place for as long as the pool exists.
pub unsafe trait PhysMapper {
    /// Pointer to the first byte of the page at `pa` in the current address space.
    fn phys_to_ptr(&self, pa: PhysicalAddress) -> *mut u8;
}

unsafe impl<M: PhysMapper + ?Sized> PhysMapper for &M {
    #[inline]
    fn phys_to_ptr(&self, pa: PhysicalAddress) -> *mut u8 {
        (**self).phys_to_ptr(pa)
    }
}

/// [`PhysMapper`] for address spaces where physical equals virtual.
#[derive(Debug, Copy, Clone, Default)]
pub struct IdentityMapper;

// SAFETY: the caller of `PagePool::init` vouches that the range is mapped.
unsafe impl PhysMapper for IdentityMapper {
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn phys_to_ptr(&self, pa: PhysicalAddress) -> *mut u8 {
        pa.as_u64() as usize as *mut u8
    }
}

/// [`PhysMapper`] for kernels with a direct map of RAM at `base`.
#[derive(Debug, Copy, Clone)]
pub struct OffsetMapper {
    base: u64,
}

impl OffsetMapper {
    #[inline]
    #[must_use]
    pub const fn new(base: u64) -> Self {
        Self { base }
    }
}

// SAFETY: the caller of `PagePool::init` vouches that the direct map covers the range.
unsafe impl PhysMapper for OffsetMapper {
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn phys_to_ptr(&self, pa: PhysicalAddress) -> *mut u8 {
        self.base.wrapping_add(pa.as_u64()) as usize as *mut u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_mapper_keeps_the_address() {
        let pa = PhysicalAddress::new(0x8020_3000);
        assert_eq!(IdentityMapper.phys_to_ptr(pa) as usize, 0x8020_3000);
    }

    #[test]
    fn offset_mapper_adds_the_direct_map_base() {
        let hhdm = OffsetMapper::new(0xFFFF_8000_0000_0000);
        let pa = PhysicalAddress::new(0x0010_2000);
        assert_eq!(hhdm.phys_to_ptr(pa) as usize, 0xFFFF_8000_0010_2000);
    }
}
