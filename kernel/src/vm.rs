/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Per-process address spaces: a page directory (`arch::pmap::Pmap`) plus
//! a sorted list of `MemRegion`s tiling `[VM_USER_BASE, VM_USER_CEILING)`
//! with no gaps and no overlap.

use crate::arch::pmap::{Pmap, PmapError, PmapProt};
use crate::mm::{PageAllocator, PhysAddr};
use alloc::vec::Vec;
use snafu::Snafu;

pub const VM_USER_BASE: u32 = 0x0000_1000;
pub const VM_USER_CEILING: u32 = 0xB000_0000;
pub const PAGE_SIZE: u32 = crate::arch::pmap::PAGE_SIZE;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RegionType {
    Free,
    Alloc,
    Phys,
}

bitflags::bitflags! {
    pub struct MapFlags: u32 {
        const READ  = 0b0001;
        const WRITE = 0b0010;
        const EXEC  = 0b0100;
        const FIXED = 0b1000;
    }
}

#[derive(Debug, Clone)]
pub struct MemRegion {
    pub base: u32,
    pub ceiling: u32,
    pub kind: RegionType,
    pub flags: MapFlags,
    pub phys_base: Option<PhysAddr>,
}

impl MemRegion {
    fn len(&self) -> u32 {
        self.ceiling - self.base
    }
}

#[derive(Debug, Snafu)]
pub enum VmError {
    NoSpace,
    InvalidAddress,
    Pmap,
}

impl From<PmapError> for VmError {
    fn from(_: PmapError) -> Self {
        VmError::Pmap
    }
}

pub struct AddressSpace {
    pub pmap: Pmap,
    regions: Vec<MemRegion>,
    /// Index into `regions` of the most recently touched region, to
    /// amortise consecutive operations on the same mapping.
    hint: usize,
}

impl AddressSpace {
    pub fn new(alloc: &mut PageAllocator) -> Result<Self, VmError> {
        let pmap = Pmap::new(alloc).map_err(VmError::from)?;
        Ok(Self {
            pmap,
            regions: alloc::vec![MemRegion {
                base: VM_USER_BASE,
                ceiling: VM_USER_CEILING,
                kind: RegionType::Free,
                flags: MapFlags::empty(),
                phys_base: None,
            }],
            hint: 0,
        })
    }

    fn find_free(&self, size: u32) -> Option<usize> {
        self.regions
            .iter()
            .position(|r| r.kind == RegionType::Free && r.len() >= size)
    }

    /// Find the first free region with sufficient space, split on either
    /// boundary, and retype the interior. Splitting is idempotent: a
    /// request exactly matching an existing free region's bounds
    /// retypes it in place with no new entries.
    pub fn memregion_create(
        &mut self,
        alloc: &mut PageAllocator,
        size: u32,
        flags: MapFlags,
        kind: RegionType,
        phys_base: Option<PhysAddr>,
    ) -> Result<u32, VmError> {
        let size = crate::mm::align_up(u64::from(size), u64::from(PAGE_SIZE)) as u32;
        let idx = self.find_free(size).ok_or(VmError::NoSpace)?;
        let region = self.regions[idx].clone();
        let base = region.base;
        let mut new_regions = Vec::new();
        if base < region.base + size && base > region.base {
            new_regions.push(MemRegion {
                base: region.base,
                ceiling: base,
                kind: RegionType::Free,
                flags: MapFlags::empty(),
                phys_base: None,
            });
        }
        new_regions.push(MemRegion {
            base,
            ceiling: base + size,
            kind,
            flags,
            phys_base,
        });
        if base + size < region.ceiling {
            new_regions.push(MemRegion {
                base: base + size,
                ceiling: region.ceiling,
                kind: RegionType::Free,
                flags: MapFlags::empty(),
                phys_base: None,
            });
        }
        self.regions.splice(idx..=idx, new_regions);
        self.hint = idx;

        if kind != RegionType::Phys {
            let mut va = base;
            while va < base + size {
                let pa = alloc
                    .alloc(crate::mm::SizeClass::Size4K, crate::mm::FrameFlags::USER)
                    .ok_or(VmError::NoSpace)?;
                let prot = map_flags_to_prot(flags);
                self.pmap.pmap_enter(alloc, va, pa, prot, false)?;
                va += PAGE_SIZE;
            }
        } else if let Some(phys) = phys_base {
            let mut va = base;
            let mut pa = phys;
            while va < base + size {
                self.pmap.pmap_enter(alloc, va, pa, map_flags_to_prot(flags), false)?;
                va += PAGE_SIZE;
                pa = pa + u64::from(PAGE_SIZE);
            }
        }
        Ok(base)
    }

    /// Inverse of `memregion_create`: retype to free, unmap every page,
    /// and coalesce with free neighbours.
    pub fn memregion_free(&mut self, alloc: &mut PageAllocator, base: u32) -> Result<(), VmError> {
        let idx = self
            .regions
            .iter()
            .position(|r| r.base == base)
            .ok_or(VmError::InvalidAddress)?;
        let region = self.regions[idx].clone();
        if region.kind != RegionType::Phys {
            let mut va = region.base;
            while va < region.ceiling {
                let _ = self.pmap.pmap_remove(alloc, va);
                va += PAGE_SIZE;
            }
        }
        self.regions[idx] = MemRegion {
            base: region.base,
            ceiling: region.ceiling,
            kind: RegionType::Free,
            flags: MapFlags::empty(),
            phys_base: None,
        };
        self.coalesce_around(idx);
        Ok(())
    }

    fn coalesce_around(&mut self, idx: usize) {
        if idx + 1 < self.regions.len() && self.regions[idx + 1].kind == RegionType::Free {
            self.regions[idx].ceiling = self.regions[idx + 1].ceiling;
            self.regions.remove(idx + 1);
        }
        if idx > 0 && self.regions[idx - 1].kind == RegionType::Free {
            self.regions[idx - 1].ceiling = self.regions[idx].ceiling;
            self.regions.remove(idx);
        }
    }

    /// Duplicate every region and the underlying mappings into `child`
    /// for `fork`, driving `Pmap::fork_duplicate` for the page-table side.
    pub fn fork_into(&mut self, child: &mut AddressSpace, alloc: &mut PageAllocator) -> Result<(), VmError> {
        child.regions = self.regions.clone();
        self.pmap.fork_duplicate(&mut child.pmap, alloc)?;
        Ok(())
    }
}

fn map_flags_to_prot(flags: MapFlags) -> PmapProt {
    let mut prot = PmapProt::empty();
    if flags.contains(MapFlags::READ) {
        prot |= PmapProt::READ;
    }
    if flags.contains(MapFlags::WRITE) {
        prot |= PmapProt::WRITE;
    }
    if flags.contains(MapFlags::EXEC) {
        prot |= PmapProt::EXEC;
    }
    prot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mm::PageAllocator;

    fn new_alloc() -> PageAllocator {
        PageAllocator::new(PhysAddr::new(0x2000_0000), 4 * 1024 * 1024)
    }

    #[test_case]
    fn create_then_free_returns_region_to_single_free_span() {
        let mut alloc = new_alloc();
        let mut asp = AddressSpace::new(&mut alloc).unwrap();
        let base = asp
            .memregion_create(&mut alloc, 8192, MapFlags::READ | MapFlags::WRITE, RegionType::Alloc, None)
            .unwrap();
        asp.memregion_free(&mut alloc, base).unwrap();
        assert_eq!(asp.regions.len(), 1);
        assert_eq!(asp.regions[0].kind, RegionType::Free);
    }
}
