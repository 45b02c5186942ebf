/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! The ARMv7-A short-descriptor two-level page table: `pmap_enter` /
//! `pmap_remove` / `pmap_extract`, fork duplication, and copy-on-write
//! fault resolution. `machine::arch::armv7a::mmu` flips the hardware
//! switches (MMU enable, TLB invalidate); this module decides what goes
//! into the tables.
//!
//! One `L1Table` is 4096 32-bit descriptors, 16 KiB — the same size as
//! `mm::SizeClass::Size16K`, so the page allocator hands one out directly
//! with no extra carve-out. One `L2Table` wraps a 4 KiB pageframe
//! (`mm::SizeClass::Size4K`): the low 1 KiB holds the 256 hardware PTE
//! words a coarse page table needs, the next 1 KiB holds a parallel
//! software metadata array (protection bits, COW), and the remainder of
//! the frame is unused padding.

use crate::mm::{FrameFlags, PageAllocator, PhysAddr, SizeClass};
use snafu::Snafu;
use tock_registers::{
    interfaces::{Readable, Writeable},
    register_bitfields,
    registers::InMemoryRegister,
};

register_bitfields! [
    u32,
    // ARM Architecture Reference Manual ARMv7-A, B3-1323: first-level
    // descriptor, coarse page table format.
    L1_COARSE_DESCRIPTOR [
        COARSE_BASE_ADDR OFFSET(10) NUMBITS(22) [],
        DOMAIN           OFFSET(5)  NUMBITS(4) [],
        TYPE             OFFSET(0)  NUMBITS(2) [
            Fault  = 0b00,
            Coarse = 0b01,
        ]
    ]
]

register_bitfields! [
    u32,
    // ARMv7-A B3-1325: second-level descriptor, small page format.
    L2_SMALL_PAGE_DESCRIPTOR [
        BASE_ADDR OFFSET(12) NUMBITS(20) [],
        nG        OFFSET(11) NUMBITS(1) [],
        S         OFFSET(10) NUMBITS(1) [],
        AP2       OFFSET(9)  NUMBITS(1) [],
        TEX       OFFSET(6)  NUMBITS(3) [],
        AP        OFFSET(4)  NUMBITS(2) [
            NoAccess    = 0b00,
            ReadWrite   = 0b01,
            UserReadOnly = 0b10,
            ReadOnly    = 0b11,
        ],
        C         OFFSET(3)  NUMBITS(1) [],
        B         OFFSET(2)  NUMBITS(1) [],
        TYPE      OFFSET(1)  NUMBITS(1) [
            Fault      = 0,
            SmallPage  = 1,
        ],
        XN        OFFSET(0)  NUMBITS(1) []
    ]
]

pub const PAGE_SIZE: u32 = 4096;
const L2_ENTRIES: usize = 256;
const L1_ENTRIES: usize = 4096;
/// VA covered by a single coarse L2 table.
const SECTION_SIZE: u32 = L2_ENTRIES as u32 * PAGE_SIZE;

bitflags::bitflags! {
    pub struct PmapProt: u32 {
        const READ  = 0b001;
        const WRITE = 0b010;
        const EXEC  = 0b100;
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct PteMeta {
    prot: PmapProt,
    cow: bool,
    present: bool,
}

impl PteMeta {
    const fn absent() -> Self {
        Self {
            prot: PmapProt::empty(),
            cow: false,
            present: false,
        }
    }
}

/// One 4 KiB pageframe, reinterpreted as 256 hardware PTEs followed by
/// 256 software metadata slots.
#[repr(C)]
struct L2Table {
    ptes: [InMemoryRegister<u32, L2_SMALL_PAGE_DESCRIPTOR::Register>; L2_ENTRIES],
    meta: [PteMeta; L2_ENTRIES],
}

static_assertions::const_assert!(core::mem::size_of::<L2Table>() <= SizeClass::Size4K.bytes() as usize);

/// One 16 KiB pageframe of 4096 first-level descriptors.
#[repr(C, align(16384))]
struct L1Table {
    entries: [InMemoryRegister<u32, L1_COARSE_DESCRIPTOR::Register>; L1_ENTRIES],
}

static_assertions::const_assert_eq!(core::mem::size_of::<L1Table>(), SizeClass::Size16K.bytes() as usize);

#[derive(Debug, Snafu)]
pub enum PmapError {
    OutOfMemory,
    Unaligned,
    NotMapped,
    AlreadyMapped,
}

/// One process address space's root translation table.
pub struct Pmap {
    l1_phys: PhysAddr,
}

fn l1_index(va: u32) -> usize {
    (va / SECTION_SIZE) as usize
}

fn l2_index(va: u32) -> usize {
    ((va % SECTION_SIZE) / PAGE_SIZE) as usize
}

// SAFETY for every raw dereference below: physical RAM is addressed
// directly by `kernel`, the same convention `mm::PageAllocator::zero_fill`
// relies on.
impl Pmap {
    pub fn new(alloc: &mut PageAllocator) -> Result<Self, PmapError> {
        let l1_phys = alloc
            .alloc(SizeClass::Size16K, FrameFlags::KERNEL | FrameFlags::PAGE_TABLE)
            .ok_or(PmapError::OutOfMemory)?;
        Ok(Self { l1_phys })
    }

    pub fn ttbr0(&self) -> u32 {
        self.l1_phys.0 as u32
    }

    fn l1_table(&self) -> &L1Table {
        unsafe { &*(self.l1_phys.0 as *const L1Table) }
    }

    fn l1_table_mut(&mut self) -> &mut L1Table {
        unsafe { &mut *(self.l1_phys.0 as *mut L1Table) }
    }

    fn l2_table(phys: PhysAddr) -> &'static mut L2Table {
        unsafe { &mut *(phys.0 as *mut L2Table) }
    }

    fn l2_phys(entry: &InMemoryRegister<u32, L1_COARSE_DESCRIPTOR::Register>) -> Option<PhysAddr> {
        if entry.read(L1_COARSE_DESCRIPTOR::TYPE) != L1_COARSE_DESCRIPTOR::TYPE::Coarse.value {
            return None;
        }
        Some(PhysAddr::new(
            (entry.read(L1_COARSE_DESCRIPTOR::COARSE_BASE_ADDR) << 10) as u64,
        ))
    }

    /// Return the coarse L2 table backing `va`'s section, allocating it
    /// (and installing it in the L1 table) on first use.
    fn ensure_l2(&mut self, alloc: &mut PageAllocator, va: u32) -> Result<&'static mut L2Table, PmapError> {
        let l1i = l1_index(va);
        if let Some(phys) = Self::l2_phys(&self.l1_table().entries[l1i]) {
            return Ok(Self::l2_table(phys));
        }
        let l2_phys = alloc
            .alloc(SizeClass::Size4K, FrameFlags::KERNEL | FrameFlags::PAGE_TABLE)
            .ok_or(PmapError::OutOfMemory)?;
        let table = Self::l2_table(l2_phys);
        for pte in table.ptes.iter() {
            pte.set(0);
        }
        for m in table.meta.iter_mut() {
            *m = PteMeta::absent();
        }
        self.l1_table_mut().entries[l1i].write(
            L1_COARSE_DESCRIPTOR::COARSE_BASE_ADDR.val((l2_phys.0 as u32) >> 10)
                + L1_COARSE_DESCRIPTOR::DOMAIN.val(0)
                + L1_COARSE_DESCRIPTOR::TYPE::Coarse,
        );
        Ok(table)
    }

    fn ap_for(prot: PmapProt) -> u32 {
        if prot.contains(PmapProt::WRITE) {
            L2_SMALL_PAGE_DESCRIPTOR::AP::ReadWrite.value
        } else {
            L2_SMALL_PAGE_DESCRIPTOR::AP::UserReadOnly.value
        }
    }

    /// Install a mapping for one page. `cow` marks the page read-only at
    /// the hardware level regardless of `prot`, deferring the real
    /// permission check to `resolve_cow_fault`.
    pub fn pmap_enter(
        &mut self,
        alloc: &mut PageAllocator,
        va: u32,
        pa: PhysAddr,
        prot: PmapProt,
        cow: bool,
    ) -> Result<(), PmapError> {
        if va % PAGE_SIZE != 0 || pa.0 % u64::from(PAGE_SIZE) != 0 {
            return Err(PmapError::Unaligned);
        }
        let l2i = l2_index(va);
        let table = self.ensure_l2(alloc, va)?;
        let hw_ap = if cow {
            L2_SMALL_PAGE_DESCRIPTOR::AP::UserReadOnly.value
        } else {
            Self::ap_for(prot)
        };
        table.ptes[l2i].write(
            L2_SMALL_PAGE_DESCRIPTOR::BASE_ADDR.val((pa.0 as u32) >> 12)
                + L2_SMALL_PAGE_DESCRIPTOR::AP.val(hw_ap)
                + L2_SMALL_PAGE_DESCRIPTOR::C.val(1)
                + L2_SMALL_PAGE_DESCRIPTOR::B.val(1)
                + L2_SMALL_PAGE_DESCRIPTOR::S.val(1)
                + L2_SMALL_PAGE_DESCRIPTOR::XN.val(if prot.contains(PmapProt::EXEC) { 0 } else { 1 })
                + L2_SMALL_PAGE_DESCRIPTOR::TYPE::SmallPage,
        );
        table.meta[l2i] = PteMeta { prot, cow, present: true };
        machine::arch::mmu::invalidate_page(va);
        Ok(())
    }

    pub fn pmap_remove(&mut self, alloc: &mut PageAllocator, va: u32) -> Result<(), PmapError> {
        let l1i = l1_index(va);
        let l2i = l2_index(va);
        let Some(l2_phys) = Self::l2_phys(&self.l1_table().entries[l1i]) else {
            return Err(PmapError::NotMapped);
        };
        let table = Self::l2_table(l2_phys);
        if !table.meta[l2i].present {
            return Err(PmapError::NotMapped);
        }
        let pa = PhysAddr::new(
            (table.ptes[l2i].read(L2_SMALL_PAGE_DESCRIPTOR::BASE_ADDR) as u64) << 12,
        );
        table.ptes[l2i].set(0);
        table.meta[l2i] = PteMeta::absent();
        machine::arch::mmu::invalidate_page(va);
        if let Some(frame) = alloc.frame_mut(pa) {
            frame.backrefs.retain(|b| b.va != va);
        }
        Ok(())
    }

    pub fn pmap_extract(&self, va: u32) -> Option<(PhysAddr, PmapProt)> {
        let l1i = l1_index(va);
        let l2_phys = Self::l2_phys(&self.l1_table().entries[l1i])?;
        let table = Self::l2_table(l2_phys);
        let l2i = l2_index(va);
        if !table.meta[l2i].present {
            return None;
        }
        let pa = PhysAddr::new((table.ptes[l2i].read(L2_SMALL_PAGE_DESCRIPTOR::BASE_ADDR) as u64) << 12);
        Some((pa, table.meta[l2i].prot))
    }

    /// Duplicate every mapping into `child`, per fork semantics: a
    /// phys-mapped (non-COW-eligible) page is duplicated unchanged, a
    /// writable page becomes copy-on-write in both parent and child with
    /// the backing frame's reference count incremented, and a read-only
    /// page is simply shared with its reference count incremented.
    pub fn fork_duplicate(&mut self, child: &mut Pmap, alloc: &mut PageAllocator) -> Result<(), PmapError> {
        for l1i in 0..L1_ENTRIES {
            let Some(l2_phys) = Self::l2_phys(&self.l1_table().entries[l1i]) else {
                continue;
            };
            let parent_table = Self::l2_table(l2_phys);
            for l2i in 0..L2_ENTRIES {
                if !parent_table.meta[l2i].present {
                    continue;
                }
                let va = (l1i as u32) * SECTION_SIZE + (l2i as u32) * PAGE_SIZE;
                let pa = PhysAddr::new(
                    (parent_table.ptes[l2i].read(L2_SMALL_PAGE_DESCRIPTOR::BASE_ADDR) as u64) << 12,
                );
                let prot = parent_table.meta[l2i].prot;
                let make_cow = prot.contains(PmapProt::WRITE);
                if make_cow {
                    // Re-enter the parent's own mapping read-only before
                    // sharing it, so writes after fork trap into
                    // `resolve_cow_fault` on either side.
                    self.pmap_enter(alloc, va, pa, prot, true)?;
                }
                child.pmap_enter(alloc, va, pa, prot, make_cow)?;
                if let Some(frame) = alloc.frame_mut(pa) {
                    frame.reference_count += 1;
                }
            }
        }
        Ok(())
    }

    /// Resolve a write fault on a COW page: if the backing frame is still
    /// shared, copy it and point this mapping at the copy; if this is the
    /// last owner, just drop the COW bit and reinstate write access.
    pub fn resolve_cow_fault(&mut self, alloc: &mut PageAllocator, va: u32) -> Result<(), PmapError> {
        let (old_pa, prot) = self.pmap_extract(va).ok_or(PmapError::NotMapped)?;
        let refcount = alloc.frame_mut(old_pa).map(|f| f.reference_count).unwrap_or(1);
        if refcount > 1 {
            let new_pa = alloc
                .alloc(SizeClass::Size4K, FrameFlags::USER)
                .ok_or(PmapError::OutOfMemory)?;
            unsafe {
                core::ptr::copy_nonoverlapping(
                    old_pa.0 as *const u8,
                    new_pa.0 as *mut u8,
                    PAGE_SIZE as usize,
                );
            }
            if let Some(frame) = alloc.frame_mut(old_pa) {
                frame.reference_count -= 1;
            }
            self.pmap_enter(alloc, va, new_pa, prot, false)
        } else {
            self.pmap_enter(alloc, va, old_pa, prot, false)
        }
    }

    /// Copy bytes between this address space and the kernel's own buffer
    /// via direct physical dereference, for IPC message payloads that
    /// cross an address-space boundary without a shared mapping.
    pub fn ipcopy_out(&self, va: u32, dst: &mut [u8]) -> Result<(), PmapError> {
        let (pa, _) = self.pmap_extract(va & !(PAGE_SIZE - 1)).ok_or(PmapError::NotMapped)?;
        let offset = (va & (PAGE_SIZE - 1)) as usize;
        let len = dst.len().min(PAGE_SIZE as usize - offset);
        unsafe {
            core::ptr::copy_nonoverlapping((pa.0 as *const u8).add(offset), dst.as_mut_ptr(), len);
        }
        Ok(())
    }
}
