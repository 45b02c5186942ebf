/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Cheviot Project Contributors
 */

//! Low-level MMU enable/disable and TLB maintenance.
//!
//! The short-descriptor page table *content* (L1/L2 descriptor layout,
//! AddressSpace/MemRegion bookkeeping) belongs to `kernel::arch::pmap`;
//! this module only flips the switches every pmap implementation needs
//! regardless of table layout: enabling the MMU once the root table is
//! installed, and keeping the TLB coherent with PTE edits.

use super::regs::{self, DACR, SCTLR};

/// Install `ttbr0` as the translation table root and turn the MMU and
/// caches on. Called exactly once per core during boot, after the
/// bootstrap identity-mapped L1 table has been built by `kernel`.
///
/// # Safety
/// `ttbr0` must point at a valid L1 table that identity-maps the
/// instructions executing immediately after the `SCTLR.M` write, or the
/// core will fetch from an unmapped address the instant the MMU engages.
pub unsafe fn enable_mmu_and_caching(ttbr0_phys: u32) {
    regs::Dacr::write(DACR::D0::Client);
    regs::Ttbr0::set(ttbr0_phys);
    regs::tlbiall();

    regs::Sctlr::modify(SCTLR::M::Enable + SCTLR::C::Enable + SCTLR::I::Enable + SCTLR::A::Disable);
}

/// Returns whether the MMU is currently enabled, used by assertions in
/// `kernel::arch::pmap` that a caller-supplied address is being interpreted
/// as virtual rather than physical.
pub fn is_enabled() -> bool {
    regs::Sctlr::get().is_set(SCTLR::M)
}

/// Switch the active translation table root, e.g. on a process context
/// switch (`pmap_switch`). Invalidates by-ASID rather than the
/// whole TLB when `asid` is available.
///
/// # Safety
/// `ttbr0_phys` must address a fully populated L1 table for the address
/// space being switched to.
pub unsafe fn switch_address_space(ttbr0_phys: u32, asid: u8, procid: u32) {
    regs::Ttbr0::set(ttbr0_phys);
    regs::ContextIdr::set(asid, procid);
    regs::isb();
}

/// Invalidate a single page's worth of TLB entries after editing its PTE,
/// e.g. after write-protecting a page for copy-on-write or installing a
/// demand-paged mapping.
pub fn invalidate_page(va: u32) {
    regs::tlbimvaa(va);
}

/// The virtual address that took the most recent data abort (DFAR).
pub fn fault_address() -> u32 {
    regs::Dfar::get()
}
