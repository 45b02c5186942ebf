/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

#![no_std]
#![no_main]
#![feature(decl_macro)]
#![feature(allocator_api)]
#![feature(alloc_error_handler)]
#![feature(format_args_nl)]
#![feature(core_intrinsics)]
#![feature(strict_provenance)]
#![feature(stmt_expr_attributes)]
#![feature(slice_ptr_get)]
#![feature(nonnull_slice_from_raw_parts)]
#![feature(let_else)]
#![feature(custom_test_frameworks)]
#![test_runner(crate::tests::test_runner)]
#![reexport_test_harness_main = "test_main"]
#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::enum_variant_names)]
#![allow(clippy::nonstandard_macro_braces)] // https://github.com/shepmaster/snafu/issues/296
#![allow(missing_docs)] // Temp: switch to deny
#![deny(warnings)]

extern crate alloc;

pub use machine::{info, print, println, warn};

/// Page-table content (L1/L2 descriptor layout); the mechanism
/// (MMU enable, TLB maintenance) lives in `machine::arch`.
#[macro_use]
pub mod arch;
pub mod boot_info;
pub mod fault;
pub mod fs;
pub mod ipc;
pub mod irq;
pub mod kqueue;
pub mod mm;
mod panic;
pub mod proc;
pub mod signal;
mod sync;
pub mod syscall;
#[cfg(test)]
pub mod tests;
pub mod vm;

/// Bring up the subsystems that must exist before `kmain` can schedule
/// the first thread: the physical page allocator (seeded from the boot
/// memory map) and the kernel's own root address space.
pub fn init(boot_info: &boot_info::BootInfo) -> mm::PageAllocator {
    mm::PageAllocator::from_boot_info(boot_info)
}
