/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Architecture-specific pieces this crate owns itself rather than
//! delegating to `machine`: the page-table *content* (descriptor layout,
//! `AddressSpace`-facing operations). Enabling/disabling the MMU and TLB
//! maintenance stay in `machine::arch::armv7a::mmu`; this module only
//! decides what goes into the tables.

pub mod pmap;
