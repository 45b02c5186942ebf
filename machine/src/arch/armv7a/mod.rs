/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Cheviot Project Contributors
 */

//! ARMv7-A (and ARM1176/ARMv6, same short-descriptor MMU format) support.

pub mod boot;
pub mod cpu;
pub mod exception;
pub mod mmu;
pub mod regs;

pub use cpu::{endless_sleep, nop};
