// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2020-2022 Andre Richter <andre.o.richter@gmail.com>

//! Processor code.

use crate::arch::cpu as arch_cpu;

//--------------------------------------------------------------------------------------------------
// Architectural Public Reexports
//--------------------------------------------------------------------------------------------------
pub use arch_cpu::{endless_sleep, nop, wait_for_event};

/// Loop for a given number of `nop` instructions.
#[inline]
pub fn loop_delay(rounds: u32) {
    for _ in 0..rounds {
        nop();
    }
}

/// Loop until a passed function returns `true`.
#[inline]
pub fn loop_until<F: Fn() -> bool>(f: F) {
    loop {
        if f() {
            break;
        }
        nop();
    }
}

/// Loop while a passed function returns `true`.
#[inline]
pub fn loop_while<F: Fn() -> bool>(f: F) {
    loop {
        if !f() {
            break;
        }
        nop();
    }
}
