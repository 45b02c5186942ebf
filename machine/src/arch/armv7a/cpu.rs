/*
 * SPDX-License-Identifier: MIT OR BlueOak-1.0.0
 * Copyright (c) 2020-2022 Andre Richter <andre.o.richter@gmail.com>
 * Original code distributed under MIT, additional changes are under BlueOak-1.0.0
 */

//! Architectural processor code.

/// Spin-wait.
#[inline(always)]
pub fn nop() {
    unsafe { core::arch::asm!("nop", options(nomem, nostack)) };
}

/// Put the core into a low-power wait-for-interrupt loop, forever.
///
/// Used by the panic handler and by the idle thread when no run queue level
/// is populated.
pub fn endless_sleep() -> ! {
    loop {
        unsafe { core::arch::asm!("wfi", options(nomem, nostack)) };
    }
}

/// Wait for an event (used by spin loops that were just woken by an `sev`-less
/// producer, i.e. plain polling).
#[inline(always)]
pub fn wait_for_event() {
    unsafe { core::arch::asm!("wfe", options(nomem, nostack)) };
}
