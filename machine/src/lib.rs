/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Cheviot Project Contributors
 */

//! Hardware abstraction layer for the ARMv7-A (Raspberry Pi 1/2 class) board:
//! console drivers, the exception vector table, the ARMv7-A short-descriptor
//! MMU primitives, and the interrupt controller / system timer treated as
//! opaque peripherals. Owns no process, address-space, or IPC state; that
//! belongs to the `kernel` crate this HAL is built for.

#![no_std]
#![allow(stable_features)]
#![feature(asm_const)]
#![feature(format_args_nl)]
#![feature(panic_info_message)]
#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::enum_variant_names)]
#![allow(missing_docs)]

#[cfg(not(target_arch = "arm"))]
compile_error!("machine only supports target_arch = \"arm\" (ARMv7-A / ARMv6)");

#[macro_use]
pub mod macros;

pub mod arch;
pub mod console;
pub mod cpu;
pub mod devices;
pub mod drivers;
pub mod mmio_deref_wrapper;
pub mod panic;
pub mod platform;
pub mod qemu;
pub mod state;
pub mod synchronization;
pub mod time;
pub mod write_to;

pub use arch::exception;
pub use cpu::endless_sleep;

/// Version string, e.g. for the boot banner.
pub fn version() -> &'static str {
    concat!(
        env!("CARGO_PKG_NAME"),
        " version ",
        env!("CARGO_PKG_VERSION")
    )
}

#[cfg(test)]
mod lib_tests {
    use super::*;

    #[panic_handler]
    fn panicked(info: &core::panic::PanicInfo) -> ! {
        panic::handler_for_tests(info)
    }
}
