// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2022 Andre Richter <andre.o.richter@gmail.com>

//! BCM driver top level.

pub mod gpio;
pub mod interrupt_controller;
pub mod pl011_uart;
pub mod system_timer;

pub use {
    gpio::*,
    interrupt_controller::InterruptController,
    pl011_uart::*,
    system_timer::{Channel, SystemTimer},
};
