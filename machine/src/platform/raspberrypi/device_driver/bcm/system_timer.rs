/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Cheviot Project Contributors
 */

//! The classic BCM "system timer": a free-running 64-bit microsecond
//! counter (`CLO`/`CHI`) plus four compare registers (`C0`-`C3`) that each
//! raise an IRQ when the low counter matches. `kernel`'s timing wheel
//! programs one of the compare channels for periodic ticks; this type is
//! only the opaque register interface, channel programming and the wheel
//! itself live in `kernel::proc::timer`.
//!
//! Channels 0 and 2 are reserved by the GPU on real hardware; software
//! uses channels 1 and 3, matching the IRQ-line convention of
//! leaving GPU-owned resources alone.

use crate::mmio_deref_wrapper::MMIODerefWrapper;
use tock_registers::{
    interfaces::{Readable, Writeable},
    register_structs,
    registers::ReadWrite,
};

register_structs! {
    #[allow(non_snake_case)]
    RegisterBlock {
        (0x00 => ControlStatus: ReadWrite<u32>),
        (0x04 => CounterLow: ReadWrite<u32>),
        (0x08 => CounterHigh: ReadWrite<u32>),
        (0x0c => Compare: [ReadWrite<u32>; 4]),
        (0x1c => @END),
    }
}

type Registers = MMIODerefWrapper<RegisterBlock>;

/// Software-usable compare channels; 0 and 2 are reserved by the GPU.
#[derive(Copy, Clone)]
pub enum Channel {
    C1 = 1,
    C3 = 3,
}

pub struct SystemTimer {
    registers: Registers,
}

impl SystemTimer {
    pub const COMPATIBLE: &'static str = "BCM System Timer";

    /// # Safety
    ///
    /// `mmio_base_addr` must address a live system timer block.
    pub const unsafe fn new(mmio_base_addr: usize) -> Self {
        Self {
            registers: Registers::new(mmio_base_addr),
        }
    }

    /// Read the free-running 64-bit microsecond counter. Loops re-reading
    /// the high word if it changed mid-read, guarding the classic low/high
    /// split-read race.
    pub fn free_running_counter_micros(&self) -> u64 {
        loop {
            let hi = self.registers.CounterHigh.get();
            let lo = self.registers.CounterLow.get();
            let hi2 = self.registers.CounterHigh.get();
            if hi == hi2 {
                return ((hi as u64) << 32) | lo as u64;
            }
        }
    }

    /// Arm `channel` to fire `micros_from_now` microseconds in the future.
    pub fn schedule(&self, channel: Channel, micros_from_now: u32) {
        let target = self.registers.CounterLow.get().wrapping_add(micros_from_now);
        self.registers.Compare[channel as usize].set(target);
    }

    /// Returns whether `channel` has a pending match, and acknowledges it.
    pub fn acknowledge(&self, channel: Channel) -> bool {
        let mask = 1 << (channel as u32);
        let pending = self.registers.ControlStatus.get() & mask != 0;
        if pending {
            self.registers.ControlStatus.set(mask);
        }
        pending
    }
}

impl crate::drivers::interface::DeviceDriver for SystemTimer {
    type IRQNumberType = crate::platform::device_driver::IRQNumber;

    fn compatible(&self) -> &'static str {
        Self::COMPATIBLE
    }
}
