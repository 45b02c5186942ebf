/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Cheviot Project Contributors
 */

//! The classic BCM interrupt controller (BCM2835/BCM2836), exposed as an
//! opaque register interface: two 32-bit banks of GPU-routable IRQs plus
//! eight "basic" ARM-local lines. `kernel::irq` owns the per-IRQ handler
//! list and dispatch loop (grounded on
//! `boards/raspberry_pi_1/interrupt.c`'s `interrupt_top_half`); this type
//! only masks, unmasks, and reports pending lines.

use crate::{mmio_deref_wrapper::MMIODerefWrapper, platform::device_driver::IRQNumber};
use tock_registers::{
    interfaces::{Readable, Writeable},
    register_structs,
    registers::{ReadOnly, WriteOnly},
};

register_structs! {
    #[allow(non_snake_case)]
    RegisterBlock {
        (0x00 => IRQBasicPending: ReadOnly<u32>),
        (0x04 => IRQPending1: ReadOnly<u32>),
        (0x08 => IRQPending2: ReadOnly<u32>),
        (0x0c => __reserved_1),
        (0x10 => EnableIRQs1: WriteOnly<u32>),
        (0x14 => EnableIRQs2: WriteOnly<u32>),
        (0x18 => EnableBasicIRQs: WriteOnly<u32>),
        (0x1c => DisableIRQs1: WriteOnly<u32>),
        (0x20 => DisableIRQs2: WriteOnly<u32>),
        (0x24 => DisableBasicIRQs: WriteOnly<u32>),
        (0x28 => @END),
    }
}

type Registers = MMIODerefWrapper<RegisterBlock>;

/// Snapshot of the three pending-IRQ bitmaps, taken atomically enough for a
/// single-core kernel with IRQs masked during the read.
pub struct PendingIrqs {
    pub bank1: u32,
    pub bank2: u32,
    pub basic: u32,
}

pub struct InterruptController {
    registers: Registers,
}

impl InterruptController {
    pub const COMPATIBLE: &'static str = "BCM Interrupt Controller";

    /// # Safety
    ///
    /// `mmio_base_addr` must address a live interrupt controller block.
    pub const unsafe fn new(mmio_base_addr: usize) -> Self {
        Self {
            registers: Registers::new(mmio_base_addr),
        }
    }

    /// Enable a single IRQ line. `irq` in `[0, 31]` targets bank 1, `[32,
    /// 63]` bank 2, `[64, 71]` the basic bank.
    pub fn enable(&self, irq: IRQNumber) {
        let n = irq.get();
        match n {
            0..=31 => self.registers.EnableIRQs1.set(1 << n),
            32..=63 => self.registers.EnableIRQs2.set(1 << (n - 32)),
            _ => self.registers.EnableBasicIRQs.set(1 << (n - 64)),
        }
    }

    /// Disable a single IRQ line.
    pub fn disable(&self, irq: IRQNumber) {
        let n = irq.get();
        match n {
            0..=31 => self.registers.DisableIRQs1.set(1 << n),
            32..=63 => self.registers.DisableIRQs2.set(1 << (n - 32)),
            _ => self.registers.DisableBasicIRQs.set(1 << (n - 64)),
        }
    }

    /// Read the three pending-IRQ bitmaps. Called once per IRQ trap entry by
    /// `kernel::irq::top_half` before walking the per-line handler list.
    pub fn pending(&self) -> PendingIrqs {
        PendingIrqs {
            bank1: self.registers.IRQPending1.get(),
            bank2: self.registers.IRQPending2.get(),
            basic: self.registers.IRQBasicPending.get(),
        }
    }
}

impl crate::drivers::interface::DeviceDriver for InterruptController {
    type IRQNumberType = IRQNumber;

    fn compatible(&self) -> &'static str {
        Self::COMPATIBLE
    }
}
