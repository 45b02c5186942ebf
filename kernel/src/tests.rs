/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Host/QEMU-runnable unit test harness for logic that doesn't need the MMU
//! or trap machinery (free lists, run queues, rendez wake order, msgid
//! bitmap, buffer hash). Tests that need hardware bring-up live under
//! `kernel/tests/` instead, mirroring how `machine` keeps its own
//! `#[cfg(test)]` modules hardware-agnostic.

use machine::{print, println};

pub trait TestFn {
    fn run(&self);
}

impl<T> TestFn for T
where
    T: Fn(),
{
    fn run(&self) {
        print!("*TEST* {}...\t", core::any::type_name::<T>());
        self();
        println!("[ok]");
    }
}

#[cfg(test)]
pub fn test_runner(tests: &[&dyn TestFn]) {
    println!("Running {} tests", tests.len());
    for test in tests {
        test.run();
    }
    println!("\n[success]");
    machine::qemu::semihosting::exit_success();
}
