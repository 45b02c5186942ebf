/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

#![no_std]
#![no_main]

use kernel::{boot_info, println, proc};
use machine::{exception, platform, synchronization::interface::Mutex};

/// `machine::arch::armv7a::boot::_start_rust` jumps here once a stack is
/// live. Brings up the board's drivers, wires the trap handlers to the
/// subsystems that service them, then falls into the scheduler.
///
/// # Safety
/// Must only be called once, from `_start_rust`, before interrupts are
/// unmasked.
#[no_mangle]
pub unsafe extern "Rust" fn kernel_init() -> ! {
    if let Err(x) = platform::drivers::init() {
        panic!("Error initializing drivers: {}", x);
    }
    platform::drivers::driver_manager().init_drivers_and_irqs();

    println!("{}", machine::version());
    platform::drivers::driver_manager().enumerate();

    exception::register_irq_handler(kernel::irq::top_half);
    exception::register_swi_handler(kernel::syscall::dispatch);
    exception::register_data_abort_handler(kernel::fault::handle_data_abort);

    kmain()
}

/// Build the kernel's own address space and idle thread, then hand off to
/// the scheduler. Never returns: once the idle thread is installed,
/// `proc::sched::reschedule` always has something to run.
fn kmain() -> ! {
    let allocator = boot_info::BOOT_INFO.lock(|info| kernel::init(info));
    kernel::mm::install_allocator(allocator);

    let kernel_space = kernel::mm::with_allocator(kernel::vm::AddressSpace::new).unwrap_or_else(|e| {
        panic!("failed to build the kernel's root address space: {:?}", e);
    });

    let mut kernel_process = proc::Process::new(0, kernel_space);
    kernel_process.is_kernel = true;
    kernel_process.mark_alive();
    proc::install_process(kernel_process);
    proc::set_current_pid(0);

    let idle = proc::sched::ThreadId(0);
    proc::sched::set_idle_thread(idle);
    proc::sched::set_current(idle);

    println!("kernel init done, entering scheduler");
    loop {
        proc::sched::reschedule();
        proc::timer::softclock_bottom_half();
    }
}
