/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Data abort resolution: the far side of `machine`'s registered
//! `register_data_abort_handler` slot. The only fault this kernel resolves
//! rather than delivers as `SIGSEGV` is a write to a copy-on-write page;
//! everything else is still fatal, matching `arch::pmap::resolve_cow_fault`'s
//! own scope.

use crate::{mm, proc};
use machine::exception::ExceptionContext;

/// Registered with `machine::arch::armv7a::exception::register_data_abort_handler`
/// from `kernel_init`.
pub fn handle_data_abort(_ctx: &mut ExceptionContext) {
    let va = machine::arch::mmu::fault_address();
    let pid = proc::current_pid();
    let resolved = proc::with_process(pid, |process| {
        mm::with_allocator(|alloc| process.address_space.pmap.resolve_cow_fault(alloc, va))
    });
    match resolved {
        Some(Ok(())) => {}
        Some(Err(e)) => panic!("unresolvable data abort at {:#010x} in pid {}: {:?}", va, pid, e),
        None => panic!("data abort at {:#010x} in unknown pid {}", va, pid),
    }
}
