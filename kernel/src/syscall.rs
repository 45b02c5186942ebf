/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! The syscall gate: the far side of `machine`'s registered
//! `register_swi_handler` slot. ARM EABI convention puts the syscall number
//! in `r7` and the first four arguments in `r0`-`r3`; the return value goes
//! back out through `r0`.
//!
//! Only the syscalls that need nothing beyond the current pid and the
//! scheduler are dispatched here. The much larger VFS/IPC surface
//! (`sys_read`, `sys_getmsg`, `sys_createmsgport`, ...) resolves through a
//! process's `fs::fd::FdTable`, which is not yet reachable from a bare
//! syscall number without a per-process table lookup this module does not
//! yet perform; those calls are still reached directly by the server loop
//! rather than through this gate.

use crate::proc;
use machine::exception::ExceptionContext;

pub const SYS_EXIT: u32 = 1;
pub const SYS_GETPID: u32 = 2;
pub const SYS_YIELD: u32 = 3;

/// Registered with `machine::arch::armv7a::exception::register_swi_handler`
/// from `kernel_init`.
pub fn dispatch(ctx: &mut ExceptionContext) {
    let number = ctx.r7;
    let arg0 = ctx.r0;
    ctx.r0 = match number {
        SYS_EXIT => {
            sys_exit(arg0 as i32);
            0
        }
        SYS_GETPID => proc::current_pid(),
        SYS_YIELD => {
            proc::sched::reschedule();
            0
        }
        _ => u32::MAX, // ENOSYS
    };
}

fn sys_exit(status: i32) {
    let pid = proc::current_pid();
    proc::with_process(pid, |process| process.mark_exited(status));
}
