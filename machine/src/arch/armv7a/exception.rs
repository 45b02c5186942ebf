/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Cheviot Project Contributors
 */

//! ARMv7-A exception handling: vector table, low-level trap entry/exit, and
//! IRQ masking.
//!
//! The vector table lives at the low address (`SCTLR.V == 0`, see
//! [`crate::arch::armv7a::regs`]) and each of its seven slots is a single
//! `ldr pc, [pc, #24]` indirect branch into a handler table, the same
//! layout every bare-metal ARMv7-A port uses. Only `Undefined`, `Swi`
//! (software interrupt, the syscall trap instruction), `PrefetchAbort`,
//! `DataAbort` and `Irq` are wired to real handlers; `Reset` is only ever
//! reached once at boot, and `Fiq` is not used by this kernel.

use crate::synchronization::{interface::Mutex, IRQSafeNullLock};
use core::{arch::global_asm, cell::UnsafeCell, fmt};

/// General-purpose and banked register state saved by the trap entry stub.
/// Matches the push order in the entry assembly below.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct ExceptionContext {
    pub r0: u32,
    pub r1: u32,
    pub r2: u32,
    pub r3: u32,
    pub r4: u32,
    pub r5: u32,
    pub r6: u32,
    pub r7: u32,
    pub r8: u32,
    pub r9: u32,
    pub r10: u32,
    pub r11: u32,
    pub r12: u32,
    /// Banked `lr` of the mode the trap interrupted, i.e. the return address.
    pub lr: u32,
    /// Saved Program Status Register of the interrupted mode.
    pub spsr: u32,
}

impl fmt::Display for ExceptionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ExceptionContext {{")?;
        writeln!(f, "    lr:   {:#010x}", self.lr)?;
        writeln!(f, "    spsr: {:#010x}", self.spsr)?;
        write!(f, "}}")
    }
}

global_asm!(include_str!("exception.s"));

/// `kernel` has no way to depend back on `machine`, so it hooks these traps
/// by registering a plain function pointer at boot instead; until
/// registered, each trap falls back to the behaviour below.
static SWI_HANDLER: IRQSafeNullLock<Option<fn(&mut ExceptionContext)>> = IRQSafeNullLock::new(None);
static DATA_ABORT_HANDLER: IRQSafeNullLock<Option<fn(&mut ExceptionContext)>> = IRQSafeNullLock::new(None);
static IRQ_HANDLER: IRQSafeNullLock<Option<fn()>> = IRQSafeNullLock::new(None);

/// Install the syscall dispatcher. Called once from `kernel_init`.
pub fn register_swi_handler(f: fn(&mut ExceptionContext)) {
    SWI_HANDLER.lock(|h| *h = Some(f));
}

/// Install the data-abort (demand paging / COW fault) dispatcher.
pub fn register_data_abort_handler(f: fn(&mut ExceptionContext)) {
    DATA_ABORT_HANDLER.lock(|h| *h = Some(f));
}

/// Install the IRQ top-half dispatcher.
pub fn register_irq_handler(f: fn()) {
    IRQ_HANDLER.lock(|h| *h = Some(f));
}

/// Undefined instruction trap. Unused opcodes are not emitted by the
/// compiler for a conforming target, so this firing indicates either a
/// corrupted instruction stream or an attempt to use an FPU instruction
/// with the FPU disabled; this kernel has no lazy FPU context switch, so
/// the latter is currently fatal too.
#[no_mangle]
extern "C" fn current_el_undefined(e: &ExceptionContext) {
    panic!("undefined instruction\n{}", e);
}

/// Software interrupt trap (the `svc`/`swi` instruction): the syscall gate.
/// Argument marshalling and dispatch into `kernel::syscall` happens on the
/// far side of this boundary; `machine` only captures the saved context and
/// forwards it to whatever was registered with `register_swi_handler`.
#[no_mangle]
extern "C" fn current_el_swi(e: &mut ExceptionContext) {
    SWI_HANDLER.lock(|h| {
        if let Some(f) = h {
            f(e);
        }
    });
}

#[no_mangle]
extern "C" fn current_el_prefetch_abort(e: &ExceptionContext) {
    panic!("prefetch abort\n{}", e);
}

/// Data abort trap: the entry point for demand paging and copy-on-write
/// fault resolution. `machine` itself does not interpret the Fault Status
/// Register; a registered handler does, via `register_data_abort_handler`.
/// Falls back to a panic if nothing is registered yet (e.g. a fault taken
/// before `kernel_init` has wired up the fault resolver).
#[no_mangle]
extern "C" fn current_el_data_abort(e: &mut ExceptionContext) {
    let handled = DATA_ABORT_HANDLER.lock(|h| {
        if let Some(f) = h {
            f(e);
            true
        } else {
            false
        }
    });
    if !handled {
        panic!("data abort\n{}", e);
    }
}

#[no_mangle]
extern "C" fn current_el_irq(_e: &ExceptionContext) {
    IRQ_HANDLER.lock(|h| {
        if let Some(f) = h {
            f();
        }
    });
}

/// IRQ masking and the single-core critical-section helper used by
/// [`crate::synchronization::IRQSafeNullLock`].
pub mod asynchronous {
    /// Mask (disable) IRQs, returning the prior mask state so callers can
    /// restore it rather than unconditionally re-enabling.
    #[inline(always)]
    fn local_irq_mask_save() -> u32 {
        let cpsr: u32;
        unsafe {
            core::arch::asm!(
                "mrs {0}, cpsr",
                "cpsid i",
                out(reg) cpsr,
                options(nomem, nostack, preserves_flags)
            );
        }
        cpsr
    }

    #[inline(always)]
    fn local_irq_restore(saved_cpsr: u32) {
        const IRQ_BIT: u32 = 1 << 7;
        if saved_cpsr & IRQ_BIT == 0 {
            unsafe { core::arch::asm!("cpsie i", options(nomem, nostack, preserves_flags)) };
        }
    }

    /// Returns whether IRQs are currently masked on this core.
    pub fn is_local_irq_masked() -> bool {
        let cpsr: u32;
        unsafe {
            core::arch::asm!("mrs {0}, cpsr", out(reg) cpsr, options(nomem, nostack, preserves_flags));
        }
        cpsr & (1 << 7) != 0
    }

    /// Execute `f` with IRQs masked on this core, restoring the previous
    /// mask state afterwards. This is the only primitive
    /// [`crate::synchronization::IRQSafeNullLock`] needs: there is no
    /// second core to spin against, so masking IRQs is sufficient mutual
    /// exclusion.
    #[inline]
    pub fn exec_with_irq_masked<T>(f: impl FnOnce() -> T) -> T {
        let saved = local_irq_mask_save();
        let ret = f();
        local_irq_restore(saved);
        ret
    }

    /// A BCM interrupt line number. The classic BCM interrupt controller
    /// exposes IRQs 0-63 across two banks plus a handful of "basic" lines;
    /// `kernel::irq` is the ISR registry and dispatcher (see boards/
    /// raspberry_pi_1/interrupt.c) — this type only identifies a line.
    #[derive(Copy, Clone)]
    pub struct IRQNumber(usize);

    impl IRQNumber {
        pub const fn new(n: usize) -> Self {
            Self(n)
        }

        pub const fn get(self) -> usize {
            self.0
        }
    }

    impl core::fmt::Display for IRQNumber {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            write!(f, "{}", self.0)
        }
    }
}

/// Storage for the exception vector table and handler jump table, installed
/// once during early boot.
#[repr(C, align(32))]
struct VectorTable(UnsafeCell<[u32; 8]>);

unsafe impl Sync for VectorTable {}

extern "C" {
    static __exception_vectors_start: u32;
}

/// # Safety
/// Must run before interrupts are unmasked and before any code relies on
/// exception delivery; copies the table assembled in `exception.s` down to
/// the low vector page at address 0, which must already be mapped
/// read-write.
pub unsafe fn handling_init() {
    let src = &__exception_vectors_start as *const u32;
    let dst = 0x0000_0000 as *mut u32;
    core::ptr::copy_nonoverlapping(src, dst, 16);
    super::regs::isb();
}
