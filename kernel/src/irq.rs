/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Interrupt service routine registry and top-half dispatch. Owns the
//! list of handlers per line; `machine::platform::drivers::
//! interrupt_controller()` only masks, unmasks, and reports pending
//! lines. A handler never runs user code directly: it records that the
//! line fired and wakes whatever is waiting on it (a `kqueue` EVFILT_IRQ
//! knote, or a driver thread's `Rendez`), matching the mask-then-raise
//! duality most BCM-based kernels use to keep interrupt context short.

use crate::sync::{Mutex, NullLock};
use alloc::vec::Vec;
use machine::exception::asynchronous::IRQNumber;

pub type IsrFn = fn(IRQNumber);

#[derive(Clone, Copy)]
struct Registration {
    irq: usize,
    handler: IsrFn,
}

struct Registry {
    handlers: Vec<Registration>,
}

static REGISTRY: NullLock<Registry> = NullLock::new(Registry { handlers: Vec::new() });

/// Register `handler` to run whenever `irq` fires. Multiple handlers may
/// share a line (e.g. shared GPU IRQ banks); all are invoked in
/// registration order.
pub fn addinterruptserver(irq: IRQNumber, handler: IsrFn) {
    machine::platform::drivers::interrupt_controller().enable(irq);
    REGISTRY.lock(|r| {
        r.handlers.push(Registration {
            irq: irq.get(),
            handler,
        })
    });
}

/// Remove every handler registered for `irq` and mask the line.
pub fn reminterruptserver(irq: IRQNumber) {
    REGISTRY.lock(|r| r.handlers.retain(|reg| reg.irq != irq.get()));
    machine::platform::drivers::interrupt_controller().disable(irq);
}

pub fn maskinterrupt(irq: IRQNumber) {
    machine::platform::drivers::interrupt_controller().disable(irq);
}

pub fn unmaskinterrupt(irq: IRQNumber) {
    machine::platform::drivers::interrupt_controller().enable(irq);
}

/// Called from the exception vector's IRQ entry. Reads the pending
/// bitmaps once, then dispatches every line that is both pending and has
/// a registered handler.
pub fn top_half() {
    let pending = machine::platform::drivers::interrupt_controller().pending();
    let words = [pending.bank1, pending.bank2, pending.basic];
    for (bank, word) in words.iter().enumerate() {
        let mut bits = *word;
        while bits != 0 {
            let bit = bits.trailing_zeros() as usize;
            bits &= !(1 << bit);
            let irq = bank * 32 + bit;
            REGISTRY.lock(|r| {
                for reg in r.handlers.iter().filter(|reg| reg.irq == irq) {
                    (reg.handler)(IRQNumber::new(irq));
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn registering_then_removing_clears_handlers() {
        fn noop(_: IRQNumber) {}
        addinterruptserver(IRQNumber::new(1), noop);
        assert_eq!(REGISTRY.lock(|r| r.handlers.len()), 1);
        reminterruptserver(IRQNumber::new(1));
        assert_eq!(REGISTRY.lock(|r| r.handlers.len()), 0);
    }
}
