/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Per-thread event bitmap. The IRQ handler + thread-event duality: an
//! ISR masks its line, acknowledges the controller, and raises a bit
//! here rather than touching a `Rendez` directly, since interrupts run
//! without the BKL. The thread later observes the bit via
//! `thread_event_wait`/`thread_event_check` or a `kqueue`
//! `EVFILT_THREAD_EVENT` registration.

use super::sched::ThreadId;
use crate::sync::{Mutex, NullLock};
use alloc::collections::BTreeMap;

#[derive(Default, Clone, Copy)]
struct ThreadEvents {
    pending: u32,
    wake_mask: u32,
}

static EVENTS: NullLock<BTreeMap<u32, ThreadEvents>> = NullLock::new(BTreeMap::new());

pub fn set_wake_mask(tid: ThreadId, mask: u32) {
    EVENTS.lock(|m| m.entry(tid.0).or_default().wake_mask = mask);
}

/// Raise `bit` on `tid`. Safe to call from interrupt context: the only
/// shared state touched is this bitmap, guarded by IRQ masking rather
/// than the BKL.
pub fn raise(tid: ThreadId, bit: u32) {
    EVENTS.lock(|m| m.entry(tid.0).or_default().pending |= 1 << bit);
}

pub fn clear(tid: ThreadId, bit: u32) {
    EVENTS.lock(|m| {
        if let Some(e) = m.get_mut(&tid.0) {
            e.pending &= !(1 << bit);
        }
    });
}

pub fn pending(tid: ThreadId) -> u32 {
    EVENTS.lock(|m| m.get(&tid.0).map(|e| e.pending).unwrap_or(0))
}

/// Whether any pending bit is unmasked by `tid`'s current wake mask —
/// the condition `TaskSleepInterruptible` polls for immediate `EINTR`.
pub fn has_pending(tid: ThreadId) -> bool {
    EVENTS.lock(|m| {
        m.get(&tid.0)
            .map(|e| e.pending & e.wake_mask != 0)
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn raised_bit_outside_wake_mask_does_not_count_as_pending() {
        let tid = ThreadId(9000);
        set_wake_mask(tid, 0b0001);
        raise(tid, 1);
        assert!(!has_pending(tid));
        raise(tid, 0);
        assert!(has_pending(tid));
    }
}
