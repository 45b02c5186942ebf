/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Hashed timing wheel. `JIFFIES_PER_SECOND` buckets indexed by
//! `expiration % JIFFIES_PER_SECOND`; the hardclock ISR
//! (`machine::platform::drivers::system_timer()`'s compare-channel
//! match) increments `hardclock_time` and wakes the bottom half, which
//! catches `softclock_time` up, firing every timer in each traversed
//! bucket whose expiration is at or before `softclock_time`. Callbacks
//! run in BKL context, never directly from the ISR.

use super::sched::ThreadId;
use crate::sync::{Mutex, NullLock};
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};

pub const JIFFIES_PER_SECOND: u64 = 100;

struct TimerEntry {
    thread: ThreadId,
    expiration: u64,
}

struct Wheel {
    buckets: [Vec<TimerEntry>; JIFFIES_PER_SECOND as usize],
    expired: BTreeMap<u32, ()>,
}

impl Wheel {
    const fn new() -> Self {
        const EMPTY: Vec<TimerEntry> = Vec::new();
        Self {
            buckets: [EMPTY; JIFFIES_PER_SECOND as usize],
            expired: BTreeMap::new(),
        }
    }
}

static HARDCLOCK_TIME: AtomicU64 = AtomicU64::new(0);
static SOFTCLOCK_TIME: AtomicU64 = AtomicU64::new(0);
static WHEEL: NullLock<Wheel> = NullLock::new(Wheel::new());

/// Called from `machine::exception`'s IRQ path (by way of
/// `kernel::irq`) on every system-timer compare match. Allocation-free,
/// lock-free in the sense of taking only the interrupt-disabled window
/// `NullLock` already provides.
pub fn hardclock() {
    HARDCLOCK_TIME.fetch_add(1, Ordering::Relaxed);
    super::sched::move_to_bkl_blocked_from_isr(timer_bottom_half_task());
}

/// The bottom-half thread woken by `hardclock`: advances
/// `softclock_time` up to `hardclock_time`, firing every timer whose
/// bucket it passes through and whose expiration has arrived.
pub fn softclock_bottom_half() {
    let target = HARDCLOCK_TIME.load(Ordering::Relaxed);
    let mut soft = SOFTCLOCK_TIME.load(Ordering::Relaxed);
    while soft < target {
        soft += 1;
        let bucket = (soft % JIFFIES_PER_SECOND) as usize;
        WHEEL.lock(|w| {
            w.buckets[bucket].retain(|entry| {
                if entry.expiration <= soft {
                    w.expired.insert(entry.thread.0, ());
                    super::sched::move_to_bkl_blocked(entry.thread);
                    false
                } else {
                    true
                }
            });
        });
    }
    SOFTCLOCK_TIME.store(soft, Ordering::Relaxed);
}

/// A fixed `ThreadId` reserved for the timer bottom half; the real id is
/// assigned by `proc::pid` at boot and patched in here.
static TIMER_BOTTOM_HALF: NullLock<ThreadId> = NullLock::new(ThreadId(1));

pub fn set_timer_bottom_half(tid: ThreadId) {
    TIMER_BOTTOM_HALF.lock(|slot| *slot = tid);
}

fn timer_bottom_half_task() -> ThreadId {
    TIMER_BOTTOM_HALF.lock(|slot| *slot)
}

/// Arm a one-shot wakeup for `thread` after `ticks` jiffies, used by
/// `TaskSleepInterruptible`'s timeout path.
pub fn arm_wakeup(thread: ThreadId, ticks: u64) {
    let expiration = HARDCLOCK_TIME.load(Ordering::Relaxed) + ticks;
    let bucket = (expiration % JIFFIES_PER_SECOND) as usize;
    WHEEL.lock(|w| w.buckets[bucket].push(TimerEntry { thread, expiration }));
}

/// Whether `thread`'s most recent armed timer has already fired; clears
/// the record so the next `arm_wakeup` starts fresh.
pub fn consume_expired(thread: ThreadId) -> bool {
    WHEEL.lock(|w| w.expired.remove(&thread.0).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn arming_then_advancing_clock_past_expiration_marks_expired() {
        set_timer_bottom_half(ThreadId(4242));
        let tid = ThreadId(4243);
        arm_wakeup(tid, 1);
        HARDCLOCK_TIME.store(SOFTCLOCK_TIME.load(Ordering::Relaxed) + 2, Ordering::Relaxed);
        softclock_bottom_half();
        assert!(consume_expired(tid));
    }
}
