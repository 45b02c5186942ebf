/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Run queues and the Big Kernel Lock. 32 priority levels split into two
//! ranges: 16-31 real-time (`SCHED_RR`/`SCHED_FIFO`), 0-15 fair-share
//! (`SCHED_OTHER`). A bitmap tracks non-empty levels so picking the next
//! thread is a `leading_zeros` away rather than a scan.
//!
//! Register-level context switching (saving/restoring
//! `machine::exception::ExceptionContext` and the banked stack pointer)
//! happens on the trap-return path in `machine`; this module only
//! decides *which* thread runs next and moves `ThreadId`s between lists.

use super::rendez::Rendez;
use crate::sync::{Mutex, NullLock};
use alloc::collections::VecDeque;

pub const PRIORITY_LEVELS: usize = 32;
pub const RT_PRIORITY_BASE: u8 = 16;
pub const QUANTUM_TICKS: u32 = 5;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(pub u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Policy {
    Rr,
    Fifo,
    Other,
}

struct RunQueues {
    levels: [VecDeque<ThreadId>; PRIORITY_LEVELS],
    nonempty: u32,
    current: Option<ThreadId>,
    bkl_owner: Option<ThreadId>,
    bkl_waiters: VecDeque<ThreadId>,
    idle: ThreadId,
}

impl RunQueues {
    const fn new() -> Self {
        const EMPTY: VecDeque<ThreadId> = VecDeque::new();
        Self {
            levels: [EMPTY; PRIORITY_LEVELS],
            nonempty: 0,
            current: None,
            bkl_owner: None,
            bkl_waiters: VecDeque::new(),
            idle: ThreadId(0),
        }
    }

    fn enqueue(&mut self, tid: ThreadId, priority: u8) {
        let level = priority as usize % PRIORITY_LEVELS;
        self.levels[level].push_back(tid);
        self.nonempty |= 1 << level;
    }

    fn highest_nonempty(&self) -> Option<usize> {
        if self.nonempty == 0 {
            None
        } else {
            Some(31 - self.nonempty.leading_zeros() as usize)
        }
    }

    fn pick_next(&mut self) -> ThreadId {
        let Some(level) = self.highest_nonempty() else {
            return self.idle;
        };
        let tid = self.levels[level].pop_front().expect("nonempty bit set with empty queue");
        if self.levels[level].is_empty() {
            self.nonempty &= !(1 << level);
        }
        tid
    }
}

static RQ: NullLock<RunQueues> = NullLock::new(RunQueues::new());

/// Must be called exactly once during boot, before any thread blocks,
/// naming the thread that runs when every run queue is empty.
pub fn set_idle_thread(tid: ThreadId) {
    RQ.lock(|rq| rq.idle = tid);
}

pub fn set_current(tid: ThreadId) {
    RQ.lock(|rq| rq.current = Some(tid));
}

pub fn current() -> ThreadId {
    RQ.lock(|rq| rq.current.expect("sched::current() called before a thread was scheduled"))
}

/// `SCHED_OTHER` priority decay on quantum exhaustion: one step down,
/// floor at 1, leaving level 0 reserved for the idle thread alone.
pub fn decay_priority(priority: u8) -> u8 {
    if priority > 1 {
        priority - 1
    } else {
        1
    }
}

pub fn enqueue_ready(tid: ThreadId, priority: u8) {
    RQ.lock(|rq| rq.enqueue(tid, priority));
}

/// Acquire the BKL for `tid`. Returns `true` if it was free and is now
/// held by `tid`; `false` if `tid` was enqueued on the wait list and must
/// be rescheduled away.
pub fn bkl_acquire(tid: ThreadId) -> bool {
    RQ.lock(|rq| {
        if rq.bkl_owner.is_none() {
            rq.bkl_owner = Some(tid);
            true
        } else {
            rq.bkl_waiters.push_back(tid);
            false
        }
    })
}

/// Release the BKL held by the caller. If the wait list is non-empty,
/// ownership transfers directly to the next waiter (who is marked ready)
/// rather than the lock going free and being raced for.
pub fn bkl_release() {
    RQ.lock(|rq| {
        if let Some(next) = rq.bkl_waiters.pop_front() {
            rq.bkl_owner = Some(next);
            rq.levels[RT_PRIORITY_BASE as usize].push_back(next);
            rq.nonempty |= 1 << RT_PRIORITY_BASE;
        } else {
            rq.bkl_owner = None;
        }
    });
}

pub fn bkl_owner() -> Option<ThreadId> {
    RQ.lock(|rq| rq.bkl_owner)
}

/// Move a thread a `Rendez` woke from the rendezvous-blocked state onto
/// the BKL-blocked (i.e. run-queue-ready) list.
pub fn move_to_bkl_blocked(tid: ThreadId) {
    RQ.lock(|rq| {
        rq.levels[RT_PRIORITY_BASE as usize].push_back(tid);
        rq.nonempty |= 1 << RT_PRIORITY_BASE;
    });
}

/// As `move_to_bkl_blocked`, callable from interrupt context: no BKL is
/// taken or asserted, only the run queue (which is itself edited with
/// interrupts disabled by the caller).
pub fn move_to_bkl_blocked_from_isr(tid: ThreadId) {
    move_to_bkl_blocked(tid);
}

/// Park the current thread: release the BKL (transferring to the next
/// waiter), mark it rendezvous-blocked by virtue of having already been
/// pushed onto a `Rendez`'s list, and switch to whatever `pick_next`
/// selects. Returns once this thread has been rescheduled and has
/// reacquired the BKL.
pub fn block_current_on_rendez() {
    bkl_release();
    reschedule();
}

/// As `block_current_on_rendez`, with a timer armed by
/// `proc::timer::sleep_current_for`. Returns whether the timeout fired
/// before a wakeup.
pub fn block_current_on_rendez_with_timeout(timeout_ticks: Option<u64>) -> bool {
    let tid = current();
    if let Some(ticks) = timeout_ticks {
        super::timer::arm_wakeup(tid, ticks);
    }
    bkl_release();
    reschedule();
    timeout_ticks.is_some() && super::timer::consume_expired(tid)
}

/// Pick the next ready thread and make it current. The actual register
/// save/restore is the trap-return path's job; this only updates the
/// scheduler's bookkeeping of who is running.
pub fn reschedule() {
    let next = RQ.lock(|rq| rq.pick_next());
    set_current(next);
    bkl_acquire(next);
}

/// Placeholder for signal/event-pending checks consulted by
/// `TaskSleepInterruptible`; wired to `proc::event`/`signal` once a
/// thread owns storage for its pending set.
pub fn current_has_pending_wake_condition() -> bool {
    super::event::has_pending(current())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn highest_priority_runs_first() {
        let mut rq = RunQueues::new();
        rq.enqueue(ThreadId(1), 2);
        rq.enqueue(ThreadId(2), 20);
        assert_eq!(rq.pick_next(), ThreadId(2));
        assert_eq!(rq.pick_next(), ThreadId(1));
    }

    #[test_case]
    fn bkl_transfers_to_waiter_on_release() {
        assert!(bkl_acquire(ThreadId(100)));
        assert!(!bkl_acquire(ThreadId(101)));
        bkl_release();
        assert_eq!(bkl_owner(), Some(ThreadId(101)));
        bkl_release();
        assert_eq!(bkl_owner(), None);
    }
}
