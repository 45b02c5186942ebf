/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! The rendezvous (condition-variable) primitive every blocking wait in
//! this kernel is built on: message ports, kqueue, futexes, and the
//! buffer cache's "buffer busy" wait all hold a `Rendez` rather than
//! rolling their own wait list.

use super::sched::{self, ThreadId};
use alloc::collections::VecDeque;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SleepError {
    Interrupted,
    TimedOut,
}

/// A list of blocked threads. Threads move from here to the BKL-blocked
/// list on wakeup, never straight to running, matching the cooperative-
/// in-kernel model: a woken thread still has to win the BKL back.
pub struct Rendez {
    waiters: VecDeque<ThreadId>,
}

impl Rendez {
    pub const fn new() -> Self {
        Self {
            waiters: VecDeque::new(),
        }
    }

    /// Release the BKL, block the current thread here, and reschedule.
    /// Returns once this thread has been woken and has reacquired the
    /// BKL.
    pub fn task_sleep(&mut self) {
        let me = sched::current();
        self.waiters.push_back(me);
        sched::block_current_on_rendez();
    }

    /// As `task_sleep`, but returns early on a pending signal/event
    /// (`EINTR`) or on a timeout arming a per-thread timer
    /// (`ETIMEDOUT`) before this thread is woken.
    pub fn task_sleep_interruptible(&mut self, timeout_ticks: Option<u64>) -> Result<(), SleepError> {
        if sched::current_has_pending_wake_condition() {
            return Err(SleepError::Interrupted);
        }
        let me = sched::current();
        self.waiters.push_back(me);
        let timed_out = sched::block_current_on_rendez_with_timeout(timeout_ticks);
        if timed_out {
            self.waiters.retain(|&t| t != me);
            return Err(SleepError::TimedOut);
        }
        if sched::current_has_pending_wake_condition() {
            return Err(SleepError::Interrupted);
        }
        Ok(())
    }

    /// Move one blocked thread to the BKL-blocked (ready-to-run) list.
    pub fn task_wakeup(&mut self) -> bool {
        if let Some(tid) = self.waiters.pop_front() {
            sched::move_to_bkl_blocked(tid);
            true
        } else {
            false
        }
    }

    pub fn wakeup_all(&mut self) {
        while self.task_wakeup() {}
    }

    /// Safe to call with interrupts disabled and without the BKL: only
    /// re-queues the target, it never touches BKL ownership itself.
    pub fn task_wakeup_from_isr(&mut self) {
        if let Some(tid) = self.waiters.pop_front() {
            sched::move_to_bkl_blocked_from_isr(tid);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }

    pub fn remove(&mut self, tid: ThreadId) {
        self.waiters.retain(|&t| t != tid);
    }

    /// Pop the front waiter without marking it ready. Only
    /// `futex::requeue` uses this — every other caller wakes through
    /// `task_wakeup`/`task_wakeup_from_isr`.
    pub(crate) fn pop_front_raw(&mut self) -> Option<ThreadId> {
        self.waiters.pop_front()
    }

    pub(crate) fn push_back_raw(&mut self, tid: ThreadId) {
        self.waiters.push_back(tid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn wakeup_on_empty_rendez_is_a_noop() {
        let mut r = Rendez::new();
        assert!(!r.task_wakeup());
    }
}
