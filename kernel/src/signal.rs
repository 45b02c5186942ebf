/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Signal delivery: disposition table, the pending/blocked bitmaps
//! carried on each `Thread`, and the frame built on a user stack so a
//! handler returns through `sigreturn` into exactly the context it
//! interrupted.

use crate::proc::Thread;
use alloc::collections::BTreeMap;

pub const NSIG: u32 = 32;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Disposition {
    Default,
    Ignore,
    Handler(u32),
}

#[derive(Debug, Copy, Clone)]
pub struct SigAction {
    pub disposition: Disposition,
    pub mask: u32,
    pub restart: bool,
}

impl SigAction {
    pub const fn default_action() -> Self {
        Self {
            disposition: Disposition::Default,
            mask: 0,
            restart: false,
        }
    }
}

/// One table per process; a `fork`ed child inherits a copy, an `exec`
/// resets every `Handler` entry back to `Default` (handler addresses
/// from the old image are meaningless in the new one) while leaving
/// `Ignore` alone, matching POSIX.
pub struct SignalTable {
    actions: BTreeMap<u32, SigAction>,
}

impl SignalTable {
    pub const fn new() -> Self {
        Self {
            actions: BTreeMap::new(),
        }
    }

    pub fn sigaction(&mut self, signum: u32, action: SigAction) -> SigAction {
        self.actions.insert(signum, action).unwrap_or_else(SigAction::default_action)
    }

    pub fn action_for(&self, signum: u32) -> SigAction {
        self.actions.get(&signum).copied().unwrap_or_else(SigAction::default_action)
    }

    pub fn reset_on_exec(&mut self) {
        for action in self.actions.values_mut() {
            if let Disposition::Handler(_) = action.disposition {
                action.disposition = Disposition::Default;
            }
        }
    }
}

/// `sigprocmask`: `how` follows the SIG_BLOCK/SIG_UNBLOCK/SIG_SETMASK
/// convention, encoded by the caller rather than this module since the
/// syscall boundary already validates it.
pub fn sigprocmask_block(thread: &mut Thread, mask: u32) -> u32 {
    let old = thread.signal_mask;
    thread.signal_mask |= mask;
    old
}

pub fn sigprocmask_unblock(thread: &mut Thread, mask: u32) -> u32 {
    let old = thread.signal_mask;
    thread.signal_mask &= !mask;
    old
}

pub fn sigprocmask_set(thread: &mut Thread, mask: u32) -> u32 {
    core::mem::replace(&mut thread.signal_mask, mask)
}

pub fn sigpending(thread: &Thread) -> u32 {
    thread.pending_signals
}

/// `kill`/`raise`: mark `signum` pending. Actual delivery (running the
/// handler or taking the default action) happens on return to user
/// mode, once the thread's mask no longer blocks it.
pub fn raise(thread: &mut Thread, signum: u32) {
    thread.pending_signals |= 1 << signum;
}

/// The next deliverable signal: pending and not blocked, lowest number
/// first. `None` if nothing is deliverable right now.
pub fn next_deliverable(thread: &Thread) -> Option<u32> {
    let deliverable = thread.pending_signals & !thread.signal_mask;
    if deliverable == 0 {
        None
    } else {
        Some(deliverable.trailing_zeros())
    }
}

pub fn clear_pending(thread: &mut Thread, signum: u32) {
    thread.pending_signals &= !(1 << signum);
}

/// The context a handler needs to resume through `sigreturn`: the
/// interrupted register file and the mask in effect before the signal
/// was taken, so `sigreturn` can restore both exactly.
#[derive(Debug, Copy, Clone)]
pub struct SignalFrame {
    pub saved_registers: [u32; 16],
    pub saved_mask: u32,
    pub signum: u32,
}

/// Build the frame on the thread's current stack (`sp` points just below
/// the last pushed word) and return the new stack pointer the trap
/// return path should resume at, along with the handler's entry point
/// the caller installs into the saved `pc`.
pub fn build_signal_frame(sp: u32, saved_registers: [u32; 16], saved_mask: u32, signum: u32) -> (u32, SignalFrame) {
    let frame = SignalFrame {
        saved_registers,
        saved_mask,
        signum,
    };
    let frame_size = core::mem::size_of::<SignalFrame>() as u32;
    let new_sp = (sp - frame_size) & !0x7;
    (new_sp, frame)
}

/// `sigreturn`: hand back the saved mask and register file so the trap
/// return path can restore the interrupted context verbatim.
pub fn teardown_signal_frame(thread: &mut Thread, frame: &SignalFrame) {
    thread.signal_mask = frame.saved_mask;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proc::sched::{Policy, ThreadId};

    #[test_case]
    fn masked_signal_is_pending_but_not_deliverable() {
        let mut thread = Thread::new(ThreadId(1), 1, Policy::Other, 16);
        sigprocmask_block(&mut thread, 1 << 5);
        raise(&mut thread, 5);
        assert_eq!(sigpending(&thread), 1 << 5);
        assert_eq!(next_deliverable(&thread), None);
        sigprocmask_unblock(&mut thread, 1 << 5);
        assert_eq!(next_deliverable(&thread), Some(5));
    }

    #[test_case]
    fn exec_resets_handlers_but_not_ignore() {
        let mut table = SignalTable::new();
        table.sigaction(5, SigAction {
            disposition: Disposition::Handler(0x1000),
            mask: 0,
            restart: false,
        });
        table.sigaction(6, SigAction {
            disposition: Disposition::Ignore,
            mask: 0,
            restart: false,
        });
        table.reset_on_exec();
        assert_eq!(table.action_for(5).disposition, Disposition::Default);
        assert_eq!(table.action_for(6).disposition, Disposition::Ignore);
    }
}
