/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Process and thread scheduling: the Big Kernel Lock, priority run
//! queues, rendezvous waits, the timing wheel, the PID table, per-thread
//! event bitmap, futexes, and CPU-time accounting.

pub mod event;
pub mod futex;
pub mod pid;
pub mod rendez;
pub mod sched;
pub mod timer;
pub mod usage;

use crate::sync::{Mutex, NullLock};
use crate::vm::AddressSpace;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use sched::ThreadId;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProcessState {
    Init,
    Alive,
    Exited,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ThreadState {
    Init,
    Ready,
    Running,
    RendezvousBlocked,
    BklBlocked,
    Exited,
}

pub struct Process {
    pub pid: u32,
    pub session_id: u32,
    pub pgroup_id: u32,
    pub uid: u32,
    pub euid: u32,
    pub suid: u32,
    pub gid: u32,
    pub egid: u32,
    pub sgid: u32,
    pub groups: Vec<u32>,
    pub is_kernel: bool,
    pub io_privileged: bool,
    pub state: ProcessState,
    pub parent: Option<u32>,
    pub children: Vec<u32>,
    pub threads: Vec<ThreadId>,
    pub address_space: AddressSpace,
    pub exit_status: i32,
}

impl Process {
    /// A process starts `Init`; the caller flips it to `Alive` once its
    /// first thread has been pushed onto a run queue.
    pub fn new(pid: u32, address_space: AddressSpace) -> Self {
        Self {
            pid,
            session_id: pid,
            pgroup_id: pid,
            uid: 0,
            euid: 0,
            suid: 0,
            gid: 0,
            egid: 0,
            sgid: 0,
            groups: Vec::new(),
            is_kernel: false,
            io_privileged: false,
            state: ProcessState::Init,
            parent: None,
            children: Vec::new(),
            threads: Vec::new(),
            address_space,
            exit_status: 0,
        }
    }

    pub fn mark_alive(&mut self) {
        self.state = ProcessState::Alive;
    }

    /// `sys_exit`/last-thread-exits: memory is not reclaimed here, only
    /// once the parent reaps via `wait`.
    pub fn mark_exited(&mut self, status: i32) {
        self.state = ProcessState::Exited;
        self.exit_status = status;
    }
}

pub struct Thread {
    pub tid: ThreadId,
    pub process_pid: u32,
    pub state: ThreadState,
    pub policy: sched::Policy,
    pub priority: u8,
    pub quantum_remaining: u32,
    pub detached: bool,
    pub joiner: Option<ThreadId>,
    pub reply_port: Option<u32>,
    pub signal_mask: u32,
    pub pending_signals: u32,
}

impl Thread {
    pub fn new(tid: ThreadId, process_pid: u32, policy: sched::Policy, priority: u8) -> Self {
        Self {
            tid,
            process_pid,
            state: ThreadState::Init,
            policy,
            priority,
            quantum_remaining: sched::QUANTUM_TICKS,
            detached: false,
            joiner: None,
            reply_port: None,
            signal_mask: 0,
            pending_signals: 0,
        }
    }

    /// Called on quantum exhaustion for `SCHED_OTHER` threads; `SCHED_RR`
    /// threads just rotate within their level at the same priority.
    pub fn decay_if_fair_share(&mut self) {
        if self.policy == sched::Policy::Other {
            self.priority = sched::decay_priority(self.priority);
        }
        self.quantum_remaining = sched::QUANTUM_TICKS;
    }
}

/// The system-wide process table, keyed by pid. `proc::pid` hands out the
/// integers; this is where the `Process` each one names actually lives.
static PROCESSES: NullLock<BTreeMap<u32, Process>> = NullLock::new(BTreeMap::new());

pub fn install_process(process: Process) {
    PROCESSES.lock(|table| {
        table.insert(process.pid, process);
    });
}

pub fn with_process<R>(pid: u32, f: impl FnOnce(&mut Process) -> R) -> Option<R> {
    PROCESSES.lock(|table| table.get_mut(&pid).map(f))
}

pub fn remove_process(pid: u32) -> Option<Process> {
    PROCESSES.lock(|table| table.remove(&pid))
}

/// The pid of the process owning whichever thread is currently running.
/// Tracked separately from `sched::current()`'s `ThreadId` because there is
/// not yet a global thread table to map one to the other; set alongside
/// `sched::set_current` on every context switch.
static CURRENT_PID: NullLock<u32> = NullLock::new(0);

pub fn set_current_pid(pid: u32) {
    CURRENT_PID.lock(|p| *p = pid);
}

pub fn current_pid() -> u32 {
    CURRENT_PID.lock(|p| *p)
}
