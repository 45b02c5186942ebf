/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! The PID table. One namespace of small integers shared by processes,
//! threads, process groups, and sessions, distinguished by a kind flag
//! rather than separate tables, so a process-group id and a thread id
//! can never collide even though both are ordinary table indices.

use crate::sync::{Mutex, NullLock};
use alloc::vec::Vec;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PidKind {
    Process,
    Thread,
    ProcessGroup,
    Session,
}

struct PidDesc {
    kind: PidKind,
    refcount: u32,
}

struct PidTable {
    descs: Vec<Option<PidDesc>>,
    free: Vec<u32>,
}

static PIDS: NullLock<PidTable> = NullLock::new(PidTable {
    descs: Vec::new(),
    free: Vec::new(),
});

/// Allocate a fresh id of `kind` with one reference held by the caller.
pub fn alloc(kind: PidKind) -> u32 {
    PIDS.lock(|t| {
        let id = match t.free.pop() {
            Some(id) => {
                t.descs[id as usize] = Some(PidDesc { kind, refcount: 1 });
                id
            }
            None => {
                t.descs.push(Some(PidDesc { kind, refcount: 1 }));
                (t.descs.len() - 1) as u32
            }
        };
        id
    })
}

pub fn kind_of(id: u32) -> Option<PidKind> {
    PIDS.lock(|t| t.descs.get(id as usize).and_then(|d| d.as_ref()).map(|d| d.kind))
}

pub fn incref(id: u32) {
    PIDS.lock(|t| {
        if let Some(Some(d)) = t.descs.get_mut(id as usize) {
            d.refcount += 1;
        }
    });
}

/// Drop a reference; the id is returned to the free list once the count
/// reaches zero, e.g. once a session's last member process exits.
pub fn decref(id: u32) {
    PIDS.lock(|t| {
        let free_now = match t.descs.get_mut(id as usize) {
            Some(Some(d)) => {
                d.refcount -= 1;
                d.refcount == 0
            }
            _ => false,
        };
        if free_now {
            t.descs[id as usize] = None;
            t.free.push(id);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn alloc_then_full_decref_recycles_the_id() {
        let id = alloc(PidKind::Thread);
        assert_eq!(kind_of(id), Some(PidKind::Thread));
        decref(id);
        assert_eq!(kind_of(id), None);
    }
}
