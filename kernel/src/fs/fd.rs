/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Open-file objects and the per-process file-descriptor table. A `Filp`
//! carries a seek offset, open flags, and a tagged pointer to exactly
//! one of {Vnode, SuperBlock, KQueue, ISRHandler} — modelled here as an
//! enum rather than a raw tagged union, since every referent already has
//! a plain integer handle (vnode key, superblock id, ...).

use super::VnodeKey;
use alloc::vec::Vec;

bitflags::bitflags! {
    pub struct OpenFlags: u32 {
        const READ   = 0b0001;
        const WRITE  = 0b0010;
        const APPEND = 0b0100;
        const NONBLOCK = 0b1000;
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FilpTarget {
    Vnode(VnodeKey),
    SuperBlock(u32),
    KQueue(u32),
    IsrHandler(u32),
}

pub struct Filp {
    pub target: FilpTarget,
    pub offset: u64,
    pub flags: OpenFlags,
    pub reference_count: u32,
}

/// Per-process table mapping small integers to `Filp`s. `dup`/`dup2`
/// bump `reference_count` on the shared `Filp` rather than copying it,
/// so seek offset and flags stay shared between the duplicate
/// descriptors, matching POSIX `dup` semantics.
pub struct FdTable {
    slots: Vec<Option<Filp>>,
    free: Vec<u32>,
}

impl FdTable {
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub fn install(&mut self, filp: Filp) -> u32 {
        if let Some(fd) = self.free.pop() {
            self.slots[fd as usize] = Some(filp);
            fd
        } else {
            self.slots.push(Some(filp));
            (self.slots.len() - 1) as u32
        }
    }

    pub fn get_mut(&mut self, fd: u32) -> Option<&mut Filp> {
        self.slots.get_mut(fd as usize).and_then(|s| s.as_mut())
    }

    /// Drops one reference; the slot is freed (and the `Filp` dropped,
    /// releasing its referent) only once the count reaches zero.
    pub fn close(&mut self, fd: u32) {
        let drop_now = match self.slots.get_mut(fd as usize) {
            Some(Some(filp)) => {
                filp.reference_count -= 1;
                filp.reference_count == 0
            }
            _ => false,
        };
        if drop_now {
            self.slots[fd as usize] = None;
            self.free.push(fd);
        }
    }

    pub fn dup(&mut self, fd: u32) -> Option<u32> {
        if let Some(Some(filp)) = self.slots.get_mut(fd as usize) {
            filp.reference_count += 1;
            let target = filp.target;
            let offset = filp.offset;
            let flags = filp.flags;
            let reference_count = filp.reference_count;
            return Some(self.install(Filp {
                target,
                offset,
                flags,
                reference_count,
            }));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn install_then_close_frees_the_slot_for_reuse() {
        let mut table = FdTable::new();
        let fd = table.install(Filp {
            target: FilpTarget::SuperBlock(1),
            offset: 0,
            flags: OpenFlags::READ,
            reference_count: 1,
        });
        table.close(fd);
        assert!(table.get_mut(fd).is_none());
        let fd2 = table.install(Filp {
            target: FilpTarget::SuperBlock(2),
            offset: 0,
            flags: OpenFlags::READ,
            reference_count: 1,
        });
        assert_eq!(fd, fd2);
    }
}
