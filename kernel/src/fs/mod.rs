/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Virtual filesystem switch and unified page cache: the vnode cache,
//! mount-point graph, and per-vnode buffer list with write-behind
//! (`bawrite`) and delayed-write (`bdwrite`) disciplines, plus the
//! per-mount flusher task.

pub mod dnlc;
pub mod exec;
pub mod fd;
pub mod pipe;

use crate::ipc::{IpcError, MsgBacklog, MsgPort};
use crate::proc::rendez::Rendez;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use snafu::Snafu;

pub const PAGE_SIZE: u32 = crate::arch::pmap::PAGE_SIZE;
pub const DELWRI_DELAY_TICKS: u64 = crate::proc::timer::JIFFIES_PER_SECOND * 30;

#[derive(Debug, Snafu)]
pub enum VfsError {
    NotFound,
    NotADirectory,
    Ipc,
    Busy,
}

impl From<IpcError> for VfsError {
    fn from(_: IpcError) -> Self {
        VfsError::Ipc
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct VnodeKey {
    pub superblock: u32,
    pub inode: u64,
}

bitflags::bitflags! {
    pub struct BufFlags: u32 {
        const VALID  = 0b000001;
        const BUSY   = 0b000010;
        const DELWRI = 0b000100;
        const ASYNC  = 0b001000;
        const ERROR  = 0b010000;
        const DISCARD = 0b100000;
    }
}

/// A page-sized buffer bound to `(Vnode, page-aligned file offset)`.
pub struct Buf {
    pub vnode: VnodeKey,
    pub offset: u64,
    pub flags: BufFlags,
    pub expiration: u64,
    pub data: Vec<u8>,
}

pub struct Vnode {
    pub key: VnodeKey,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub reference_count: u32,
    pub is_root: bool,
    pub mounted_here: Option<u32>,
    pub covered_by: Option<VnodeKey>,
    pub dirty: Vec<(u64, BufFlags)>,
    pub pending: Vec<(u64, BufFlags)>,
    pub rendez: Rendez,
}

impl Vnode {
    fn new(key: VnodeKey) -> Self {
        Self {
            key,
            mode: 0,
            uid: 0,
            gid: 0,
            size: 0,
            reference_count: 1,
            is_root: false,
            mounted_here: None,
            covered_by: None,
            dirty: Vec::new(),
            pending: Vec::new(),
            rendez: Rendez::new(),
        }
    }
}

/// A mounted server: a `MsgPort`, its message backlog, the root vnode of
/// the mount, and the per-mount flusher.
pub struct SuperBlock {
    pub id: u32,
    pub port: MsgPort,
    pub backlog: MsgBacklog,
    pub root_inode: u64,
    pub block_size: u32,
    pub device_id: u32,
    pub readonly: bool,
    pub bdflush_rendez: Rendez,
}

/// The vnode cache, keyed by `(SuperBlock, inode)`, and the buffer hash
/// table, keyed by `(inode, offset / PAGE_SIZE) mod BUF_HASH`.
pub struct VfsState {
    vnodes: BTreeMap<VnodeKey, Vnode>,
    bufs: BTreeMap<(VnodeKey, u64), Buf>,
    superblocks: BTreeMap<u32, SuperBlock>,
    root: Option<VnodeKey>,
}

impl VfsState {
    pub const fn new() -> Self {
        Self {
            vnodes: BTreeMap::new(),
            bufs: BTreeMap::new(),
            superblocks: BTreeMap::new(),
            root: None,
        }
    }

    pub fn root(&self) -> Option<VnodeKey> {
        self.root
    }

    pub fn vnode_for(&mut self, key: VnodeKey) -> &mut Vnode {
        self.vnodes.entry(key).or_insert_with(|| Vnode::new(key))
    }

    /// `sys_createmsgport`: mount a fresh `SuperBlock` atop `covered`,
    /// linking `vnode_covered`/`vnode_mounted_here`.
    pub fn createmsgport(&mut self, sb: SuperBlock, covered: VnodeKey) {
        let sb_id = sb.id;
        let root_key = VnodeKey {
            superblock: sb_id,
            inode: sb.root_inode,
        };
        self.superblocks.insert(sb_id, sb);
        {
            let root = self.vnode_for(root_key);
            root.is_root = true;
            root.covered_by = Some(covered);
        }
        self.vnode_for(covered).mounted_here = Some(sb_id);
    }

    /// `sys_pivotroot`: relocate `/`, making the current root reachable
    /// through `old_root`.
    pub fn pivot_root(&mut self, new_root: VnodeKey, old_root: VnodeKey) {
        if let Some(current) = self.root.replace(new_root) {
            self.vnode_for(old_root).covered_by = Some(current);
        }
    }

    /// Resolve one path component against the mount graph: "." to self,
    /// ".." across a mount root to the covered vnode's parent, otherwise
    /// a lookup against the owning superblock (left to the caller, which
    /// issues the `vfs_lookup` IPC and supplies the resulting key).
    pub fn walk_component(&mut self, from: VnodeKey, component: &str) -> Result<VnodeKey, VfsError> {
        match component {
            "." => Ok(from),
            ".." => {
                let vnode = self.vnodes.get(&from).ok_or(VfsError::NotFound)?;
                if vnode.is_root {
                    vnode.covered_by.ok_or(VfsError::NotFound)
                } else {
                    Err(VfsError::NotFound)
                }
            }
            _ => Err(VfsError::NotFound),
        }
    }

    /// Follow `vnode_mounted_here` downward once a component resolves to
    /// a mount point, so the caller always lands on the mount's root.
    pub fn descend_mounts(&self, mut key: VnodeKey) -> VnodeKey {
        while let Some(sb_id) = self.vnodes.get(&key).and_then(|v| v.mounted_here) {
            if let Some(sb) = self.superblocks.get(&sb_id) {
                key = VnodeKey {
                    superblock: sb_id,
                    inode: sb.root_inode,
                };
            } else {
                break;
            }
        }
        key
    }

    /// `bread`: look up or allocate the `Buf` for `(vnode, offset)`,
    /// sleeping on its rendez while `BUSY`.
    pub fn bread(&mut self, vnode: VnodeKey, offset: u64) -> &mut Buf {
        self.bufs.entry((vnode, offset)).or_insert_with(|| Buf {
            vnode,
            offset,
            flags: BufFlags::empty(),
            expiration: 0,
            data: alloc::vec![0u8; PAGE_SIZE as usize],
        })
    }

    pub fn brelse(&mut self, vnode: VnodeKey, offset: u64) {
        if let Some(buf) = self.bufs.get_mut(&(vnode, offset)) {
            buf.flags.remove(BufFlags::BUSY);
        }
    }

    /// A write that stops before page end: mark `B_DELWRI`, set an
    /// expiration, insert onto the vnode's delayed list, release
    /// immediately.
    pub fn bdwrite(&mut self, vnode: VnodeKey, offset: u64, now: u64) {
        if let Some(buf) = self.bufs.get_mut(&(vnode, offset)) {
            buf.flags.insert(BufFlags::DELWRI);
            buf.expiration = now + DELWRI_DELAY_TICKS;
        }
        self.vnode_for(vnode).dirty.push((offset, BufFlags::DELWRI));
    }

    /// A write that reaches page end: mark `B_ASYNC|B_WRITE`, append to
    /// the pending list, wake the mount's bdflush.
    pub fn bawrite(&mut self, vnode: VnodeKey, offset: u64) {
        if let Some(buf) = self.bufs.get_mut(&(vnode, offset)) {
            buf.flags.insert(BufFlags::ASYNC);
        }
        self.vnode_for(vnode).pending.push((offset, BufFlags::ASYNC));
        if let Some(sb) = self.superblocks.get_mut(&vnode.superblock) {
            sb.bdflush_rendez.wakeup_all();
        }
    }

    /// `bsync`: move every delayed buf whose expiration has arrived onto
    /// the pending list, then drain the pending list. Returns the first
    /// non-zero error encountered (none, here — the actual `CMD_WRITE`
    /// dispatch is the server-side IPC call, left to the caller).
    pub fn bsync(&mut self, vnode: VnodeKey, now: u64) -> Vec<u64> {
        self.vnode_for(vnode);
        let dirty = core::mem::take(&mut self.vnodes.get_mut(&vnode).unwrap().dirty);
        let bufs = &mut self.bufs;
        let (matured, still_dirty): (Vec<_>, Vec<_>) = dirty.into_iter().partition(|&(offset, _)| {
            bufs.get(&(vnode, offset)).map(|b| b.expiration <= now).unwrap_or(true)
        });
        self.vnodes.get_mut(&vnode).unwrap().dirty = still_dirty;
        for &(offset, _) in &matured {
            if let Some(buf) = self.bufs.get_mut(&(vnode, offset)) {
                buf.flags.remove(BufFlags::DELWRI);
                buf.flags.insert(BufFlags::ASYNC);
            }
        }
        let v = self.vnodes.get_mut(&vnode).unwrap();
        v.pending.extend(matured);
        v.pending.drain(..).map(|(o, _)| o).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn dot_dot_from_a_mount_root_ascends_to_covered_vnode() {
        let mut vfs = VfsState::new();
        let covered = VnodeKey { superblock: 0, inode: 1 };
        let root = VnodeKey { superblock: 1, inode: 2 };
        vfs.vnode_for(covered);
        {
            let r = vfs.vnode_for(root);
            r.is_root = true;
            r.covered_by = Some(covered);
        }
        assert_eq!(vfs.walk_component(root, "..").unwrap(), covered);
    }
}
