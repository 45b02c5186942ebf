/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Message-port IPC: typed fixed-size request/reply messages carrying
//! scatter-gather I/O vectors, backlog slots assigning per-connection
//! message ids, and the `CMD_ABORT` cancellation protocol.

use crate::kqueue::{Filter, Kqueue};
use crate::proc::rendez::Rendez;
use alloc::collections::VecDeque;
use alloc::vec::Vec;
use snafu::Snafu;

pub const MAX_BACKLOG: usize = 32;
pub const CMD_ABORT: u32 = u32::MAX;

#[derive(Debug, Snafu)]
pub enum IpcError {
    Interrupted,
    BacklogFull,
    NoSuchMessage,
    AlreadyAborted,
    Fault,
}

#[derive(Debug, Copy, Clone)]
pub struct IoVec {
    pub base: u32,
    pub len: u32,
}

/// Resolve a byte `offset` into an iov array to (index, within-iov
/// offset, bytes remaining in total).
pub fn seekiov(iov: &[IoVec], offset: u32) -> Option<(usize, u32, u32)> {
    let mut remaining = offset;
    let total: u32 = iov.iter().map(|v| v.len).sum();
    if offset > total {
        return None;
    }
    for (i, v) in iov.iter().enumerate() {
        if remaining < v.len {
            return Some((i, remaining, total - offset));
        }
        remaining -= v.len;
    }
    Some((iov.len(), 0, 0))
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IpcMode {
    /// Peer is the kernel itself: plain copy.
    Kucopy,
    /// User-to-user: routed through `arch::pmap::ipcopy_out`.
    Ipcopy,
}

pub struct Msg {
    pub port: u32,
    pub reply_port: u32,
    pub msgid: i32,
    pub mode: IpcMode,
    pub source_address_space: u32,
    pub send_iov: Vec<IoVec>,
    pub recv_iov: Vec<IoVec>,
    pub command: u32,
    pub reply_status: i32,
    pub aborted: bool,
}

impl Msg {
    pub fn new(port: u32, reply_port: u32, mode: IpcMode, source_address_space: u32, command: u32) -> Self {
        Self {
            port,
            reply_port,
            msgid: -1,
            mode,
            source_address_space,
            send_iov: Vec::new(),
            recv_iov: Vec::new(),
            command,
            reply_status: 0,
            aborted: false,
        }
    }
}

pub struct MsgPort {
    pending: VecDeque<Msg>,
    pub rendez: Rendez,
    pub knotes: Kqueue,
}

impl MsgPort {
    pub const fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            rendez: Rendez::new(),
            knotes: Kqueue::new(),
        }
    }

    /// Steps 2 of `ksendmsg`'s contract: enqueue, wake waiters, notify
    /// `EVFILT_MSGPORT` knotes.
    fn enqueue(&mut self, msg: Msg) {
        let port = msg.port;
        self.pending.push_back(msg);
        self.rendez.wakeup_all();
        self.knotes.post(port, Filter::MsgPort, 0);
    }
}

/// Per-SuperBlock fixed-size table of in-flight messages; `msgid` is the
/// table index, assigned by the lowest free bit of `free_bitmap`.
pub struct MsgBacklog {
    slots: [Option<Msg>; MAX_BACKLOG],
    free_bitmap: u32,
}

impl MsgBacklog {
    pub const fn new() -> Self {
        const NONE: Option<Msg> = None;
        Self {
            slots: [NONE; MAX_BACKLOG],
            free_bitmap: u32::MAX,
        }
    }

    pub fn alloc_msgid(&mut self, mut msg: Msg) -> Result<i32, IpcError> {
        if self.free_bitmap == 0 {
            return Err(IpcError::BacklogFull);
        }
        let idx = self.free_bitmap.trailing_zeros() as usize;
        self.free_bitmap &= !(1 << idx);
        msg.msgid = idx as i32;
        self.slots[idx] = Some(msg);
        Ok(idx as i32)
    }

    /// Validates in-range AND not-free before dereferencing.
    pub fn msgid_to_msg(&mut self, msgid: i32) -> Result<&mut Msg, IpcError> {
        if msgid < 0 || msgid as usize >= MAX_BACKLOG || self.free_bitmap & (1 << msgid) != 0 {
            return Err(IpcError::NoSuchMessage);
        }
        Ok(self.slots[msgid as usize].as_mut().unwrap())
    }

    pub fn free_msgid(&mut self, msgid: i32) {
        if (0..MAX_BACKLOG as i32).contains(&msgid) {
            self.slots[msgid as usize] = None;
            self.free_bitmap |= 1 << msgid;
        }
    }
}

/// `ksendmsg`: populate, enqueue on `port`, then block on the caller's
/// own reply port until `sys_replymsg` delivers a reply (or the wait is
/// interrupted, in which case the caller is responsible for calling
/// `kabortmsg`).
pub fn ksendmsg(port: &mut MsgPort, reply_port: &mut MsgPort, mut msg: Msg) -> Result<i32, IpcError> {
    msg.msgid = -1;
    port.enqueue(msg);
    reply_port.rendez.task_sleep();
    let replied = reply_port.pending.pop_front().ok_or(IpcError::NoSuchMessage)?;
    Ok(replied.reply_status)
}

/// Abort protocol: unlink from the pending queue if not yet received,
/// otherwise re-enqueue the same message with `CMD_ABORT` so the server
/// sees the cancellation under the same msgid it already assigned.
pub fn kabortmsg(port: &mut MsgPort, backlog: &mut MsgBacklog, msgid: i32) -> Result<(), IpcError> {
    if msgid < 0 {
        // Not yet received: unlink from the pending queue by identity is
        // the caller's job (it holds the only reference before enqueue
        // completes); nothing further to do here.
        return Ok(());
    }
    let msg = backlog.msgid_to_msg(msgid)?;
    if msg.aborted {
        return Err(IpcError::AlreadyAborted);
    }
    msg.aborted = true;
    msg.command = CMD_ABORT;
    let resend = Msg {
        port: msg.port,
        reply_port: msg.reply_port,
        msgid,
        mode: msg.mode,
        source_address_space: msg.source_address_space,
        send_iov: msg.send_iov.clone(),
        recv_iov: msg.recv_iov.clone(),
        command: CMD_ABORT,
        reply_status: 0,
        aborted: true,
    };
    port.enqueue(resend);
    Ok(())
}

/// Server side: either a previously-unseen pending message (assigned a
/// fresh msgid) or `None` if nothing is pending. Non-blocking; callers
/// compose with `kqueue` for blocking semantics.
pub fn sys_getmsg(port: &mut MsgPort, backlog: &mut MsgBacklog) -> Result<Option<i32>, IpcError> {
    let Some(msg) = port.pending.pop_front() else {
        return Ok(None);
    };
    if msg.msgid >= 0 {
        // CMD_ABORT re-send: the msgid is already assigned in the backlog.
        return Ok(Some(msg.msgid));
    }
    backlog.alloc_msgid(msg).map(Some)
}

/// `sys_replymsg`: store status, hand the message back to the caller's
/// reply port, and free the msgid for immediate reuse.
pub fn sys_replymsg(
    backlog: &mut MsgBacklog,
    reply_port: &mut MsgPort,
    msgid: i32,
    status: i32,
) -> Result<(), IpcError> {
    let mut msg = {
        let slot = backlog.msgid_to_msg(msgid)?;
        slot.reply_status = status;
        backlog.slots[msgid as usize].take().unwrap()
    };
    backlog.free_msgid(msgid);
    msg.msgid = -1;
    reply_port.enqueue(msg);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn seekiov_finds_offset_inside_second_vector() {
        let iov = [IoVec { base: 0, len: 10 }, IoVec { base: 100, len: 10 }];
        let (idx, within, remaining) = seekiov(&iov, 12).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(within, 2);
        assert_eq!(remaining, 8);
    }

    #[test_case]
    fn backlog_alloc_then_free_recycles_lowest_id() {
        let mut backlog = MsgBacklog::new();
        let id0 = backlog.alloc_msgid(Msg::new(1, 2, IpcMode::Kucopy, 0, 0)).unwrap();
        let id1 = backlog.alloc_msgid(Msg::new(1, 2, IpcMode::Kucopy, 0, 0)).unwrap();
        assert_eq!(id0, 0);
        assert_eq!(id1, 1);
        backlog.free_msgid(id0);
        let id2 = backlog.alloc_msgid(Msg::new(1, 2, IpcMode::Kucopy, 0, 0)).unwrap();
        assert_eq!(id2, 0);
    }
}
