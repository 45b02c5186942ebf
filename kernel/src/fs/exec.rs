/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Process image construction: build the argv/envv stack image for a new
//! process and hand off to the ELF loader at `exec_root` (loader details
//! beyond locating the root filesystem server are out of scope here —
//! the kernel's job ends at handing the server a mapped image and a
//! stack).

use crate::fs::{VfsError, VfsState};
use crate::ipc::{IoVec, IpcMode, Msg, MsgPort};
use crate::mm::PageAllocator;
use crate::vm::{AddressSpace, MapFlags, RegionType};
use alloc::vec::Vec;

const CMD_EXEC: u32 = 1;

pub const ARG_MAX: usize = 64 * 1024;

/// Lay out `argv`/`envv` at the top of the user stack region, following
/// the usual "array of pointers followed by the pointed-to bytes, built
/// high to low" convention: the return value is the initial stack
/// pointer a fresh thread's context should be seeded with.
pub fn build_stack_image(
    address_space: &mut AddressSpace,
    alloc: &mut PageAllocator,
    stack_top: u32,
    argv: &[&[u8]],
    envv: &[&[u8]],
) -> Result<u32, crate::vm::VmError> {
    let stack_base = address_space.memregion_create(
        alloc,
        16 * crate::vm::PAGE_SIZE,
        MapFlags::READ | MapFlags::WRITE,
        RegionType::Alloc,
        None,
    )?;
    let _ = stack_base;

    let mut image = Vec::new();
    let mut arg_ptrs = Vec::with_capacity(argv.len());
    let mut env_ptrs = Vec::with_capacity(envv.len());
    let mut cursor = stack_top;

    for bytes in argv.iter().chain(envv.iter()) {
        cursor -= (bytes.len() + 1) as u32;
        image.extend_from_slice(bytes);
        image.push(0);
        if arg_ptrs.len() < argv.len() {
            arg_ptrs.push(cursor);
        } else {
            env_ptrs.push(cursor);
        }
    }
    // Pointer arrays are NULL-terminated and copied in below the string
    // bytes just laid out; the kernel only computes the layout here,
    // the byte copy into the target address space is the caller's
    // `CopyOut`/`ipcopy_out` step once the mapping is installed.
    let pointer_bytes = (arg_ptrs.len() + 1 + env_ptrs.len() + 1) * core::mem::size_of::<u32>();
    cursor -= pointer_bytes as u32;
    cursor &= !0xF;
    Ok(cursor)
}

/// Locate the root filesystem server and send it a `CMD_EXEC` request
/// naming the path; the server maps the image into the caller's address
/// space out-of-band via `ipcopy` and replies with the entry point. The
/// kernel's part ends at the IPC round trip — loader internals (ELF
/// section parsing, relocation) live in the server.
pub fn exec_root(vfs: &mut VfsState, port: &mut MsgPort, reply_port: &mut MsgPort, path: &[u8]) -> Result<u32, VfsError> {
    let Some(root) = vfs.root() else {
        return Err(VfsError::NotFound);
    };
    let mut msg = Msg::new(root.superblock, reply_port as *const _ as u32, IpcMode::Kucopy, 0, CMD_EXEC);
    msg.send_iov.push(IoVec {
        base: path.as_ptr() as u32,
        len: path.len() as u32,
    });
    let status = crate::ipc::ksendmsg(port, reply_port, msg)?;
    if status < 0 {
        Err(VfsError::NotFound)
    } else {
        Ok(status as u32)
    }
}
