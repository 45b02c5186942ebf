/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Per-thread CPU-time accounting, sampled from the hardclock tick
//! rather than a separate high-resolution timestamp, matching the
//! jiffy-granularity the timing wheel already works in.

use super::sched::ThreadId;
use crate::sync::{Mutex, NullLock};
use alloc::collections::BTreeMap;

#[derive(Default, Clone, Copy)]
pub struct Usage {
    pub user_ticks: u64,
    pub system_ticks: u64,
}

static USAGE: NullLock<BTreeMap<u32, Usage>> = NullLock::new(BTreeMap::new());

pub fn charge_user(tid: ThreadId, ticks: u64) {
    USAGE.lock(|m| m.entry(tid.0).or_default().user_ticks += ticks);
}

pub fn charge_system(tid: ThreadId, ticks: u64) {
    USAGE.lock(|m| m.entry(tid.0).or_default().system_ticks += ticks);
}

pub fn usage_of(tid: ThreadId) -> Usage {
    USAGE.lock(|m| m.get(&tid.0).copied().unwrap_or_default())
}

pub fn forget(tid: ThreadId) {
    USAGE.lock(|m| {
        m.remove(&tid.0);
    });
}
