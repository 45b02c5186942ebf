/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Directory name lookup cache: a small cache from `(parent vnode,
//! component name)` to a resolved `VnodeKey`, sparing a repeat
//! `vfs_lookup` IPC round trip for hot paths (shells re-walking `$PATH`,
//! repeated `stat` on the same file). Purge is best-effort: a cache miss
//! just falls through to the real lookup, so a missed invalidation is
//! never worse than a cold cache, matching the source's commented-out
//! protection-flag and purge `FIXME`s being treated as best-effort
//! operations rather than invariants to enforce.

use super::VnodeKey;
use crate::sync::{Mutex, NullLock};
use alloc::collections::BTreeMap;
use alloc::string::String;

const MAX_ENTRIES: usize = 256;

struct Dnlc {
    entries: BTreeMap<(VnodeKey, String), VnodeKey>,
}

static DNLC: NullLock<Dnlc> = NullLock::new(Dnlc {
    entries: BTreeMap::new(),
});

pub fn lookup(parent: VnodeKey, name: &str) -> Option<VnodeKey> {
    DNLC.lock(|d| d.entries.get(&(parent, String::from(name))).copied())
}

pub fn enter(parent: VnodeKey, name: &str, resolved: VnodeKey) {
    DNLC.lock(|d| {
        if d.entries.len() >= MAX_ENTRIES {
            if let Some(k) = d.entries.keys().next().cloned() {
                d.entries.remove(&k);
            }
        }
        d.entries.insert((parent, String::from(name)), resolved);
    });
}

/// Drop every entry naming `vnode`, either as parent or as the resolved
/// target, e.g. on rename or unlink. Best-effort: callers do not depend
/// on this being exhaustive for correctness, only for freshness.
pub fn purge(vnode: VnodeKey) {
    DNLC.lock(|d| {
        d.entries.retain(|(parent, _), resolved| *parent != vnode && *resolved != vnode);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn enter_then_lookup_round_trips() {
        let parent = VnodeKey { superblock: 0, inode: 1 };
        let child = VnodeKey { superblock: 0, inode: 2 };
        enter(parent, "bin", child);
        assert_eq!(lookup(parent, "bin"), Some(child));
        purge(child);
        assert_eq!(lookup(parent, "bin"), None);
    }
}
