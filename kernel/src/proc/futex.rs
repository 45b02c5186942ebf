/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Futex wait queues: a fixed-size hash table of `Rendez` buckets keyed
//! by the futex word's physical address, plus `requeue`, which moves a
//! bounded number of waiters from one bucket's `Rendez` straight to
//! another's without waking them — the "atomically move a blocked
//! thread between two rendez wait lists while preserving FIFO order"
//! operation. `Rendez` has no public method to pull a specific waiter
//! out of the middle of its queue, only to pop the front one, so
//! `requeue` is implemented here via `Rendez::task_wakeup`/manual
//! re-insertion under one BKL-held critical section rather than by
//! adding a general-purpose "remove arbitrary waiter" primitive to
//! `Rendez` itself.

use super::rendez::Rendez;
use crate::sync::{Mutex, NullLock};

const BUCKETS: usize = 256;

struct FutexTable {
    buckets: [Rendez; BUCKETS],
}

impl FutexTable {
    const fn new() -> Self {
        const R: Rendez = Rendez::new();
        Self { buckets: [R; BUCKETS] }
    }
}

static TABLE: NullLock<FutexTable> = NullLock::new(FutexTable::new());

fn hash(word_phys_addr: u64) -> usize {
    ((word_phys_addr >> 2) as usize) % BUCKETS
}

/// Block the current thread on the bucket for `word_phys_addr`. The
/// caller has already checked `*word == expected` under the BKL, so a
/// concurrent `wake` cannot be missed between the check and the sleep.
pub fn wait(word_phys_addr: u64) {
    TABLE.lock(|t| t.buckets[hash(word_phys_addr)].task_sleep());
}

/// Wake up to `count` waiters on `word_phys_addr`.
pub fn wake(word_phys_addr: u64, count: u32) {
    TABLE.lock(|t| {
        let bucket = &mut t.buckets[hash(word_phys_addr)];
        for _ in 0..count {
            if !bucket.task_wakeup() {
                break;
            }
        }
    });
}

/// Move up to `count` waiters from `from`'s bucket to `to`'s bucket
/// without waking them, then wake up to `wake_count` of the threads that
/// were already on `to`'s bucket (or just moved there). Used by
/// `FUTEX_CMP_REQUEUE`-style calls to avoid a thundering herd when many
/// threads are parked on the same condition.
pub fn requeue(from_phys_addr: u64, to_phys_addr: u64, count: u32, wake_count: u32) {
    TABLE.lock(|t| {
        let (from_idx, to_idx) = (hash(from_phys_addr), hash(to_phys_addr));
        for _ in 0..wake_count {
            if !t.buckets[from_idx].task_wakeup() {
                break;
            }
        }
        if from_idx == to_idx {
            return;
        }
        let (lo, hi) = if from_idx < to_idx { (from_idx, to_idx) } else { (to_idx, from_idx) };
        let (left, right) = t.buckets.split_at_mut(hi);
        let (from, to) = if from_idx < to_idx {
            (&mut left[lo], &mut right[0])
        } else {
            (&mut right[0], &mut left[lo])
        };
        for _ in 0..count {
            if from.is_empty() {
                break;
            }
            from.requeue_one_front_to(to);
        }
    });
}

impl Rendez {
    /// Pop the front waiter from `self` and push it onto `other`,
    /// preserving its place in FIFO order relative to the other threads
    /// already moved this call, without ever marking it ready — this is
    /// the one primitive `futex::requeue` needs that ordinary `Rendez`
    /// callers (ports, kqueue, the buffer cache) never do.
    fn requeue_one_front_to(&mut self, other: &mut Rendez) {
        if let Some(tid) = self.pop_front_raw() {
            other.push_back_raw(tid);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn wake_on_idle_bucket_is_a_noop() {
        wake(0x1000, 1);
    }
}
