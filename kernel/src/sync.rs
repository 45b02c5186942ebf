/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Re-exports of `machine`'s single-core lock primitives under the names the
//! rest of this crate already used. The Big Kernel Lock itself (`proc::sched::Bkl`)
//! is not a spinlock and lives in `proc::sched` — these are for the few
//! statics (free lists, tables) that need interior mutability before or
//! outside of BKL-guarded code.

pub use machine::synchronization::{
    interface::{Mutex, ReadWriteEx},
    IRQSafeNullLock as NullLock, InitStateLock,
};
