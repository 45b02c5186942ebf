/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Event queues: `kevent`'s knote table and the six filters a blocked
//! `kevent` call can wait on. A knote doesn't poll; whatever produces the
//! condition (a message arriving on a port, an IRQ firing, a vnode
//! changing) calls `Kqueue::post` directly, the same push model
//! `proc::rendez` uses for thread wakeups.

use crate::proc::rendez::Rendez;
use alloc::vec::Vec;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Filter {
    Read,
    Write,
    Vnode,
    MsgPort,
    Irq,
    ThreadEvent,
}

bitflags::bitflags! {
    pub struct EventFlags: u32 {
        const ADD     = 0b00001;
        const DELETE  = 0b00010;
        const ENABLE  = 0b00100;
        const DISABLE = 0b01000;
        const ONESHOT = 0b10000;
    }
}

#[derive(Debug, Copy, Clone)]
pub struct Event {
    pub ident: u32,
    pub filter: Filter,
    pub data: i64,
}

struct Knote {
    ident: u32,
    filter: Filter,
    enabled: bool,
    oneshot: bool,
    pending: Option<i64>,
}

/// One process's (or mount's) set of watched conditions, plus the
/// `Rendez` a blocking `kevent` call parks on until something is posted.
pub struct Kqueue {
    knotes: Vec<Knote>,
    pub rendez: Rendez,
}

impl Kqueue {
    pub const fn new() -> Self {
        Self {
            knotes: Vec::new(),
            rendez: Rendez::new(),
        }
    }

    pub fn register(&mut self, ident: u32, filter: Filter, flags: EventFlags) {
        if flags.contains(EventFlags::DELETE) {
            self.knotes.retain(|k| !(k.ident == ident && k.filter == filter));
            return;
        }
        if flags.contains(EventFlags::ADD) {
            self.knotes.push(Knote {
                ident,
                filter,
                enabled: !flags.contains(EventFlags::DISABLE),
                oneshot: flags.contains(EventFlags::ONESHOT),
                pending: None,
            });
            return;
        }
        for k in self.knotes.iter_mut().filter(|k| k.ident == ident && k.filter == filter) {
            if flags.contains(EventFlags::ENABLE) {
                k.enabled = true;
            }
            if flags.contains(EventFlags::DISABLE) {
                k.enabled = false;
            }
        }
    }

    /// Called by whatever produces a condition (IPC, irq, vfs) to mark a
    /// matching knote ready and wake anyone parked in `kevent`.
    pub fn post(&mut self, ident: u32, filter: Filter, data: i64) {
        for k in self.knotes.iter_mut().filter(|k| k.ident == ident && k.filter == filter && k.enabled) {
            k.pending = Some(data);
        }
        self.rendez.wakeup_all();
    }

    /// Drain every knote with a pending event, clearing oneshot knotes
    /// and the `pending` slot of persistent ones.
    pub fn collect(&mut self, out: &mut Vec<Event>) {
        let mut remove = Vec::new();
        for (i, k) in self.knotes.iter_mut().enumerate() {
            if let Some(data) = k.pending.take() {
                out.push(Event {
                    ident: k.ident,
                    filter: k.filter,
                    data,
                });
                if k.oneshot {
                    remove.push(i);
                }
            }
        }
        for i in remove.into_iter().rev() {
            self.knotes.remove(i);
        }
    }

    pub fn has_pending(&self) -> bool {
        self.knotes.iter().any(|k| k.pending.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn post_then_collect_returns_event_once_for_oneshot() {
        let mut kq = Kqueue::new();
        kq.register(7, Filter::MsgPort, EventFlags::ADD | EventFlags::ONESHOT);
        kq.post(7, Filter::MsgPort, 0);
        let mut events = Vec::new();
        kq.collect(&mut events);
        assert_eq!(events.len(), 1);
        kq.post(7, Filter::MsgPort, 0);
        let mut events2 = Vec::new();
        kq.collect(&mut events2);
        assert!(events2.is_empty());
    }
}
