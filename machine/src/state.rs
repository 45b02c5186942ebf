/*
 * SPDX-License-Identifier: MIT OR BlueOak-1.0.0
 * Copyright (c) 2020-2022 Andre Richter <andre.o.richter@gmail.com>
 * Original code distributed under MIT, additional changes are under BlueOak-1.0.0
 */

//! Coarse boot-phase tracking, used to gate writes to [`crate::synchronization::InitStateLock`].
//!
//! The kernel runs single-threaded with interrupts masked until it has built its
//! first address space and is about to drop into the scheduler; that point is
//! the `SingleCoreMain` -> `Kernel` transition below.

use core::sync::atomic::{AtomicU8, Ordering};

#[derive(Copy, Clone, Eq, PartialEq)]
enum State {
    Init = 0,
    SingleCoreMain = 1,
    Kernel = 2,
}

struct StateManager(AtomicU8);

static STATE_MANAGER: StateManager = StateManager::new();

impl StateManager {
    const fn new() -> Self {
        Self(AtomicU8::new(State::Init as u8))
    }

    fn state(&self) -> State {
        match self.0.load(Ordering::Acquire) {
            0 => State::Init,
            1 => State::SingleCoreMain,
            _ => State::Kernel,
        }
    }

    /// True while the system has not yet finished single-threaded bring-up.
    pub fn is_init(&self) -> bool {
        self.state() == State::Init
    }

    /// Called once bring-up code starts executing with a stack and a console.
    pub fn transition_to_single_core_main(&self) {
        assert!(self.is_init());
        self.0.store(State::SingleCoreMain as u8, Ordering::Release);
    }

    /// Called once the scheduler takes over and preemption of user mode begins.
    pub fn transition_to_kernel(&self) {
        assert!(self.state() == State::SingleCoreMain);
        self.0.store(State::Kernel as u8, Ordering::Release);
    }
}

/// Returns the global boot-phase tracker.
pub fn state_manager() -> &'static StateManager {
    &STATE_MANAGER
}
