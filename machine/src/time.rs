/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Cheviot Project Contributors
 */

//! Uptime as read from the BCM system timer's free-running microsecond
//! counter. `kernel`'s hardclock drives the timing wheel off
//! a periodic IRQ on one of the timer's compare channels; this module only
//! exposes the raw counter, used here for boot-banner timestamps
//! (`info!`/`warn!`) and busy-wait delays during device bring-up.

use core::time::Duration;

pub struct TimeManager;

static TIME_MANAGER: TimeManager = TimeManager::new();

impl TimeManager {
    const fn new() -> Self {
        Self
    }

    /// Time elapsed since the counter started, i.e. since power-on.
    pub fn uptime(&self) -> Duration {
        #[cfg(any(feature = "rpi1", feature = "rpi2"))]
        {
            Duration::from_micros(crate::platform::drivers::system_timer().free_running_counter_micros())
        }
        #[cfg(not(any(feature = "rpi1", feature = "rpi2")))]
        {
            Duration::ZERO
        }
    }

    /// Busy-wait for `duration`, used during device bring-up before the
    /// scheduler and timing wheel exist.
    pub fn spin_for(&self, duration: Duration) {
        let target = self.uptime() + duration;
        while self.uptime() < target {
            crate::cpu::nop();
        }
    }
}

pub fn time_manager() -> &'static TimeManager {
    &TIME_MANAGER
}
