/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

#[cfg(any(feature = "rpi1", feature = "rpi2"))]
pub mod raspberrypi;

#[cfg(any(feature = "rpi1", feature = "rpi2"))]
pub use raspberrypi::*;
