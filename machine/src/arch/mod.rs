/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Cheviot Project Contributors
 */

//! Architecture-specific code. Only ARMv7-A (and the ARMv6 ARM1176 core used
//! by the Raspberry Pi 1, which implements the same short-descriptor MMU
//! format) is supported.

#[cfg(target_arch = "arm")]
mod armv7a;

#[cfg(target_arch = "arm")]
pub use armv7a::*;
