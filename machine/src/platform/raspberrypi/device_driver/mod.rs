// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2022 Andre Richter <andre.o.richter@gmail.com>

//! Device driver.

mod bcm;

pub mod common;

pub use bcm::*;
pub use crate::exception::asynchronous::IRQNumber;
