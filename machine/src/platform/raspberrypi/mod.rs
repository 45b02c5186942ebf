/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

#![allow(dead_code)]

pub mod device_driver;
pub mod drivers;
pub mod memory;

/// See BCM2835-ARM-Peripherals.pdf
/// See <https://www.raspberrypi.org/forums/viewtopic.php?t=186090> for more details.

pub struct BcmHost;

// Per <https://www.raspberrypi.com/documentation/computers/raspberry-pi.html#peripheral-addresses>:
//
// SoC     Peripheral Address	Peripheral Size	SDRAM Address	Source
// BCM2835 0x20000000           0x01000000      0x40000000      <https://github.com/raspberrypi/linux/blob/7f465f823c2ecbade5877b8bbcb2093a8060cb0e/arch/arm/boot/dts/bcm2835.dtsi#L21>
// BCM2836 0x3f000000           0x01000000      0xc0000000      <https://github.com/raspberrypi/linux/blob/7f465f823c2ecbade5877b8bbcb2093a8060cb0e/arch/arm/boot/dts/bcm2836.dtsi#L10>

// <https://www.raspberrypi.com/documentation/computers/processors.html>
// The BCM2835 (ARM1176JZF-S, ARMv6) is the chip used in the Raspberry Pi 1, Zero, and Compute Module.
// The BCM2836 (Cortex-A7, ARMv7-A) is used in the Raspberry Pi 2 Model B.

// Machine  Board  Chip
// rpi1     raspi  bcm2835
// rpi2     raspi  bcm2836

impl BcmHost {
    /// At which address to load the kernel binary.
    pub const fn kernel_load_address() -> u64 {
        0x8_0000
    }

    /// As per <https://www.raspberrypi.org/forums/viewtopic.php?p=1170522#p1170522>
    pub fn bus2phys(bus: usize) -> usize {
        bus & !0xc000_0000
    }

    pub fn phys2bus(phys: usize) -> usize {
        phys | 0xc000_0000
    }
}

// RasPi1 (ARM1176JZF-S / ARMv6, BCM2835)
#[cfg(feature = "rpi1")]
impl BcmHost {
    /// Name of the hardware device this BcmHost is compiled for.
    pub const fn board_name() -> &'static str {
        "Raspberry Pi 1"
    }

    /// This returns the ARM-side physical address where peripherals are mapped.
    pub const fn get_peripheral_address() -> usize {
        0x2000_0000
    }

    /// This returns the size of the peripherals' space.
    pub const fn get_peripheral_size() -> usize {
        0x0100_0000
    }

    /// This returns the bus address of the SDRAM.
    pub const fn get_sdram_address() -> usize {
        0x4000_0000 // uncached
    }
}

// RasPi2 (Cortex-A7 / ARMv7-A, BCM2836)
#[cfg(feature = "rpi2")]
impl BcmHost {
    /// Name of the hardware device this BcmHost is compiled for.
    pub const fn board_name() -> &'static str {
        "Raspberry Pi 2"
    }

    /// This returns the ARM-side physical address where peripherals are mapped.
    pub const fn get_peripheral_address() -> usize {
        0x3f00_0000
    }

    /// This returns the size of the peripherals' space.
    pub const fn get_peripheral_size() -> usize {
        0x0100_0000
    }

    /// This returns the bus address of the SDRAM.
    pub const fn get_sdram_address() -> usize {
        0xc000_0000 // uncached
    }
}
