/*
 * SPDX-License-Identifier: MIT OR BlueOak-1.0.0
 * Copyright (c) 2018-2019 Andre Richter <andre.o.richter@gmail.com>
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 * Original code distributed under MIT, additional changes are under BlueOak-1.0.0
 *
 * http://infocenter.arm.com/help/topic/com.arm.doc.ddi0183g/DDI0183G_uart_pl011_r1p5_trm.pdf
 */

use {
    crate::{
        console::interface,
        cpu::loop_while,
        devices::serial::SerialOps,
        mmio_deref_wrapper::MMIODerefWrapper,
        platform::{device_driver::IRQNumber, BcmHost},
        synchronization::{interface::Mutex, IRQSafeNullLock},
    },
    core::fmt::{self, Arguments},
    tock_registers::{
        interfaces::{ReadWriteable, Readable, Writeable},
        register_bitfields, register_structs,
        registers::{ReadOnly, ReadWrite, WriteOnly},
    },
};

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

// PL011 UART registers.
//
// Descriptions taken from
// https://github.com/raspberrypi/documentation/files/1888662/BCM2837-ARM-Peripherals.-.Revised.-.V2-1.pdf
register_bitfields! {
    u32,

    /// Flag Register
    FR [
        /// Transmit FIFO empty.
        TXFE OFFSET(7) NUMBITS(1) [],
        /// Receive FIFO full.
        RXFF OFFSET(6) NUMBITS(1) [],
        /// Transmit FIFO full.
        TXFF OFFSET(5) NUMBITS(1) [],
        /// Receive FIFO empty.
        RXFE OFFSET(4) NUMBITS(1) [],
        /// UART busy transmitting.
        BUSY OFFSET(3) NUMBITS(1) []
    ],

    /// Integer Baud rate divisor
    IBRD [
        BAUD_DIVINT OFFSET(0) NUMBITS(16) []
    ],

    /// Fractional Baud rate divisor
    FBRD [
        BAUD_DIVFRAC OFFSET(0) NUMBITS(6) []
    ],

    /// Line Control register
    LCR_H [
        WordLength OFFSET(5) NUMBITS(2) [
            FiveBit = 0b00,
            SixBit = 0b01,
            SevenBit = 0b10,
            EightBit = 0b11
        ],

        Fifos OFFSET(4) NUMBITS(1) [
            Disabled = 0,
            Enabled = 1
        ],

        Stop2 OFFSET(3) NUMBITS(1) [
            Disabled = 0,
            Enabled = 1
        ],

        Parity OFFSET(1) NUMBITS(1) [
            Disabled = 0,
            Enabled = 1
        ],
    ],

    /// Control Register
    CR [
        RXE    OFFSET(9) NUMBITS(1) [
            Disabled = 0,
            Enabled = 1
        ],

        TXE    OFFSET(8) NUMBITS(1) [
            Disabled = 0,
            Enabled = 1
        ],

        UARTEN OFFSET(0) NUMBITS(1) [
            Disabled = 0,
            Enabled = 1
        ]
    ],

    /// Interrupt FIFO Level Select Register.
    IFLS [
        RXIFLSEL OFFSET(3) NUMBITS(5) [
            OneEigth = 0b000,
            OneQuarter = 0b001,
            OneHalf = 0b010,
            ThreeQuarters = 0b011,
            SevenEights = 0b100
        ]
    ],

    /// Interrupt Mask Set/Clear Register.
    IMSC [
        RTIM OFFSET(6) NUMBITS(1) [
            Disabled = 0,
            Enabled = 1
        ],

        RXIM OFFSET(4) NUMBITS(1) [
            Disabled = 0,
            Enabled = 1
        ]
    ],

    /// Masked Interrupt Status Register.
    MIS [
        RTMIS OFFSET(6) NUMBITS(1) [],
        RXMIS OFFSET(4) NUMBITS(1) []
    ],

    /// Interrupt Clear Register
    ICR [
        ALL OFFSET(0) NUMBITS(11) []
    ],

    /// DMA Control Register
    DMACR [
        RXDMAE OFFSET(0) NUMBITS(1) [
            Disabled = 0,
            Enabled = 1
        ],

        TXDMAE OFFSET(0) NUMBITS(1) [
            Disabled = 0,
            Enabled = 1
        ],
    ]
}

// https://developer.arm.com/documentation/ddi0183/g/programmers-model/summary-of-registers?lang=en
register_structs! {
    #[allow(non_snake_case)]
    RegisterBlock {
        (0x00 => Data: ReadWrite<u32>), // DR
        (0x04 => Status: ReadWrite<u32>), // RSR/ECR
        (0x08 => __reserved_1),
        (0x18 => Flag: ReadOnly<u32, FR::Register>),
        (0x1c => __reserved_2),
        (0x24 => IntegerBaudRate: WriteOnly<u32, IBRD::Register>),
        (0x28 => FractionalBaudRate: WriteOnly<u32, FBRD::Register>),
        (0x2c => LineControl: ReadWrite<u32, LCR_H::Register>),
        (0x30 => Control: WriteOnly<u32, CR::Register>),
        (0x34 => InterruptFifoLevelSelect: ReadWrite<u32, IFLS::Register>),
        (0x38 => InterruptMaskSetClear: ReadWrite<u32, IMSC::Register>),
        (0x3c => RawInterruptStatus: ReadOnly<u32>),
        (0x40 => MaskedInterruptStatus: ReadOnly<u32, MIS::Register>),
        (0x44 => InterruptClear: WriteOnly<u32, ICR::Register>),
        (0x48 => DmaControl: WriteOnly<u32, DMACR::Register>),
        (0x4c => __reserved_3),
        (0x1000 => @END),
    }
}

type Registers = MMIODerefWrapper<RegisterBlock>;

struct PL011UartInner {
    registers: Registers,
}

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

pub struct PL011Uart {
    inner: IRQSafeNullLock<PL011UartInner>,
}

pub struct RateDivisors {
    integer_baud_rate_divisor: u32,
    fractional_baud_rate_divisor: u32,
}

pub const UART0_BASE: usize = BcmHost::get_peripheral_address() + 0x20_1000;

/// The UART reference clock used by both boards' firmware-default VPU clock
/// tree (some firmware builds negotiate this over the VideoCore mailbox at boot; the
/// board-peripheral registers that mailbox lives behind are out of scope
/// here, so the fixed default the firmware already programs is used
/// instead).
const UART_CLOCK_HZ: u64 = 3_000_000;

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl RateDivisors {
    /// Integer = clock/(16 * Baud), Fraction = (Fractional part * 64) + 0.5.
    /// Uses the integer-only calculation from
    /// <https://krinkinmu.github.io/2020/11/29/PL011.html>: compute
    /// `64 * clock / (16 * rate) = 4 * clock / rate`, then split into the
    /// low 6 fractional bits and the next 16 integer bits.
    pub fn from_clock_and_rate(clock: u64, baud_rate: u32) -> Result<RateDivisors, &'static str> {
        let value = 4 * clock / baud_rate as u64;
        let i = ((value >> 6) & 0xffff) as u32;
        let f = (value & 0x3f) as u32;
        if i > 65535 {
            return Err("PL011 UART setup failed due to integer baud rate divisor out of range");
        }
        if f > 63 {
            return Err("PL011 UART setup failed due to fractional baud rate divisor out of range");
        }
        Ok(RateDivisors {
            integer_baud_rate_divisor: i,
            fractional_baud_rate_divisor: f,
        })
    }
}

impl PL011Uart {
    pub const COMPATIBLE: &'static str = "BCM PL011 UART";

    /// Create an instance.
    ///
    /// # Safety
    ///
    /// - The user must ensure to provide a correct MMIO start address.
    pub const unsafe fn new(base_addr: usize) -> Self {
        Self {
            inner: IRQSafeNullLock::new(PL011UartInner::new(base_addr)),
        }
    }

    /// GPIO pins should be set up first before enabling the UART.
    pub fn prepare_gpio(gpio: &super::gpio::GPIO) {
        use super::gpio::{Function, PullUpDown};

        // Pin 14 (TXD), pin 15 (RXD).
        gpio.get_pin(14)
            .into_alt(Function::Alt0)
            .set_pull_up_down(PullUpDown::Up);
        gpio.get_pin(15)
            .into_alt(Function::Alt0)
            .set_pull_up_down(PullUpDown::Up);
    }
}

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

impl PL011UartInner {
    /// Create an instance.
    ///
    /// # Safety
    ///
    /// - The user must ensure to provide a correct MMIO start address.
    pub const unsafe fn new(base_addr: usize) -> Self {
        Self {
            registers: Registers::new(base_addr),
        }
    }

    /// Set baud rate and characteristics (115200 8N1).
    pub fn prepare(&self) -> core::result::Result<(), &'static str> {
        // Turn off UART
        self.registers.Control.set(0);

        // Wait for any ongoing transmissions to complete
        self.flush_internal();

        // Flush TX FIFO
        self.registers.LineControl.modify(LCR_H::Fifos::Disabled);

        // Clear pending interrupts
        self.registers.InterruptClear.write(ICR::ALL::SET);

        const BAUD_RATE: u32 = 115_200;

        // From the PL011 Technical Reference Manual:
        //
        // The LCR_H, IBRD, and FBRD registers form the single 30-bit wide LCR Register that is
        // updated on a single write strobe generated by a LCR_H write. So, to internally update the
        // contents of IBRD or FBRD, a LCR_H write must always be performed at the end.
        let divisors = RateDivisors::from_clock_and_rate(UART_CLOCK_HZ, BAUD_RATE)?;
        self.registers
            .IntegerBaudRate
            .write(IBRD::BAUD_DIVINT.val(divisors.integer_baud_rate_divisor & 0xffff));
        self.registers
            .FractionalBaudRate
            .write(FBRD::BAUD_DIVFRAC.val(divisors.fractional_baud_rate_divisor & 0b11_1111));
        self.registers.LineControl.write(
            LCR_H::WordLength::EightBit
                + LCR_H::Fifos::Enabled
                + LCR_H::Parity::Disabled
                + LCR_H::Stop2::Disabled,
        );

        self.registers
            .InterruptFifoLevelSelect
            .write(IFLS::RXIFLSEL::OneEigth);
        self.registers
            .InterruptMaskSetClear
            .write(IMSC::RXIM::Enabled + IMSC::RTIM::Enabled);
        self.registers
            .DmaControl
            .write(DMACR::RXDMAE::Disabled + DMACR::TXDMAE::Disabled);

        self.registers
            .Control
            .write(CR::UARTEN::Enabled + CR::TXE::Enabled + CR::RXE::Enabled);

        Ok(())
    }

    fn flush_internal(&self) {
        loop_while(|| self.registers.Flag.is_set(FR::BUSY));
    }
}

impl Drop for PL011UartInner {
    fn drop(&mut self) {
        self.registers.Control.set(0);
    }
}

impl SerialOps for PL011UartInner {
    fn read_byte(&self) -> u8 {
        loop_while(|| self.registers.Flag.is_set(FR::RXFE));
        self.registers.Data.get() as u8
    }

    fn write_byte(&self, b: u8) {
        loop_while(|| self.registers.Flag.is_set(FR::TXFF));
        self.registers.Data.set(b as u32);
    }

    /// Wait until the TX FIFO is empty, aka all characters have been put on the line.
    fn flush(&self) {
        self.flush_internal();
    }

    /// Consume input until RX FIFO is empty.
    fn clear_rx(&self) {
        loop_while(|| {
            let pending = !self.registers.Flag.is_set(FR::RXFE);
            if pending {
                self.read_byte();
            }
            pending
        });
    }
}

impl interface::ConsoleOps for PL011UartInner {}

impl fmt::Write for PL011UartInner {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        use interface::ConsoleOps;
        self.write_string(s);
        Ok(())
    }
}

impl interface::Write for PL011Uart {
    fn write_fmt(&self, args: Arguments) -> fmt::Result {
        self.inner.lock(|inner| fmt::Write::write_fmt(inner, args))
    }
}

//--------------------------------------------------------------------------------------------------
// OS Interface Code
//--------------------------------------------------------------------------------------------------

impl crate::drivers::interface::DeviceDriver for PL011Uart {
    type IRQNumberType = IRQNumber;

    fn compatible(&self) -> &'static str {
        Self::COMPATIBLE
    }

    unsafe fn init(&self) -> core::result::Result<(), &'static str> {
        self.inner.lock(|inner| inner.prepare())
    }
}

impl SerialOps for PL011Uart {
    fn read_byte(&self) -> u8 {
        self.inner.lock(|inner| inner.read_byte())
    }

    fn write_byte(&self, byte: u8) {
        self.inner.lock(|inner| inner.write_byte(byte))
    }

    fn flush(&self) {
        self.inner.lock(|inner| inner.flush())
    }

    fn clear_rx(&self) {
        self.inner.lock(|inner| inner.clear_rx())
    }
}

impl interface::ConsoleOps for PL011Uart {
    fn write_char(&self, c: char) {
        self.inner.lock(|inner| inner.write_char(c))
    }

    fn write_string(&self, string: &str) {
        self.inner.lock(|inner| inner.write_string(string))
    }

    fn read_char(&self) -> char {
        self.inner.lock(|inner| inner.read_char())
    }
}

impl interface::All for PL011Uart {}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn test_divisors() {
        const CLOCK: u64 = 3_000_000;
        const BAUD_RATE: u32 = 115_200;

        let divisors = RateDivisors::from_clock_and_rate(CLOCK, BAUD_RATE);
        assert!(divisors.is_ok());
        let divisors = divisors.unwrap();
        assert_eq!(divisors.integer_baud_rate_divisor, 1);
        assert_eq!(divisors.fractional_baud_rate_divisor, 40);
    }
}
