//! Platform MMIO address map.
//!
//! Physical page table construction and the kernel/user virtual memory
//! layout are owned by `kernel::arch::pmap`; this module only
//! carries the fixed peripheral offsets both boards agree on, relative to
//! [`super::BcmHost::get_peripheral_address`].

#[rustfmt::skip]
pub(super) mod map {
    use super::super::BcmHost;

    const GPIO_OFFSET: usize = 0x0020_0000;
    const UART_OFFSET: usize = 0x0020_1000;
    const INTERRUPT_CONTROLLER_OFFSET: usize = 0x0000_B200;
    const SYSTEM_TIMER_OFFSET: usize = 0x0000_3000;

    /// Physical MMIO register addresses, relative to the board's peripheral base.
    pub mod mmio {
        use super::*;

        pub const fn gpio_base() -> usize {
            BcmHost::get_peripheral_address() + GPIO_OFFSET
        }

        pub const fn pl011_uart_base() -> usize {
            BcmHost::get_peripheral_address() + UART_OFFSET
        }

        pub const fn interrupt_controller_base() -> usize {
            BcmHost::get_peripheral_address() + INTERRUPT_CONTROLLER_OFFSET
        }

        pub const fn system_timer_base() -> usize {
            BcmHost::get_peripheral_address() + SYSTEM_TIMER_OFFSET
        }
    }
}
