use {
    crate::{
        console, drivers,
        platform::{device_driver, memory::map::mmio},
    },
    core::sync::atomic::{AtomicBool, Ordering},
};

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// Initialize the driver subsystem.
///
/// # Safety
///
/// See child function calls.
pub unsafe fn init() -> Result<(), &'static str> {
    static INIT_DONE: AtomicBool = AtomicBool::new(false);
    if INIT_DONE.load(Ordering::Relaxed) {
        return Err("Init already done");
    }

    driver_gpio()?;
    #[cfg(not(feature = "noserial"))]
    driver_uart()?;
    driver_interrupt_controller()?;
    driver_system_timer()?;

    INIT_DONE.store(true, Ordering::Relaxed);
    Ok(())
}

/// Minimal code needed to bring up the console in QEMU (for testing only).
#[cfg(test)]
pub fn qemu_bring_up_console() {
    console::register_console(&PL011_UART);
}

//--------------------------------------------------------------------------------------------------
// Global instances
//--------------------------------------------------------------------------------------------------

static PL011_UART: device_driver::PL011Uart =
    unsafe { device_driver::PL011Uart::new(mmio::pl011_uart_base()) };
static GPIO: device_driver::GPIO = unsafe { device_driver::GPIO::new(mmio::gpio_base()) };
static INTERRUPT_CONTROLLER: device_driver::InterruptController =
    unsafe { device_driver::InterruptController::new(mmio::interrupt_controller_base()) };
static SYSTEM_TIMER: device_driver::SystemTimer =
    unsafe { device_driver::SystemTimer::new(mmio::system_timer_base()) };

/// Accessor used by `kernel::irq` and the hardclock to reach the board's
/// opaque interrupt controller and system timer.
pub fn interrupt_controller() -> &'static device_driver::InterruptController {
    &INTERRUPT_CONTROLLER
}

pub fn system_timer() -> &'static device_driver::SystemTimer {
    &SYSTEM_TIMER
}

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

/// This must be called only after successful init of the PL011 UART driver.
fn post_init_pl011_uart() -> Result<(), &'static str> {
    console::register_console(&PL011_UART);
    crate::info!("[0] UART0 is live!");
    Ok(())
}

// This must be called only after successful init of the GPIO driver.
fn post_init_gpio() -> Result<(), &'static str> {
    device_driver::PL011Uart::prepare_gpio(&GPIO);
    Ok(())
}

fn driver_uart() -> Result<(), &'static str> {
    let uart_descriptor =
        drivers::DeviceDriverDescriptor::new(&PL011_UART, Some(post_init_pl011_uart), None);
    drivers::driver_manager().register_driver(uart_descriptor);

    Ok(())
}

fn driver_gpio() -> Result<(), &'static str> {
    let gpio_descriptor = drivers::DeviceDriverDescriptor::new(&GPIO, Some(post_init_gpio), None);
    drivers::driver_manager().register_driver(gpio_descriptor);

    Ok(())
}

fn driver_interrupt_controller() -> Result<(), &'static str> {
    let descriptor = drivers::DeviceDriverDescriptor::new(&INTERRUPT_CONTROLLER, None, None);
    drivers::driver_manager().register_driver(descriptor);

    Ok(())
}

fn driver_system_timer() -> Result<(), &'static str> {
    let descriptor = drivers::DeviceDriverDescriptor::new(&SYSTEM_TIMER, None, None);
    drivers::driver_manager().register_driver(descriptor);

    Ok(())
}
