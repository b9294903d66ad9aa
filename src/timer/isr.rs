use crate::driver::{LinkConfig, LinkDriver};
use crate::error::Error;
use crate::stream::BitStream;
use crate::timer::Clock;
use core::cell::RefCell;
use critical_section::Mutex;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

/// Shorthand for the global, interrupt-shared driver slot.
pub type GlobalLinkDriver<CLK, DOUT, DIN, D, C> =
    Mutex<RefCell<Option<LinkDriver<CLK, DOUT, DIN, D, C>>>>;

/// Used to initialize the global static `LinkDriver` for use with
/// `critical_section`.
///
/// # Returns
/// * An empty mutable ref-cell
///
/// # Example
/// ```rust,ignore
/// static LINK: GlobalLinkDriver<PD1, PD2, PD3, Delay, TickClock> =
///     global_link_driver_init();
/// ```
pub const fn global_link_driver_init<CLK, DOUT, DIN, D, C>() -> GlobalLinkDriver<CLK, DOUT, DIN, D, C>
where
    CLK: OutputPin,
    DOUT: OutputPin,
    DIN: InputPin,
    D: DelayNs,
    C: Clock,
{
    Mutex::new(RefCell::new(None))
}

/// Creates a driver and stores it in the global slot.
///
/// # Errors
/// Whatever [`LinkDriver::new`] returns; the slot is left untouched on error.
///
/// # Example
/// ```rust,ignore
/// fn main() {
///     global_link_driver_setup(&LINK, clk, dout, din, delay, TickClock::new(), None).unwrap();
/// }
/// ```
pub fn global_link_driver_setup<CLK, DOUT, DIN, D, C>(
    global_driver: &'static GlobalLinkDriver<CLK, DOUT, DIN, D, C>,
    clock_out: CLK,
    data_out: DOUT,
    data_in: DIN,
    delay: D,
    clock: C,
    config: Option<LinkConfig>,
) -> Result<(), Error>
where
    CLK: OutputPin,
    DOUT: OutputPin,
    DIN: InputPin,
    D: DelayNs,
    C: Clock,
{
    let driver = LinkDriver::new(clock_out, data_out, data_in, delay, clock, config)?;
    critical_section::with(|cs| {
        let _ = global_driver.borrow(cs).replace(Some(driver));
    });
    Ok(())
}

/// Arms the tick-driven receiver of the global driver.
///
/// Returns [`Error::NotInitialized`] if the driver has not been set up.
pub fn global_link_start_receive<CLK, DOUT, DIN, D, C>(
    global_driver: &'static GlobalLinkDriver<CLK, DOUT, DIN, D, C>,
) -> Result<(), Error>
where
    CLK: OutputPin,
    DOUT: OutputPin,
    DIN: InputPin,
    D: DelayNs,
    C: Clock,
{
    critical_section::with(|cs| match global_driver.borrow(cs).borrow_mut().as_mut() {
        Some(driver) => driver.start_receive(),
        None => Err(Error::NotInitialized),
    })
}

/// Runs the tick at each interrupt
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn TIM2() {
///     global_link_timer_tick(&LINK);
/// }
/// ```
pub fn global_link_timer_tick<CLK, DOUT, DIN, D, C>(
    global_driver: &'static GlobalLinkDriver<CLK, DOUT, DIN, D, C>,
) where
    CLK: OutputPin,
    DOUT: OutputPin,
    DIN: InputPin,
    D: DelayNs,
    C: Clock,
{
    critical_section::with(|cs| {
        if let Some(driver) = global_driver.borrow(cs).borrow_mut().as_mut() {
            driver.tick();
        }
    });
}

/// Polls the global driver for a completed stream.
///
/// See [`LinkDriver::poll_sequence`]. Returns [`Error::NotInitialized`] if the
/// driver has not been set up.
pub fn global_link_poll_sequence<CLK, DOUT, DIN, D, C>(
    global_driver: &'static GlobalLinkDriver<CLK, DOUT, DIN, D, C>,
) -> nb::Result<BitStream, Error>
where
    CLK: OutputPin,
    DOUT: OutputPin,
    DIN: InputPin,
    D: DelayNs,
    C: Clock,
{
    critical_section::with(|cs| match global_driver.borrow(cs).borrow_mut().as_mut() {
        Some(driver) => driver.poll_sequence(),
        None => Err(nb::Error::Other(Error::NotInitialized)),
    })
}
