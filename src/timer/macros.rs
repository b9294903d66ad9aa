/// Declares a static global `LINK_DRIVER` instance protected by a `critical_section` mutex.
///
/// This macro creates a `static` singleton `LINK_DRIVER` suitable for use in
/// interrupt-based environments, where both the main thread and an ISR need
/// to safely access the shared driver state.
///
/// # Arguments
/// - `$clk`: The concrete type of the clock pin (must implement `OutputPin`)
/// - `$dout`: The concrete type of the data output pin (must implement `OutputPin`)
/// - `$din`: The concrete type of the data input pin (must implement `InputPin`)
/// - `$delay`: The concrete delay type (must implement `DelayNs`)
/// - `$clock`: The concrete clock type (must implement `Clock`)
///
/// # Example
/// ```rust,ignore
/// init_link_driver!(ClkPin, DoutPin, DinPin, Delay, gblink::timer::TickClock);
/// ```
#[macro_export]
macro_rules! init_link_driver {
    ( $clk:ty, $dout:ty, $din:ty, $delay:ty, $clock:ty ) => {
        pub static LINK_DRIVER: $crate::timer::GlobalLinkDriver<$clk, $dout, $din, $delay, $clock> =
            $crate::critical_section::Mutex::new(core::cell::RefCell::new(None));
    };
}

/// Initializes the global `LINK_DRIVER` singleton with a new driver instance.
///
/// Evaluates to the `Result` of [`LinkDriver::new`](crate::driver::LinkDriver::new).
///
/// # Example
/// ```rust,ignore
/// setup_link_driver!(clk, dout, din, delay, TickClock::new(), None).unwrap();
/// ```
///
/// # Notes
/// - Requires `init_link_driver!` to have been used earlier.
#[macro_export]
macro_rules! setup_link_driver {
    ( $clk:expr, $dout:expr, $din:expr, $delay:expr, $clock:expr, $config:expr ) => {
        $crate::driver::LinkDriver::new($clk, $dout, $din, $delay, $clock, $config).map(|driver| {
            $crate::critical_section::with(|cs| {
                let _ = LINK_DRIVER.borrow(cs).replace(Some(driver));
            });
        })
    };
}

/// Calls `tick()` on the global `LINK_DRIVER` if it has been initialized.
///
/// This macro is intended to be invoked from a timer ISR firing every
/// `sample_period_us`.
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn TIM2() {
///     tick_link_timer!();
/// }
/// ```
///
/// # Notes
/// - Safe to call repeatedly; does nothing if the driver hasn't been set up yet.
#[macro_export]
macro_rules! tick_link_timer {
    () => {
        $crate::critical_section::with(|cs| {
            if let Some(driver) = LINK_DRIVER.borrow(cs).borrow_mut().as_mut() {
                driver.tick();
            }
        });
    };
}
