//! Time sources and tick helpers for the link driver.
//!
//! Pulse widths are measured against a [`Clock`]. Two implementations ship with
//! the crate:
//!
//! - [`TickClock`]: counts the sample periods the driver waits through. Needs no
//!   hardware timer; accuracy is that of the delay provider.
//! - [`StdClock`] (feature `std`): reads [`std::time::Instant`].
//!
//! The tick-driven receive path can also be run from a timer interrupt using
//! `critical_section::with` (`timer-isr` feature):
//! - `global_link_timer_tick` and `tick_link_timer!()`: interrupt-based tick callback wrapper
//!
//! The interrupt has to fire once per [`LinkConfig::sample_period_us`]. On AVR
//! parts in CTC mode, [`LinkConfig::timer_compare_value`] (built on
//! [`compute_ocr_value`]) gives the compare register value for that period.
//! A few sample periods the pulse bands tolerate, at 16 MHz:
//!
//! | Sample period | Prescaler | OCR value | Samples per shortest `1` |
//! |---------------|-----------|-----------|--------------------------|
//! |          1 ms |        64 |       250 |                      200 |
//! |          5 ms |      1024 |        78 |                       40 |
//! |         10 ms |      1024 |       156 |                       20 |
//!
//! [`LinkConfig::sample_period_us`]: crate::driver::LinkConfig::sample_period_us
//! [`LinkConfig::timer_compare_value`]: crate::driver::LinkConfig::timer_compare_value

use libm::round;

#[cfg(feature = "timer-isr")]
mod isr;
#[cfg_attr(feature = "timer-isr", allow(unused_imports))]
#[cfg(feature = "timer-isr")]
pub use isr::*;

#[cfg(feature = "timer-isr")]
mod macros;

/// A monotonic microsecond time source.
pub trait Clock {
    /// Current time in microseconds since an arbitrary origin.
    fn now_us(&mut self) -> u64;

    /// Called by the driver after it has waited `us` microseconds.
    ///
    /// Clocks backed by a free-running timer ignore this.
    fn advance(&mut self, _us: u32) {}
}

/// A [`Clock`] that only moves when the driver waits.
#[derive(Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct TickClock {
    elapsed_us: u64,
}

impl TickClock {
    /// Creates a clock at time zero.
    pub const fn new() -> Self {
        Self { elapsed_us: 0 }
    }
}

impl Clock for TickClock {
    fn now_us(&mut self) -> u64 {
        self.elapsed_us
    }

    fn advance(&mut self, us: u32) {
        self.elapsed_us = self.elapsed_us.saturating_add(u64::from(us));
    }
}

/// A [`Clock`] reading the host's monotonic clock.
#[cfg(feature = "std")]
#[derive(Clone, Copy, Debug)]
pub struct StdClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    /// Creates a clock whose origin is now.
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for StdClock {
    fn now_us(&mut self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}

/// Computes the OCR value for an AVR timer (CTC mode) ticking every `sample_period_us`.
///
/// # Arguments
/// - `f_cpu`: CPU frequency in Hz
/// - `prescaler`: timer prescaler (e.g., 8, 64, 256)
/// - `sample_period_us`: desired tick interval in microseconds (e.g., 1000)
///
/// # Returns
/// - OCR value for OCRnA (rounds to nearest integer)
pub fn compute_ocr_value(f_cpu: u32, prescaler: u32, sample_period_us: u32) -> u16 {
    let ticks_per_second = f_cpu as f64 / prescaler as f64;
    let counts = ticks_per_second * (sample_period_us as f64 / 1_000_000.0);
    round(counts) as u16
}

/// Number of samples taken during `width_us` at `sample_period_us`, rounded up.
///
/// Useful for checking that a sample period resolves the pulse bands: the
/// narrowest valid pulse should span several samples. A zero period counts as
/// 1 µs.
pub const fn samples_per(width_us: u32, sample_period_us: u32) -> u32 {
    let period = if sample_period_us == 0 { 1 } else { sample_period_us };
    width_us.div_ceil(period)
}
