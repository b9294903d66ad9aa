//! A simulated console on the other end of the link.
//!
//! The console latches `DataOut` on every rising `ClockOut` edge and answers on
//! `DataIn` with pulses scheduled against a shared simulated clock. Time only
//! moves when the driver waits, through [`SimClock`].

#![allow(dead_code)]

use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use embedded_hal_mock::eh1::delay::NoopDelay;
use gblink::encoding::{bits_to_byte, byte_to_bits};
use gblink::timer::Clock;
use gblink::{LinkConfig, LinkDriver};

/// High time the console uses for a `1`.
pub const ONE_US: u64 = 300_000;
/// High time the console uses for a `0`.
pub const ZERO_US: u64 = 700_000;
/// Low time between two pulses.
pub const GAP_US: u64 = 100_000;
/// Sample period used by the tests.
pub const PERIOD_US: u32 = 5_000;

#[derive(Default, Debug)]
pub struct Console {
    data: bool,
    clock: bool,
    shift: Vec<bool>,
    /// Bytes latched from the host, in order.
    pub received: Vec<u8>,
    /// High intervals `[start, end)` on the console's data line.
    pub pulses: Vec<(u64, u64)>,
    /// Echo every received byte back as 8 pulses, starting this long after the last clock edge.
    pub echo_after: Option<u64>,
    /// Pulse stuck high from this time on.
    pub stuck_high_from: Option<u64>,
    /// Keep sending `1`s forever from this time on.
    pub endless_from: Option<u64>,
}

impl Console {
    fn level_at(&self, now: u64) -> bool {
        if self.stuck_high_from.is_some_and(|t| now >= t) {
            return true;
        }
        if let Some(t) = self.endless_from {
            if now >= t {
                return (now - t) % (ONE_US + GAP_US) < ONE_US;
            }
        }
        self.pulses
            .iter()
            .any(|&(start, end)| start <= now && now < end)
    }

    /// Schedules a single pulse of `width` at `start`.
    pub fn pulse(&mut self, start: u64, width: u64) -> u64 {
        self.pulses.push((start, start + width));
        start + width + GAP_US
    }

    /// Schedules `value` the way the console firmware sends it: most significant
    /// bit first, leading zeros dropped. Returns the end of the transmission.
    pub fn send_value(&mut self, value: u64, start: u64) -> u64 {
        let mut at = start;
        let mut started = false;
        for shift in (0..64).rev() {
            let one = (value >> shift) & 1 == 1;
            started |= one;
            if !started {
                continue;
            }
            at = self.pulse(at, if one { ONE_US } else { ZERO_US });
        }
        at
    }

    /// Schedules all 8 bits of `byte`, most significant first, leading zeros
    /// included. Returns the end of the transmission.
    pub fn send_byte(&mut self, byte: u8, start: u64) -> u64 {
        byte_to_bits(byte)
            .iter()
            .fold(start, |at, &one| self.pulse(at, if one { ONE_US } else { ZERO_US }))
    }

    fn on_clock(&mut self, level: bool, now: u64) {
        let rising = level && !self.clock;
        self.clock = level;
        if !rising {
            return;
        }
        self.shift.push(self.data);
        if self.shift.len() == 8 {
            let mut bits = [false; 8];
            bits.copy_from_slice(&self.shift);
            self.shift.clear();
            let byte = bits_to_byte(&bits);
            self.received.push(byte);
            if let Some(after) = self.echo_after {
                let _ = self.send_byte(byte, now + after);
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct Line {
    pub console: Arc<Mutex<Console>>,
    pub now: Arc<AtomicU64>,
}

impl Line {
    pub fn new() -> Self {
        Self {
            console: Arc::new(Mutex::new(Console {
                clock: true,
                ..Console::default()
            })),
            now: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    pub fn console(&self) -> std::sync::MutexGuard<'_, Console> {
        self.console.lock().unwrap()
    }

    pub fn pins(&self) -> (ClockPin, DataOutPin, DataInPin, SimClock) {
        (
            ClockPin(self.clone()),
            DataOutPin(self.clone()),
            DataInPin(self.clone()),
            SimClock(self.now.clone()),
        )
    }

    pub fn driver(&self) -> LinkDriver<ClockPin, DataOutPin, DataInPin, NoopDelay, SimClock> {
        let (clk, dout, din, clock) = self.pins();
        LinkDriver::new(clk, dout, din, NoopDelay::new(), clock, Some(config())).unwrap()
    }
}

pub fn config() -> LinkConfig {
    LinkConfig {
        sample_period_us: PERIOD_US,
        ..LinkConfig::default()
    }
}

#[derive(Debug)]
pub struct ClockPin(Line);
#[derive(Debug)]
pub struct DataOutPin(Line);
#[derive(Debug)]
pub struct DataInPin(Line);
#[derive(Debug)]
pub struct SimClock(Arc<AtomicU64>);

impl ErrorType for ClockPin {
    type Error = Infallible;
}

impl OutputPin for ClockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        let now = self.0.now();
        self.0.console().on_clock(false, now);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let now = self.0.now();
        self.0.console().on_clock(true, now);
        Ok(())
    }
}

impl ErrorType for DataOutPin {
    type Error = Infallible;
}

impl OutputPin for DataOutPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.console().data = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.console().data = true;
        Ok(())
    }
}

impl ErrorType for DataInPin {
    type Error = Infallible;
}

impl InputPin for DataInPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let now = self.0.now();
        Ok(self.0.console().level_at(now))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

impl Clock for SimClock {
    fn now_us(&mut self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    fn advance(&mut self, us: u32) {
        let _ = self.0.fetch_add(u64::from(us), Ordering::SeqCst);
    }
}

/// Levels the console latches for `byte`, for assertions.
pub fn expected_bits(byte: u8) -> [bool; 8] {
    byte_to_bits(byte)
}
