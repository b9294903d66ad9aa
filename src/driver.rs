//! Host side driver for the console link.
//!
//! This module provides the [`LinkDriver`] struct, which owns the three link
//! lines and implements both directions of the protocol using only digital I/O,
//! a delay provider and a [`Clock`].
//!
//! ## Features
//!
//! - Clocked byte output, most significant bit first, host as clock master
//! - Pulse-width decoded input with a receive deadline
//! - Blocking operations ([`receive_bit`](LinkDriver::receive_bit),
//!   [`receive_sequence`](LinkDriver::receive_sequence)) that sleep between samples
//! - A tick-driven receive ([`start_receive`](LinkDriver::start_receive),
//!   [`tick`](LinkDriver::tick), [`poll_sequence`](LinkDriver::poll_sequence)) for
//!   timer interrupts
//!
//! ## Example
//!
//! ```rust
//! # use embedded_hal_mock::eh1::digital::{Mock as Pin, State as PinState, Transaction as PinTransaction};
//! # use embedded_hal_mock::eh1::delay::NoopDelay;
//! use gblink::driver::LinkDriver;
//! use gblink::timer::TickClock;
//!
//! # fn main() -> Result<(), gblink::error::Error> {
//! # let clock_out = Pin::new(&[PinTransaction::set(PinState::High)]);
//! # let data_out = Pin::new(&[]);
//! # let data_in = Pin::new(&[PinTransaction::get(PinState::High)]);
//! let mut link = LinkDriver::new(clock_out, data_out, data_in, NoopDelay::new(), TickClock::new(), None)?;
//!
//! // Console raises its data line once it is done with an instruction
//! link.wait_for_finish()?;
//! # let (mut clock_out, mut data_out, mut data_in, _, _) = link.release();
//! # clock_out.done();
//! # data_out.done();
//! # data_in.done();
//! # Ok(())
//! # }
//! ```
//!
//! ## Design Notes
//!
//! The link is half-duplex. [`LinkMode`] records which operation currently owns
//! the lines and every operation refuses to start unless the driver is idle.
//!
//! For the demodulator internals, see [`crate::pulse::PulseClassifier`].
//!
//! For interrupt helpers, see [`crate::timer`].

use crate::consts::{DEFAULT_SAMPLE_PERIOD_US, MAX_STREAM_LEN};
use crate::encoding::{BitValue, Timing, byte_to_bits};
use crate::error::Error;
use crate::pulse::PulseClassifier;
use crate::stream::{BitStream, StreamAssembler};
use crate::timer::{Clock, compute_ocr_value};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

/// Which operation currently owns the link lines.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum LinkMode {
    ///   Nothing in progress. The clock idles high.
    #[default]
    Idle,
    ///   A byte is being clocked out.
    Sending,
    ///   Pulses are being sampled, either by a blocking receive or by [`tick()`](LinkDriver::tick).
    Receiving,
    ///   Waiting for the console to raise its data line after an instruction.
    Waiting,
}

/// Host-side settings of a [`LinkDriver`].
///
/// Only `sample_period_us`, `data_in_inverted` and `max_stream_len` are host
/// choices. `timing` must match the console firmware.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct LinkConfig {
    /// Timing contract, [`Timing::V1`] by default.
    pub timing: Timing,
    /// Interval between two samples of the data line, in microseconds.
    ///
    /// In tick-driven mode this is the period at which [`tick()`](LinkDriver::tick) is called.
    pub sample_period_us: u32,
    /// Whether the data input reads inverted (e.g. through a level shifter).
    pub data_in_inverted: bool,
    /// Longest accepted bit stream, terminator included.
    pub max_stream_len: usize,
}

impl LinkConfig {
    /// Checks the settings a driver depends on.
    ///
    /// The sample period must be non-zero: pulse widths and the receive
    /// deadline are measured in sample periods when the clock only moves as the
    /// driver waits (see [`TickClock`](crate::timer::TickClock)).
    ///
    /// # Errors
    /// [`Error::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> Result<(), Error> {
        if self.sample_period_us == 0 {
            return Err(Error::InvalidConfig("sample_period_us must be non-zero"));
        }
        Ok(())
    }

    /// Compare value for an AVR timer in CTC mode that fires every
    /// `sample_period_us`, i.e. at the rate [`tick()`](LinkDriver::tick) must be called.
    ///
    /// See [`compute_ocr_value`].
    pub fn timer_compare_value(&self, f_cpu: u32, prescaler: u32) -> u16 {
        compute_ocr_value(f_cpu, prescaler, self.sample_period_us)
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            timing: Timing::V1,
            sample_period_us: DEFAULT_SAMPLE_PERIOD_US,
            data_in_inverted: false,
            max_stream_len: MAX_STREAM_LEN,
        }
    }
}

/// A bit-banged host for the console link.
///
/// ## Transmission
///
/// The host drives `CLK` and `DOUT`. For each bit, `DOUT` is set to the bit's
/// level and `CLK` is pulled low and released high; the console samples on that
/// transition.
///
/// ## Reception
///
/// The console drives `DIN`. Each bit is a high pulse whose width encodes the
/// value. A stream of bits ends once the console stays silent for the deadline.
///
/// ## Type Parameters
///
/// - `CLK`: [`OutputPin`] for the clock line
/// - `DOUT`: [`OutputPin`] for the host to console data line
/// - `DIN`: [`InputPin`] for the console to host data line
/// - `D`: [`DelayNs`] used for frame delays and between samples
/// - `C`: [`Clock`] used to time pulses
///
/// ## Notes
///
/// - Only one `LinkDriver` instance should be active if you're using interrupts.
/// - The driver never configures pins; hand them over already set up and take them
///   back with [`release()`](LinkDriver::release).
#[derive(Debug)]
pub struct LinkDriver<CLK, DOUT, DIN, D, C>
where
    CLK: OutputPin,
    DOUT: OutputPin,
    DIN: InputPin,
    D: DelayNs,
    C: Clock,
{
    /// The operation currently owning the lines
    pub mode: LinkMode,
    /// Clock output pin
    pub clock_out: CLK,
    /// Data output pin
    pub data_out: DOUT,
    /// Data input pin
    pub data_in: DIN,
    delay: D,
    clock: C,
    config: LinkConfig,

    /// Assembles the stream in tick-driven mode.
    pub assembler: StreamAssembler,
    rx_error: Option<Error>,

    /// Counter of bytes clocked out.
    pub bytes_sent: u32,

    /// Counter of received pulses that carried a digit.
    pub bits_received: u32,

    /// Counter of received pulses classified as noise.
    pub rx_noise: u32,

    /// Counter of received streams that closed with a timeout.
    pub streams_received: u32,
}

impl<CLK, DOUT, DIN, D, C> LinkDriver<CLK, DOUT, DIN, D, C>
where
    CLK: OutputPin,
    DOUT: OutputPin,
    DIN: InputPin,
    D: DelayNs,
    C: Clock,
{
    /// Creates a new `LinkDriver` on the given lines.
    ///
    /// # Arguments
    /// - `clock_out`: The output pin driving the link clock.
    /// - `data_out`: The output pin carrying host to console bits.
    /// - `data_in`: The input pin carrying console to host pulses.
    /// - `delay`: Delay provider for frame delays and sampling.
    /// - `clock`: Time source for pulse measurement.
    /// - `config`: Optional settings, [`LinkConfig::default()`] if `None`.
    ///
    /// # Errors
    /// - [`Error::InvalidConfig`] if `config` fails [`LinkConfig::validate`]; no pin
    ///   is touched in that case
    /// - [`Error::Pin`] if the clock line cannot be driven
    ///
    /// # Notes
    /// The clock line is driven `HIGH` (its idle level) before returning.
    pub fn new(
        clock_out: CLK,
        data_out: DOUT,
        data_in: DIN,
        delay: D,
        clock: C,
        config: Option<LinkConfig>,
    ) -> Result<Self, Error> {
        let config = config.unwrap_or_default();
        config.validate()?;
        let mut clock_out = clock_out;
        clock_out.set_high().map_err(Error::pin)?;
        Ok(Self {
            mode: LinkMode::Idle,
            clock_out,
            data_out,
            data_in,
            delay,
            clock,
            assembler: StreamAssembler::new(
                config.timing,
                config.data_in_inverted,
                config.max_stream_len,
            ),
            config,
            rx_error: None,
            bytes_sent: 0,
            bits_received: 0,
            rx_noise: 0,
            streams_received: 0,
        })
    }

    /// The settings this driver was created with.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Gives the lines, delay and clock back.
    pub fn release(self) -> (CLK, DOUT, DIN, D, C) {
        (
            self.clock_out,
            self.data_out,
            self.data_in,
            self.delay,
            self.clock,
        )
    }

    fn claim(&mut self, mode: LinkMode) -> Result<(), Error> {
        if self.mode != LinkMode::Idle {
            return Err(Error::Busy(self.mode));
        }
        self.mode = mode;
        Ok(())
    }

    fn set_mode_idle(&mut self) {
        self.mode = LinkMode::Idle;
    }

    /// Current time according to the driver's clock, in microseconds.
    pub fn now_us(&mut self) -> u64 {
        self.clock.now_us()
    }

    /// Blocks for `us` microseconds and lets the clock know.
    pub fn wait_us(&mut self, us: u32) {
        self.delay.delay_us(us);
        self.clock.advance(us);
    }

    fn wait_sample_period(&mut self) {
        self.wait_us(self.config.sample_period_us);
    }

    fn write_data(&mut self, level: bool) -> Result<(), Error> {
        if level {
            self.data_out.set_high().map_err(Error::pin)
        } else {
            self.data_out.set_low().map_err(Error::pin)
        }
    }

    fn pulse_clock(&mut self) -> Result<(), Error> {
        let half = self.config.timing.clock_half_period_us;
        self.clock_out.set_low().map_err(Error::pin)?;
        self.wait_us(half);
        self.clock_out.set_high().map_err(Error::pin)?;
        self.wait_us(half);
        Ok(())
    }

    /// Reads the data input once, inversion applied.
    pub fn sample(&mut self) -> Result<bool, Error> {
        let high = self.data_in.is_high().map_err(Error::pin)?;
        Ok(high != self.config.data_in_inverted)
    }

    fn clock_out_byte(&mut self, byte: u8) -> Result<(), Error> {
        self.wait_us(self.config.timing.pre_frame_settle_us);
        for level in byte_to_bits(byte) {
            self.write_data(level)?;
            self.pulse_clock()?;
        }
        self.wait_us(self.config.timing.post_frame_us);
        Ok(())
    }

    /// Clocks one byte out to the console, most significant bit first.
    ///
    /// Waits the pre-frame settle delay, sends 8 clock pulses and waits the
    /// post-frame delay. The console does not acknowledge.
    ///
    /// # Errors
    /// - [`Error::Busy`] if another operation owns the lines
    /// - [`Error::Pin`] if a pin write fails
    pub fn send_byte(&mut self, byte: u8) -> Result<(), Error> {
        self.claim(LinkMode::Sending)?;
        let result = self.clock_out_byte(byte);
        self.set_mode_idle();
        result?;
        self.bytes_sent = self.bytes_sent.wrapping_add(1);
        debug!("sent byte {}", byte);
        Ok(())
    }

    /// Clocks several bytes out, one frame each.
    pub fn send_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        for &byte in bytes {
            self.send_byte(byte)?;
        }
        Ok(())
    }

    fn record(&mut self, bit: BitValue) {
        match bit {
            BitValue::Zero | BitValue::One => {
                self.bits_received = self.bits_received.wrapping_add(1);
            }
            BitValue::Noise => {
                self.rx_noise = self.rx_noise.wrapping_add(1);
                warn!("discarding out-of-band pulse");
            }
            BitValue::Timeout => {}
        }
    }

    fn measure_bit(&mut self) -> Result<BitValue, Error> {
        let mut classifier =
            PulseClassifier::new(self.config.timing, self.config.data_in_inverted);
        classifier.arm(self.clock.now_us());
        loop {
            let high = self.data_in.is_high().map_err(Error::pin)?;
            let now = self.clock.now_us();
            if let Some(bit) = classifier.update(high, now) {
                self.record(bit);
                return Ok(bit);
            }
            self.wait_sample_period();
        }
    }

    /// Waits for one pulse from the console and classifies it.
    ///
    /// Returns [`BitValue::Timeout`] if the line does not rise within the
    /// deadline. Timeouts and noise are results, not errors.
    pub fn receive_bit(&mut self) -> Result<BitValue, Error> {
        self.claim(LinkMode::Receiving)?;
        let result = self.measure_bit();
        self.set_mode_idle();
        result
    }

    fn collect_sequence(&mut self) -> Result<BitStream, Error> {
        let mut stream = BitStream::with_capacity(self.config.max_stream_len);
        loop {
            let bit = self.measure_bit()?;
            if stream.push(bit)? {
                return Ok(stream);
            }
        }
    }

    /// Receives pulses until the console goes quiet.
    ///
    /// The returned stream is closed: it ends with exactly one
    /// [`BitValue::Timeout`]. Use [`BitStream::value`] or [`BitStream::decode`] to
    /// get the number it carries.
    ///
    /// # Errors
    /// - [`Error::StreamOverflow`] if the console sends more than `max_stream_len` elements
    /// - [`Error::Busy`] if another operation owns the lines
    /// - [`Error::Pin`] if a pin read fails
    pub fn receive_sequence(&mut self) -> Result<BitStream, Error> {
        self.claim(LinkMode::Receiving)?;
        let result = self.collect_sequence();
        self.set_mode_idle();
        let stream = result?;
        self.streams_received = self.streams_received.wrapping_add(1);
        debug!(
            "received {} elements, value {}",
            stream.len(),
            stream.decode()
        );
        Ok(stream)
    }

    /// Arms the tick-driven receiver.
    ///
    /// Call [`tick()`](LinkDriver::tick) every `sample_period_us` afterwards and
    /// collect the result with [`poll_sequence()`](LinkDriver::poll_sequence).
    pub fn start_receive(&mut self) -> Result<(), Error> {
        self.claim(LinkMode::Receiving)?;
        self.rx_error = None;
        let now = self.clock.now_us();
        self.assembler.start(now);
        Ok(())
    }

    /// Abandons a tick-driven receive. Anything received so far is discarded.
    pub fn cancel_receive(&mut self) {
        if self.mode == LinkMode::Receiving {
            self.assembler.stop();
            let _ = self.assembler.take();
            self.set_mode_idle();
        }
    }

    /// Advances the tick-driven receiver by one sample.
    ///
    /// Must be called at fixed intervals of `sample_period_us`, ideally from a
    /// timer interrupt. Does nothing unless a receive was started.
    pub fn tick(&mut self) {
        if self.mode != LinkMode::Receiving || !self.assembler.is_running() {
            return;
        }
        let result = match self.data_in.is_high() {
            Ok(high) => {
                let now = self.clock.now_us();
                self.assembler.update(high, now)
            }
            Err(err) => Err(Error::pin(err)),
        };
        match result {
            Ok(true) => {
                let stream = self.assembler.stream();
                let data = stream.data_bits() as u32;
                let noise = stream.noise_count() as u32;
                self.bits_received = self.bits_received.wrapping_add(data);
                self.rx_noise = self.rx_noise.wrapping_add(noise);
                self.streams_received = self.streams_received.wrapping_add(1);
                self.set_mode_idle();
            }
            Ok(false) => {}
            Err(err) => {
                warn!("receive aborted: {:?}", err);
                self.assembler.stop();
                self.rx_error = Some(err);
                self.set_mode_idle();
            }
        }
        self.clock.advance(self.config.sample_period_us);
    }

    /// Returns the stream collected by [`tick()`](LinkDriver::tick) once it is closed.
    ///
    /// # Returns
    /// - `Ok(stream)`: the console went quiet, the stream is complete
    /// - `Err(nb::Error::WouldBlock)`: still receiving
    /// - `Err(nb::Error::Other(err))`: the receive failed, or none was started
    ///   ([`Error::NotReceiving`])
    pub fn poll_sequence(&mut self) -> nb::Result<BitStream, Error> {
        if let Some(err) = self.rx_error.take() {
            return Err(nb::Error::Other(err));
        }
        if self.assembler.stream().is_closed() {
            return Ok(self.assembler.take());
        }
        if self.mode == LinkMode::Receiving {
            Err(nb::Error::WouldBlock)
        } else {
            Err(nb::Error::Other(Error::NotReceiving))
        }
    }

    /// Checks once whether the console has raised its data line.
    pub fn poll_finished(&mut self) -> nb::Result<(), Error> {
        if self.sample()? {
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    /// Blocks until the console raises its data line to signal it has finished
    /// the last instruction.
    ///
    /// There is no deadline; the player may take as long as they like. Use
    /// [`poll_finished()`](LinkDriver::poll_finished) to impose one.
    pub fn wait_for_finish(&mut self) -> Result<(), Error> {
        self.claim(LinkMode::Waiting)?;
        let result = loop {
            match self.poll_finished() {
                Ok(()) => break Ok(()),
                Err(nb::Error::WouldBlock) => self.wait_sample_period(),
                Err(nb::Error::Other(err)) => break Err(err),
            }
        };
        self.set_mode_idle();
        result
    }
}
