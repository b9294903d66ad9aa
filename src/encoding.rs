//! Bit framing for both directions of the link.
//!
//! ## Outbound
//!
//! Bytes leave the host most-significant bit first, one bit per clock pulse.
//! [`byte_to_bits`] produces the order in which the data line is driven.
//!
//! ## Inbound
//!
//! The console has no clock line of its own. It conveys each bit by how long it
//! holds its data line high:
//!
//! | High time (`d`)                   | Bit             |
//! |-----------------------------------|-----------------|
//! | `d < noise_low`                   | [`BitValue::Noise`] |
//! | `noise_low <= d < mid`            | [`BitValue::One`]   |
//! | `mid <= d <= noise_high`          | [`BitValue::Zero`]  |
//! | `d > noise_high`                  | [`BitValue::Noise`] |
//!
//! A line that never rises within the deadline reads as [`BitValue::Timeout`].
//!
//! [`classify_pulse`] implements the table; the sampling itself lives in
//! [`crate::pulse`].

use crate::consts::{
    CLOCK_HALF_PERIOD_US, POST_FRAME_US, PRE_FRAME_SETTLE_US, PULSE_MID_US, PULSE_NOISE_HIGH_US,
    PULSE_NOISE_LOW_US, RX_DEADLINE_US,
};

/// One classified element of an inbound bit stream.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum BitValue {
    /// Long pulse.
    Zero,
    /// Short pulse.
    One,
    /// Pulse outside both valid bands. Ignored when reconstructing values.
    Noise,
    /// No activity before the deadline. Terminates a bit stream.
    Timeout,
}

impl BitValue {
    /// Returns the binary digit carried by this element, or `None` for
    /// [`Noise`](BitValue::Noise) and [`Timeout`](BitValue::Timeout).
    pub fn digit(self) -> Option<u8> {
        match self {
            BitValue::Zero => Some(0),
            BitValue::One => Some(1),
            BitValue::Noise | BitValue::Timeout => None,
        }
    }

    /// Whether this element carries a binary digit.
    pub fn is_data(self) -> bool {
        self.digit().is_some()
    }
}

impl From<bool> for BitValue {
    fn from(bit: bool) -> Self {
        if bit { BitValue::One } else { BitValue::Zero }
    }
}

/// Timing contract shared with the console firmware.
///
/// All values are in microseconds. [`Timing::V1`] is the only timing the
/// current firmware speaks; the fields are public so that a replacement
/// firmware, or a faster simulated peer in tests, can use a scaled copy.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Timing {
    /// Delay before the first clock pulse of a byte.
    pub pre_frame_settle_us: u32,
    /// Clock low time and clock high time of each bit.
    pub clock_half_period_us: u32,
    /// Delay after the last clock pulse of a byte.
    pub post_frame_us: u32,
    /// Longest wait for the data line to rise, and longest accepted high time.
    pub deadline_us: u32,
    /// Shortest valid pulse.
    pub noise_low_us: u32,
    /// Shortest pulse read as `0`.
    pub mid_us: u32,
    /// Longest valid pulse.
    pub noise_high_us: u32,
}

impl Timing {
    /// Timing of protocol version 1.
    pub const V1: Timing = Timing {
        pre_frame_settle_us: PRE_FRAME_SETTLE_US,
        clock_half_period_us: CLOCK_HALF_PERIOD_US,
        post_frame_us: POST_FRAME_US,
        deadline_us: RX_DEADLINE_US,
        noise_low_us: PULSE_NOISE_LOW_US,
        mid_us: PULSE_MID_US,
        noise_high_us: PULSE_NOISE_HIGH_US,
    };
}

impl Default for Timing {
    fn default() -> Self {
        Timing::V1
    }
}

/// Classifies a measured high time into a [`BitValue`].
///
/// Never returns [`BitValue::Timeout`]; that is decided by the sampler.
pub fn classify_pulse(high_us: u64, timing: &Timing) -> BitValue {
    if high_us < timing.noise_low_us as u64 || high_us > timing.noise_high_us as u64 {
        BitValue::Noise
    } else if high_us >= timing.mid_us as u64 {
        BitValue::Zero
    } else {
        BitValue::One
    }
}

/// Splits a byte into the levels driven on the data line, most significant bit first.
pub fn byte_to_bits(byte: u8) -> [bool; 8] {
    let mut bits = [false; 8];
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = byte & (0x80 >> i) != 0;
    }
    bits
}

/// Reassembles a byte from levels latched most significant bit first.
pub fn bits_to_byte(bits: &[bool; 8]) -> u8 {
    bits.iter().fold(0, |acc, &bit| (acc << 1) | bit as u8)
}
