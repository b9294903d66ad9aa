//! Constants used across the link protocol implementation.
//!
//! This module defines the timing contract shared with the console firmware,
//! the handshake values the console expects, and the buffer sizing used by the
//! receive path.
//!
//! ## Key Concepts
//!
//! - **Clocked output**: The host drives both the clock and the data line. Each
//!   byte is framed by a settle delay before and a short gap after.
//! - **Pulse-width input**: The console holds its data line high for a short
//!   (`1`) or long (`0`) time. Anything outside the two bands is noise.
//! - **Deadline**: If the console stays silent for the deadline, the receiver
//!   reports a timeout, which also terminates a bit stream.
//!
//! The timing values are not tunables. The console firmware hard-codes its side
//! of them, so any change here is a protocol change and must bump
//! [`PROTOCOL_VERSION`].

/// Version of the timing contract described by the constants in this module.
pub const PROTOCOL_VERSION: u8 = 1;

/// Delay before the first clock pulse of a byte, in microseconds.
///
/// Gives the console time to enter its receive routine.
pub const PRE_FRAME_SETTLE_US: u32 = 200_000;

/// Time the clock is held low, and then high, for each bit, in microseconds.
pub const CLOCK_HALF_PERIOD_US: u32 = 61;

/// Gap after the last clock pulse of a byte, in microseconds.
pub const POST_FRAME_US: u32 = 200;

/// How long the receiver waits for the data line to rise before giving up, in microseconds.
pub const RX_DEADLINE_US: u32 = 5_000_000;

/// Pulses shorter than this are noise, in microseconds.
pub const PULSE_NOISE_LOW_US: u32 = 200_000;

/// Boundary between a short (`1`) and a long (`0`) pulse, in microseconds.
///
/// A pulse of exactly this width is read as `0`.
pub const PULSE_MID_US: u32 = 400_000;

/// Pulses longer than this are noise, in microseconds.
pub const PULSE_NOISE_HIGH_US: u32 = 1_000_000;

/// Default interval between two samples of the data line, in microseconds.
pub const DEFAULT_SAMPLE_PERIOD_US: u32 = 1_000;

/// Maximum number of elements a received bit stream may hold, terminator included.
///
/// The console sends at most 32 significant bits; the rest is headroom for noise pulses.
pub const MAX_STREAM_LEN: usize = 64;

/// Byte the host sends to start a game.
pub const HANDSHAKE_START: u8 = 100;

/// Alternate start byte the console also accepts.
pub const HANDSHAKE_ALT: u8 = 50;

/// Acknowledgement byte sent when a self-test value matched.
pub const ACK_PASS: u8 = 1;

/// Acknowledgement byte sent when a self-test value did not match.
pub const ACK_FAIL: u8 = 0;

/// Rate of the console's timer interrupt, used to turn a received count into time.
pub const DEVICE_INTERRUPTS_PER_SECOND: u32 = 256;
