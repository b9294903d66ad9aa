//! Reaction tester game flow on top of [`LinkDriver`].
//!
//! A round goes like this:
//!
//! 1. The host sends [`HANDSHAKE_START`] once to put the console into game mode.
//! 2. After a delay of the caller's choosing, the host sends an [`Instruction`].
//! 3. The console shows the prompt and starts counting timer interrupts.
//! 4. When the player presses the right button the console raises its data line.
//! 5. The console then sends the interrupt count as a bit stream, which the host
//!    turns into a [`ReactionTime`].
//!
//! Randomness (which instruction, how long to wait) is left to the caller.
//!
//! [`ReactionSession::check_receive`] and [`ReactionSession::check_send`] run
//! the console's link self tests.

use core::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use libm::round;

use crate::consts::{ACK_FAIL, ACK_PASS, DEVICE_INTERRUPTS_PER_SECOND, HANDSHAKE_START};
use crate::driver::LinkDriver;
use crate::encoding::BitValue;
use crate::error::Error;
use crate::stream::BitStream;
use crate::timer::Clock;

/// Button prompt shown by the console.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
#[repr(u8)]
pub enum Instruction {
    /// D-pad up
    Up = 0,
    /// D-pad down
    Down = 1,
    /// D-pad left
    Left = 2,
    /// D-pad right
    Right = 3,
    /// A button
    A = 4,
    /// B button
    B = 5,
    /// Start button
    Start = 6,
    /// Select button
    Select = 7,
}

impl Instruction {
    /// All prompts, in wire order.
    pub const ALL: [Instruction; 8] = [
        Instruction::Up,
        Instruction::Down,
        Instruction::Left,
        Instruction::Right,
        Instruction::A,
        Instruction::B,
        Instruction::Start,
        Instruction::Select,
    ];

    /// The byte sent on the wire.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Looks up a prompt by its wire byte.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }
}

/// A reaction time as counted by the console's timer interrupt.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct ReactionTime {
    interrupts: u64,
}

impl ReactionTime {
    /// Wraps an interrupt count received from the console.
    pub fn from_interrupts(interrupts: u64) -> Self {
        Self { interrupts }
    }

    /// The raw interrupt count.
    pub fn interrupts(self) -> u64 {
        self.interrupts
    }

    /// Seconds, as a float.
    pub fn as_secs_f32(self) -> f32 {
        self.interrupts as f32 / DEVICE_INTERRUPTS_PER_SECOND as f32
    }

    /// Milliseconds, rounded to the nearest.
    pub fn as_millis(self) -> u64 {
        round(self.interrupts as f64 * 1_000.0 / DEVICE_INTERRUPTS_PER_SECOND as f64) as u64
    }

    /// Microseconds, truncated.
    pub fn as_micros(self) -> u64 {
        self.interrupts.saturating_mul(1_000_000) / u64::from(DEVICE_INTERRUPTS_PER_SECOND)
    }

    /// As a [`Duration`], truncated to whole microseconds.
    pub fn as_duration(self) -> Duration {
        Duration::from_micros(self.as_micros())
    }
}

/// The outcome of one round.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Reading {
    /// Decoded interrupt count, `None` if the console sent no digit at all.
    pub count: Option<u64>,
    /// Number of pulses that carried a digit.
    pub data_bits: usize,
    /// Number of pulses discarded as noise.
    pub noise: usize,
}

impl Reading {
    /// Summarizes a received stream.
    pub fn from_stream(stream: &BitStream) -> Self {
        Self {
            count: stream.value(),
            data_bits: stream.data_bits(),
            noise: stream.noise_count(),
        }
    }

    /// The reaction time, if the console sent one.
    pub fn reaction_time(&self) -> Option<ReactionTime> {
        self.count.map(ReactionTime::from_interrupts)
    }
}

/// Drives reaction tester rounds over a [`LinkDriver`].
#[derive(Debug)]
pub struct ReactionSession<CLK, DOUT, DIN, D, C>
where
    CLK: OutputPin,
    DOUT: OutputPin,
    DIN: InputPin,
    D: DelayNs,
    C: Clock,
{
    /// The underlying link.
    pub link: LinkDriver<CLK, DOUT, DIN, D, C>,
    started: bool,
}

impl<CLK, DOUT, DIN, D, C> ReactionSession<CLK, DOUT, DIN, D, C>
where
    CLK: OutputPin,
    DOUT: OutputPin,
    DIN: InputPin,
    D: DelayNs,
    C: Clock,
{
    /// Wraps a driver. No bytes are sent until [`start_game()`](Self::start_game).
    pub fn new(link: LinkDriver<CLK, DOUT, DIN, D, C>) -> Self {
        Self {
            link,
            started: false,
        }
    }

    /// Whether the handshake has been sent.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Sends the game start handshake.
    pub fn start_game(&mut self) -> Result<(), Error> {
        self.link.send_byte(HANDSHAKE_START)?;
        self.started = true;
        debug!("game started");
        Ok(())
    }

    /// Plays one round and returns what the console reported.
    ///
    /// Sends the handshake first if that has not happened yet, waits
    /// `pre_delay_ms`, sends `instruction`, waits for the player and receives the
    /// reaction time.
    pub fn play_round(
        &mut self,
        instruction: Instruction,
        pre_delay_ms: u32,
    ) -> Result<Reading, Error> {
        if !self.started {
            self.start_game()?;
        }
        self.link.wait_us(pre_delay_ms.saturating_mul(1_000));
        self.link.send_byte(instruction.code())?;
        self.link.wait_for_finish()?;
        let stream = self.link.receive_sequence()?;
        let reading = Reading::from_stream(&stream);
        if reading.count.is_none() {
            warn!("console finished without sending a count");
        }
        Ok(reading)
    }

    /// Receives a value from the console and acknowledges it.
    ///
    /// Sends [`ACK_PASS`] if the value equals `expected`, [`ACK_FAIL`]
    /// otherwise, and returns whether it matched.
    pub fn check_receive(&mut self, expected: u64) -> Result<bool, Error> {
        let stream = self.link.receive_sequence()?;
        let passed = stream.decode() == expected;
        self.link
            .send_byte(if passed { ACK_PASS } else { ACK_FAIL })?;
        Ok(passed)
    }

    /// Sends a value to the console and waits for its one-bit verdict.
    ///
    /// Timeouts are skipped while waiting; the console answers with a short
    /// pulse (`1`) if it decoded `value` correctly.
    pub fn check_send(&mut self, value: u8) -> Result<bool, Error> {
        self.link.send_byte(value)?;
        loop {
            match self.link.receive_bit()? {
                BitValue::Timeout => continue,
                bit => return Ok(bit == BitValue::One),
            }
        }
    }

    /// Gives the driver back.
    pub fn into_inner(self) -> LinkDriver<CLK, DOUT, DIN, D, C> {
        self.link
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_codes() {
        for (i, instruction) in Instruction::ALL.iter().enumerate() {
            assert_eq!(instruction.code() as usize, i);
            assert_eq!(Instruction::from_code(i as u8), Some(*instruction));
        }
        assert_eq!(Instruction::from_code(8), None);
    }

    #[test]
    fn test_reaction_time_conversion() {
        let t = ReactionTime::from_interrupts(128);
        assert_eq!(t.as_secs_f32(), 0.5);
        assert_eq!(t.as_millis(), 500);
        assert_eq!(t.as_micros(), 500_000);
        assert_eq!(t.as_duration(), Duration::from_millis(500));
        assert_eq!(ReactionTime::from_interrupts(1).as_millis(), 4);
        assert_eq!(ReactionTime::from_interrupts(3).as_micros(), 11_718);
    }

    #[test]
    fn test_reading_from_stream() {
        use BitValue::{Noise, One, Timeout, Zero};
        let stream = BitStream::from_bits(&[One, Noise, One, Zero, Timeout]).unwrap();
        let reading = Reading::from_stream(&stream);
        assert_eq!(reading.count, Some(6));
        assert_eq!(reading.data_bits, 3);
        assert_eq!(reading.noise, 1);
        assert_eq!(
            reading.reaction_time().map(ReactionTime::interrupts),
            Some(6)
        );

        let silent = Reading::from_stream(&BitStream::from_bits(&[Timeout]).unwrap());
        assert_eq!(silent.count, None);
        assert_eq!(silent.reaction_time(), None);
    }
}
