//! Sampled pulse-width demodulator for the console's data line.
//!
//! The console transmits a bit by raising its data line and holding it high for
//! a short or long time. This module turns a series of line samples into
//! [`BitValue`]s without blocking: each call to
//! [`PulseClassifier::update`] takes one sample and the time it was taken.
//! The caller decides how samples are produced (a delay loop, a timer
//! interrupt, an edge callback that feeds both edges).

use crate::encoding::{BitValue, Timing, classify_pulse};

/// Where the classifier is within the current bit.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum PulseState {
    /// Not armed. Samples are ignored.
    #[default]
    Idle,
    /// Armed at `armed_at`, line has not risen yet.
    WaitingForRise {
        /// Time the classifier was armed, in microseconds.
        armed_at: u64,
    },
    /// Line rose at `rose_at` and is still high.
    TimingHighPulse {
        /// Time the line was first seen high, in microseconds.
        rose_at: u64,
    },
}

#[derive(Debug)]
/// A state machine measuring one high pulse at a time.
///
/// Once armed it waits for the data line to rise. If nothing happens for
/// `deadline_us` it reports [`BitValue::Timeout`]. After a rise it waits for the
/// fall and classifies the width with [`classify_pulse`]. A line that stays high
/// for longer than the deadline is treated as stuck and also reports
/// [`BitValue::Timeout`], so a classifier always finishes within twice the
/// deadline.
pub struct PulseClassifier {
    /// The current position within the bit.
    pub state: PulseState,
    timing: Timing,

    /// Whether the read samples should be inverted.
    /// e.g. HIGH => LOW
    inverted: bool,
}

impl PulseClassifier {
    /// Creates an idle classifier.
    pub fn new(timing: Timing, inverted: bool) -> Self {
        Self {
            state: PulseState::Idle,
            timing,
            inverted,
        }
    }

    /// The timing contract this classifier measures against.
    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Starts waiting for the next pulse.
    pub fn arm(&mut self, now_us: u64) {
        self.state = PulseState::WaitingForRise { armed_at: now_us };
    }

    /// Drops any measurement in progress.
    pub fn disarm(&mut self) {
        self.state = PulseState::Idle;
    }

    /// Whether a pulse is being waited for or measured.
    pub fn is_armed(&self) -> bool {
        self.state != PulseState::Idle
    }

    /// Feeds one sample of the data line taken at `now_us`.
    ///
    /// Returns the classified bit once it is known; the classifier is then idle
    /// again and must be re-armed for the next bit.
    pub fn update(&mut self, sample: bool, now_us: u64) -> Option<BitValue> {
        let high = sample != self.inverted;
        let deadline = self.timing.deadline_us as u64;
        match self.state {
            PulseState::Idle => None,
            PulseState::WaitingForRise { armed_at } => {
                if high {
                    self.state = PulseState::TimingHighPulse { rose_at: now_us };
                    None
                } else if now_us.saturating_sub(armed_at) > deadline {
                    self.state = PulseState::Idle;
                    Some(BitValue::Timeout)
                } else {
                    None
                }
            }
            PulseState::TimingHighPulse { rose_at } => {
                let width = now_us.saturating_sub(rose_at);
                if !high {
                    self.state = PulseState::Idle;
                    Some(classify_pulse(width, &self.timing))
                } else if width > deadline {
                    // stuck high
                    self.state = PulseState::Idle;
                    Some(BitValue::Timeout)
                } else {
                    None
                }
            }
        }
    }
}
