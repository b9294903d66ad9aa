//! Errors reported by the link driver.
//!
//! Line conditions the protocol expects (a silent console, a garbled pulse) are
//! not errors; they arrive as [`BitValue::Timeout`](crate::encoding::BitValue::Timeout)
//! and [`BitValue::Noise`](crate::encoding::BitValue::Noise). The variants here
//! cover what the protocol cannot express in-band.

use crate::driver::LinkMode;
use embedded_hal::digital::ErrorKind;

/// Error type for link operations.
#[derive(PartialEq, Eq, Clone, Copy, Debug, thiserror::Error)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Error {
    /// A pin read or write failed.
    #[error("GPIO error: {0:?}")]
    Pin(ErrorKind),
    /// The console kept sending bits past the stream capacity.
    #[error("bit stream exceeded its capacity of {capacity} elements")]
    StreamOverflow {
        /// Capacity of the stream that overflowed.
        capacity: usize,
    },
    /// A bit was appended after the stream's terminating timeout.
    #[error("bit stream is already terminated")]
    StreamClosed,
    /// The line is owned by another operation.
    #[error("link is busy ({0:?})")]
    Busy(LinkMode),
    /// A receive result was polled but no receive was started.
    #[error("no receive in progress")]
    NotReceiving,
    /// The global driver slot is empty; it was never set up.
    #[error("link driver not initialized")]
    NotInitialized,
    /// A [`LinkConfig`](crate::driver::LinkConfig) value the driver cannot work with.
    #[error("invalid link config: {0}")]
    InvalidConfig(&'static str),
}

impl Error {
    pub(crate) fn pin<E: embedded_hal::digital::Error>(err: E) -> Self {
        Error::Pin(err.kind())
    }
}
