//! Bit stream assembly and value reconstruction.
//!
//! After finishing an instruction the console reports a counter, one pulse per
//! bit, most significant bit first, and then goes quiet. The host collects
//! pulses until the quiet period produces a [`BitValue::Timeout`], which closes
//! the stream.
//!
//! A stream has an implicit start marker before its first element. It is the
//! lower bound of the backward scan in [`decode`] and is never stored.
//!
//! ```text
//! [start] One Zero Noise One Timeout
//!          4   0    -    1           => 5
//! ```

#[cfg(not(feature = "std"))]
use heapless::Vec;
#[cfg(feature = "std")]
use std::vec::Vec;

use crate::consts::MAX_STREAM_LEN;
use crate::encoding::{BitValue, Timing};
use crate::error::Error;
use crate::pulse::PulseClassifier;

/// Reconstructs the value carried by a received bit sequence.
///
/// The scan starts just before the trailing [`BitValue::Timeout`] (or at the last
/// element if the sequence is not terminated) and runs back to the start. The
/// element nearest the terminator is the least significant bit. Elements that do
/// not carry a digit are skipped without shifting the weight of the others.
/// Digits beyond 64 positions of significance are ignored.
///
/// A sequence without any digit decodes to `0`. Use [`BitStream::value`] to
/// tell that apart from a received zero.
pub fn decode(bits: &[BitValue]) -> u64 {
    let body = match bits.split_last() {
        Some((BitValue::Timeout, rest)) => rest,
        _ => bits,
    };
    let mut value: u64 = 0;
    let mut weight: Option<u64> = Some(1);
    for bit in body.iter().rev() {
        let Some(digit) = bit.digit() else {
            continue;
        };
        let Some(w) = weight else {
            break;
        };
        value += u64::from(digit) * w;
        weight = w.checked_mul(2);
    }
    value
}

/// An ordered sequence of received [`BitValue`]s with an explicit terminated flag.
///
/// The stream closes when a [`BitValue::Timeout`] is pushed; nothing can be
/// appended after that. A closed stream therefore always ends with exactly one
/// timeout.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BitStream {
    /// Received elements in arrival order.
    #[cfg(not(feature = "std"))]
    bits: Vec<BitValue, MAX_STREAM_LEN>,

    /// Received elements in arrival order.
    #[cfg(feature = "std")]
    bits: Vec<BitValue>,

    capacity: usize,
    closed: bool,
}

impl Default for BitStream {
    fn default() -> Self {
        Self::new()
    }
}

impl BitStream {
    /// Creates an empty, open stream holding up to [`MAX_STREAM_LEN`] elements.
    pub fn new() -> Self {
        Self::with_capacity(MAX_STREAM_LEN)
    }

    /// Creates an empty, open stream holding up to `capacity` elements.
    ///
    /// Without the `std` feature the capacity is clamped to [`MAX_STREAM_LEN`].
    pub fn with_capacity(capacity: usize) -> Self {
        #[cfg(not(feature = "std"))]
        let capacity = capacity.min(MAX_STREAM_LEN);
        Self {
            bits: Vec::new(),
            capacity: capacity.max(1),
            closed: false,
        }
    }

    /// Builds a stream from already classified elements.
    ///
    /// Fails like [`push`](BitStream::push) would.
    pub fn from_bits(bits: &[BitValue]) -> Result<Self, Error> {
        let mut stream = Self::with_capacity(bits.len());
        for &bit in bits {
            let _ = stream.push(bit)?;
        }
        Ok(stream)
    }

    /// Appends an element. Returns `true` if the element closed the stream.
    pub fn push(&mut self, bit: BitValue) -> Result<bool, Error> {
        if self.closed {
            return Err(Error::StreamClosed);
        }
        if self.bits.len() >= self.capacity {
            return Err(Error::StreamOverflow {
                capacity: self.capacity,
            });
        }
        #[cfg(not(feature = "std"))]
        self.bits.push(bit).map_err(|_| Error::StreamOverflow {
            capacity: self.capacity,
        })?;
        #[cfg(feature = "std")]
        self.bits.push(bit);
        self.closed = bit == BitValue::Timeout;
        Ok(self.closed)
    }

    /// Whether the terminating timeout has been received.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of received elements, terminator included.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Whether nothing has been received yet.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Maximum number of elements the stream accepts.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The received elements in arrival order.
    pub fn as_slice(&self) -> &[BitValue] {
        &self.bits
    }

    /// Number of elements carrying a digit.
    pub fn data_bits(&self) -> usize {
        self.bits.iter().filter(|bit| bit.is_data()).count()
    }

    /// Number of pulses classified as noise.
    pub fn noise_count(&self) -> usize {
        self.bits
            .iter()
            .filter(|&&bit| bit == BitValue::Noise)
            .count()
    }

    /// The carried value, `0` if no digit was received. See [`decode`].
    pub fn decode(&self) -> u64 {
        decode(&self.bits)
    }

    /// The carried value, or `None` if the stream holds no digit at all.
    pub fn value(&self) -> Option<u64> {
        if self.data_bits() == 0 {
            None
        } else {
            Some(self.decode())
        }
    }

    /// Empties the stream and reopens it.
    pub fn clear(&mut self) {
        self.bits.clear();
        self.closed = false;
    }
}

#[derive(Debug)]
/// Builds a [`BitStream`] from line samples.
///
/// Wraps a [`PulseClassifier`] and re-arms it after every classified pulse until
/// the classifier reports a timeout.
pub struct StreamAssembler {
    /// The pulse classifier.
    pub classifier: PulseClassifier,
    stream: BitStream,
}

impl StreamAssembler {
    /// Creates an idle assembler.
    pub fn new(timing: Timing, inverted: bool, capacity: usize) -> Self {
        Self {
            classifier: PulseClassifier::new(timing, inverted),
            stream: BitStream::with_capacity(capacity),
        }
    }

    /// Discards anything received so far and starts waiting for the first pulse.
    pub fn start(&mut self, now_us: u64) {
        self.stream.clear();
        self.classifier.arm(now_us);
    }

    /// Stops sampling without touching what was received.
    pub fn stop(&mut self) {
        self.classifier.disarm();
    }

    /// Whether the assembler is collecting pulses.
    pub fn is_running(&self) -> bool {
        self.classifier.is_armed()
    }

    /// Feeds one sample of the data line taken at `now_us`.
    ///
    /// Returns `true` once the stream is closed. On overflow the assembler stops.
    pub fn update(&mut self, sample: bool, now_us: u64) -> Result<bool, Error> {
        if self.stream.is_closed() {
            return Ok(true);
        }
        let Some(bit) = self.classifier.update(sample, now_us) else {
            return Ok(false);
        };
        trace!("pulse classified as {:?}", bit);
        let closed = match self.stream.push(bit) {
            Ok(closed) => closed,
            Err(err) => {
                self.classifier.disarm();
                return Err(err);
            }
        };
        if !closed {
            self.classifier.arm(now_us);
        }
        Ok(closed)
    }

    /// The stream received so far.
    pub fn stream(&self) -> &BitStream {
        &self.stream
    }

    /// Takes the stream out, leaving an empty one of the same capacity behind.
    pub fn take(&mut self) -> BitStream {
        let capacity = self.stream.capacity();
        core::mem::replace(&mut self.stream, BitStream::with_capacity(capacity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BitValue::{Noise, One, Timeout, Zero};

    #[test]
    fn test_decode_weights_from_terminator() {
        assert_eq!(decode(&[One, Zero, One, Timeout]), 0b101);
        assert_eq!(decode(&[One, One, Zero, Timeout]), 0b110);
        assert_eq!(decode(&[Zero, Zero, One, Timeout]), 1);
        assert_eq!(decode(&[One, Zero, Zero, Zero, Zero, Timeout]), 16);
    }

    #[test]
    fn test_decode_skips_noise_without_shifting() {
        let clean = decode(&[One, Zero, One, One, Timeout]);
        assert_eq!(clean, 0b1011);
        assert_eq!(decode(&[Noise, One, Zero, One, One, Timeout]), clean);
        assert_eq!(decode(&[One, Noise, Zero, One, One, Timeout]), clean);
        assert_eq!(decode(&[One, Zero, One, Noise, Noise, One, Timeout]), clean);
        assert_eq!(decode(&[One, Zero, One, One, Noise, Timeout]), clean);
    }

    #[test]
    fn test_decode_timeout_only_is_zero() {
        assert_eq!(decode(&[Timeout]), 0);
        assert_eq!(decode(&[]), 0);
        assert_eq!(decode(&[Noise, Noise, Timeout]), 0);
    }

    #[test]
    fn test_decode_unterminated_uses_last_element() {
        assert_eq!(decode(&[One, Zero]), 2);
    }

    #[test]
    fn test_decode_ignores_bits_beyond_u64() {
        let mut bits = [One; 66];
        bits[65] = Timeout;
        assert_eq!(decode(&bits), u64::MAX);
    }

    #[test]
    fn test_stream_closes_on_timeout() {
        let mut stream = BitStream::new();
        assert_eq!(stream.push(One), Ok(false));
        assert_eq!(stream.push(Noise), Ok(false));
        assert_eq!(stream.push(Timeout), Ok(true));
        assert!(stream.is_closed());
        assert_eq!(stream.push(Zero), Err(Error::StreamClosed));
        assert_eq!(stream.as_slice(), &[One, Noise, Timeout]);
        assert_eq!(stream.data_bits(), 1);
        assert_eq!(stream.noise_count(), 1);
    }

    #[test]
    fn test_stream_value_distinguishes_empty_from_zero() {
        let empty = BitStream::from_bits(&[Timeout]).unwrap();
        assert_eq!(empty.decode(), 0);
        assert_eq!(empty.value(), None);

        let zero = BitStream::from_bits(&[Zero, Timeout]).unwrap();
        assert_eq!(zero.decode(), 0);
        assert_eq!(zero.value(), Some(0));
    }

    #[test]
    fn test_stream_overflow() {
        let mut stream = BitStream::with_capacity(2);
        assert_eq!(stream.push(One), Ok(false));
        assert_eq!(stream.push(One), Ok(false));
        assert_eq!(
            stream.push(Timeout),
            Err(Error::StreamOverflow { capacity: 2 })
        );
        assert!(!stream.is_closed());
    }

    #[test]
    fn test_assembler_collects_until_timeout() {
        let mut assembler = StreamAssembler::new(Timing::V1, false, MAX_STREAM_LEN);
        assembler.start(0);
        // short pulse
        assert_eq!(assembler.update(true, 100_000), Ok(false));
        assert_eq!(assembler.update(false, 350_000), Ok(false));
        // long pulse
        assert_eq!(assembler.update(true, 600_000), Ok(false));
        assert_eq!(assembler.update(false, 1_200_000), Ok(false));
        // silence
        assert_eq!(assembler.update(false, 6_000_000), Ok(false));
        assert_eq!(assembler.update(false, 6_200_001), Ok(true));
        assert!(!assembler.is_running());

        let stream = assembler.take();
        assert_eq!(stream.as_slice(), &[One, Zero, Timeout]);
        assert_eq!(stream.value(), Some(2));
        assert!(assembler.stream().is_empty());
    }

    #[test]
    fn test_assembler_stops_on_overflow() {
        let mut assembler = StreamAssembler::new(Timing::V1, false, 1);
        assembler.start(0);
        assert_eq!(assembler.update(true, 10), Ok(false));
        assert_eq!(assembler.update(false, 300_010), Ok(false));
        assert_eq!(assembler.update(true, 300_020), Ok(false));
        assert_eq!(
            assembler.update(false, 600_020),
            Err(Error::StreamOverflow { capacity: 1 })
        );
        assert!(!assembler.is_running());
    }
}
