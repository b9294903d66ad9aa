//! # gblink
//!
//! A portable, no_std Rust host driver for the Game Boy reaction tester link: a
//! half-duplex, software-clocked serial line between a host board and a console.
//!
//! This driver implements both directions of the link in software using:
//! - `embedded-hal` traits for digital I/O and delays
//! - a sampled pulse-width demodulator for the console's replies
//! - interrupt-safe driver access with `critical-section`
//! - a pluggable microsecond [`Clock`](timer::Clock)
//!
//! ## Crate features
//! | Feature               | Description |
//! |-----------------------|-------------|
//! | `std`                 | Disables `#![no_std]` support, replaces `heapless::Vec`s with
//! `std::vec::Vec`s and adds `timer::StdClock` |
//! | `timer-isr` (default) | Uses `critical_section::with` for interrupt-driven receive |
//! | `defmt-0-3`           | Uses `defmt` logging |
//! | `log`                 | Uses `log` logging |
//!
//! ## Protocol
//!
//! - **Host to console**: one byte per frame, most significant bit first, clocked
//!   by the host on a dedicated clock line
//! - **Console to host**: one high pulse per bit on a single line; a short pulse
//!   is `1`, a long pulse is `0`, anything else is noise
//! - **End of stream**: five seconds without a pulse
//!
//! Values arrive most significant bit first and are rebuilt by scanning the
//! stream backwards from its end (see [`stream::decode`]).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gblink::driver::LinkDriver;
//! use gblink::session::{Instruction, ReactionSession};
//! use gblink::timer::TickClock;
//!
//! let link = LinkDriver::new(clk, dout, din, delay, TickClock::new(), None)?;
//! let mut session = ReactionSession::new(link);
//! let reading = session.play_round(Instruction::A, 3_000)?;
//! if let Some(time) = reading.reaction_time() {
//!     // time.as_millis()
//! }
//! ```
//!
//! ## Integration Notes
//!
//! - The timing constants in [`consts`] are shared with the console firmware
//! - Only one driver instance should be active at a time in interrupt-driven mode
//!
//! --
//! Designed for `#![no_std]` use in resource-constrained embedded environments.

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results
)]
#![cfg_attr(not(any(feature = "std", test)), no_std)]

#[cfg(feature = "timer-isr")]
pub use critical_section;

#[cfg(not(feature = "std"))]
pub use heapless;

#[macro_use]
mod fmt;

pub mod consts;
pub mod driver;
pub mod encoding;
pub mod error;
pub mod pulse;
pub mod session;
pub mod stream;
pub mod timer;

pub use driver::{LinkConfig, LinkDriver, LinkMode};
pub use encoding::{BitValue, Timing};
pub use error::Error;
pub use stream::BitStream;
