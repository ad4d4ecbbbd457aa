//! Bit-banged driver for WS2812B LED grids.
//!
//! A [`LedGrid`](grid::LedGrid) borrows a caller-owned buffer of [`Color`](colors::Color)
//! slots, maps `(x, y)` coordinates onto it through the panel's zig-zag [`Wiring`] and
//! stores every color already reordered for the chip's [`ColorOrder`]. Calling
//! [`LedGrid::sync`](grid::LedGrid::sync) then shifts the whole buffer out of one GPIO pin
//! with the WS2812B pulse timing and holds the line low for the latch.
//!
//! The pin is bound through a [`PinResolver`](pins::PinResolver) and the bits are paced by
//! a [`PeriodicTimer`](hardware::PeriodicTimer), so the same code drives real hardware
//! (see the `bl602` feature) or the [`recording`] fakes used by the tests.
#![cfg_attr(not(test), no_std)]

#[cfg(all(feature = "bl602", not(target_arch = "riscv32")))]
compile_error!("The 'bl602' feature is only supported on riscv32 targets");

#[cfg(all(feature = "bl602", target_arch = "riscv32"))]
pub mod bl602;
pub mod colors;
pub mod grid;
pub mod hardware;
pub mod leds;
pub mod pins;
pub mod recording;
pub mod utility;

use core::fmt;

pub use leds::ws2812b::{ColorOrder, PhysicalGrid, StripTimings, Wiring};

/// Everything that can go wrong while binding or drawing on a grid.
///
/// The transmission itself has no failure mode: once a [`grid::LedGrid`] exists,
/// [`grid::LedGrid::sync`] always completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// The platform has no output register for this pin id.
    UnknownPin(u8),
    /// The pin is already bound to another handle.
    PinInUse(u8),
    /// The pixel buffer holds fewer slots than `columns * rows`.
    BufferTooSmall { needed: usize, available: usize },
    /// The strip timings cannot produce a valid bit encoding.
    InvalidTimings,
    /// A coordinate, offset, row or column lies outside the grid.
    OutOfBounds,
    /// The palette has no room for another identifier.
    PaletteFull,
    /// A render character has no palette entry.
    UnknownColorId(char),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownPin(pin) => write!(f, "pin {} has no output register", pin),
            Error::PinInUse(pin) => write!(f, "pin {} is already in use", pin),
            Error::BufferTooSmall { needed, available } => {
                write!(f, "pixel buffer holds {} slots, grid needs {}", available, needed)
            }
            Error::InvalidTimings => f.write_str("strip timings cannot encode bits"),
            Error::OutOfBounds => f.write_str("position outside the grid"),
            Error::PaletteFull => f.write_str("palette is full"),
            Error::UnknownColorId(id) => write!(f, "no palette color for {:?}", id),
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
