use crate::colors::{self as c, Color, Palette};
use crate::hardware::{HardwareController, PeriodicTimer};
use crate::leds::ws2812b::{self, ColorOrder, PhysicalGrid, StripTimings, Wiring};
use crate::pins::PinResolver;
use crate::{Error, Result};
use embedded_hal::digital::blocking::OutputPin;

/// A WS2812B panel bound to one data pin and drawn into a borrowed buffer.
///
/// The buffer is owned by the caller and must hold at least `columns * rows` slots; only
/// that prefix is ever read or written. Colors are stored after reordering for the chip,
/// so the buffer is a byte-exact image of the next frame and [`LedGrid::get_pixel`]
/// returns wire order, not the color that was passed in.
///
/// Writes take effect on the LEDs at the next [`LedGrid::sync`].
pub struct LedGrid<'a, P, T>
where
    P: OutputPin,
    T: PeriodicTimer,
{
    pin_id: u8,
    hc: HardwareController<P, T>,
    pixels: &'a mut [Color],
    grid: PhysicalGrid,
}

impl<'a, P, T> LedGrid<'a, P, T>
where
    P: OutputPin,
    T: PeriodicTimer,
{
    /// Binds `pin_id` through `resolver` and takes over `pixels` for a `grid`-shaped panel.
    ///
    /// Fails if the pin cannot be resolved (unknown or already bound), if `pixels` is
    /// shorter than the panel, or if the panel's timings cannot encode bits. The pin is
    /// resolved last so a failed construction never leaves it claimed. The buffer is not
    /// cleared.
    pub fn new<R>(
        resolver: &mut R,
        pin_id: u8,
        timer: T,
        pixels: &'a mut [Color],
        grid: &PhysicalGrid,
    ) -> Result<Self>
    where
        R: PinResolver<Pin = P>,
    {
        let needed = grid.led_count();
        if pixels.len() < needed {
            return Err(Error::BufferTooSmall { needed, available: pixels.len() });
        }
        if !grid.strip_timings.is_valid() {
            return Err(Error::InvalidTimings);
        }

        let pin = match resolver.resolve(pin_id) {
            Ok(pin) => pin,
            Err(e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("ws2812b: cannot bind pin {}: {}", pin_id, e);
                return Err(e);
            }
        };

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "ws2812b: pin {} drives a {}x{} grid ({})",
            pin_id,
            grid.columns,
            grid.rows,
            grid.color_order
        );

        let mut hc = HardwareController::new(pin, timer);
        hc.set_low();
        Ok(LedGrid { pin_id, hc, pixels: &mut pixels[..needed], grid: *grid })
    }

    /// Gives the pin back to `resolver` and returns the timer.
    pub fn release<R>(self, resolver: &mut R) -> T
    where
        R: PinResolver<Pin = P>,
    {
        let (_pin, timer) = self.hc.free();
        resolver.release(self.pin_id);

        #[cfg(feature = "defmt")]
        defmt::debug!("ws2812b: released pin {}", self.pin_id);

        timer
    }

    pub fn pin_id(&self) -> u8 {
        self.pin_id
    }

    pub fn columns(&self) -> usize {
        self.grid.columns
    }

    pub fn rows(&self) -> usize {
        self.grid.rows
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn color_order(&self) -> ColorOrder {
        self.grid.color_order
    }

    pub fn wiring(&self) -> Wiring {
        self.grid.wiring
    }

    pub fn strip_timings(&self) -> &StripTimings {
        &self.grid.strip_timings
    }

    /// The raw buffer, in storage order and wire channel order.
    pub fn pixels(&self) -> &[Color] {
        self.pixels
    }

    /// Sets logical `(x, y)` to `color`.
    ///
    /// Returns [`Error::OutOfBounds`] without touching the buffer if either coordinate is
    /// outside the grid.
    pub fn set_pixel(&mut self, x: usize, y: usize, color: Color) -> Result<()> {
        let encoded = self.grid.color_order.encode(color);
        self.set_pixel_fast(x, y, encoded)
    }

    /// Sets raw buffer slot `offset`, skipping the wiring map entirely.
    pub fn set_pixel_at_offset(&mut self, offset: usize, color: Color) -> Result<()> {
        let encoded = self.grid.color_order.encode(color);
        let slot = self.pixels.get_mut(offset).ok_or(Error::OutOfBounds)?;
        *slot = encoded;
        Ok(())
    }

    pub fn set_all(&mut self, color: Color) {
        let encoded = self.grid.color_order.encode(color);
        self.pixels.fill(encoded);
    }

    /// The stored value at logical `(x, y)`, still in wire channel order.
    ///
    /// Unlike the setters this does not fail: outside the grid it returns black.
    pub fn get_pixel(&self, x: usize, y: usize) -> Color {
        if y >= self.grid.rows {
            return c::C_OFF;
        }
        match self.grid.wiring.map(x, y, self.grid.columns) {
            Ok(offset) => self.pixels[offset],
            Err(_) => c::C_OFF,
        }
    }

    pub fn set_row(&mut self, row: usize, color: Color) -> Result<()> {
        if row >= self.grid.rows {
            return Err(Error::OutOfBounds);
        }
        let encoded = self.grid.color_order.encode(color);
        for x in 0..self.grid.columns {
            self.set_pixel_fast(x, row, encoded).ok();
        }
        Ok(())
    }

    pub fn set_column(&mut self, column: usize, color: Color) -> Result<()> {
        if column >= self.grid.columns {
            return Err(Error::OutOfBounds);
        }
        let encoded = self.grid.color_order.encode(color);
        for y in 0..self.grid.rows {
            self.set_pixel_fast(column, y, encoded).ok();
        }
        Ok(())
    }

    /// Draws ASCII art: one line per row, one `char` per column, each looked up in
    /// `palette`. A space leaves its cell alone.
    ///
    /// One trailing newline is ignored, and art that is empty after that draws nothing,
    /// even on a grid with no rows. The art is checked in full before anything is
    /// written, so on error the buffer is unchanged.
    pub fn render<const N: usize>(&mut self, art: &str, palette: &Palette<N>) -> Result<()> {
        let art = art.strip_suffix('\n').unwrap_or(art);
        if art.is_empty() {
            return Ok(());
        }
        for (y, line) in art.split('\n').enumerate() {
            if y >= self.grid.rows || line.chars().count() > self.grid.columns {
                return Err(Error::OutOfBounds);
            }
            if let Some(id) = line.chars().find(|&id| id != ' ' && !palette.contains(id)) {
                return Err(Error::UnknownColorId(id));
            }
        }

        for (y, line) in art.split('\n').enumerate() {
            for (x, id) in line.chars().enumerate() {
                if let Some(color) = palette.lookup(id).filter(|_| id != ' ') {
                    self.set_pixel(x, y, color)?;
                }
            }
        }
        Ok(())
    }

    /// Sends the buffer to the LEDs and waits out the latch.
    ///
    /// Blocks for `len() * 24` bit periods with interrupts disabled, then for the latch
    /// with interrupts enabled. An empty grid returns at once.
    pub fn sync(&mut self) {
        ws2812b::send_frame(&mut self.hc, &self.grid.strip_timings, self.pixels);
    }

    // Writes an already encoded color; the only place both axes are checked.
    fn set_pixel_fast(&mut self, x: usize, y: usize, encoded: Color) -> Result<()> {
        if y >= self.grid.rows {
            return Err(Error::OutOfBounds);
        }
        let offset = self.grid.wiring.map(x, y, self.grid.columns)?;
        self.pixels[offset] = encoded;
        Ok(())
    }
}
