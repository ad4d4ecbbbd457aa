use crate::{Error, Result};
use arrayvec::ArrayVec;

/// An 8-bit-per-channel color.
///
/// Inside a grid buffer the three fields hold the bytes in wire order, so after a write
/// through a non-RGB [`ColorOrder`](crate::ColorOrder) `r` is simply the first byte sent.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }
}

impl From<(u8, u8, u8)> for Color {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Color { r, g, b }
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Color { r, g, b }
    }
}

// slot order, which is also transmission order
impl From<Color> for [u8; 3] {
    fn from(color: Color) -> Self {
        [color.r, color.g, color.b]
    }
}

// Generic colors:
pub const C_RED: Color = Color { r: 255, g: 0, b: 0 };
pub const C_ORANGE: Color = Color { r: 255, g: 127, b: 0 };
pub const C_YELLOW: Color = Color { r: 255, g: 255, b: 0 };
pub const C_GREEN: Color = Color { r: 0, g: 255, b: 0 };
pub const C_SKY_BLUE: Color = Color { r: 0, g: 255, b: 255 };
pub const C_BLUE: Color = Color { r: 0, g: 0, b: 255 };
pub const C_PURPLE: Color = Color { r: 255, g: 0, b: 255 };
pub const C_WHITE: Color = Color { r: 255, g: 255, b: 255 };
pub const C_OFF: Color = Color { r: 0, g: 0, b: 0 };

/// A small lookup table from single-character identifiers to colors.
///
/// Capacity is fixed at `N` entries. Identifiers are unique: adding an id that is
/// already present replaces its color in place, so insertion order is only extended by
/// new ids. Lookups are a linear scan.
#[derive(Clone, Debug, Default)]
pub struct Palette<const N: usize> {
    entries: ArrayVec<(char, Color), N>,
}

impl<const N: usize> Palette<N> {
    pub fn new() -> Self {
        Palette { entries: ArrayVec::new() }
    }

    /// Adds `id`, or recolors it if it is already known.
    ///
    /// Fails with [`Error::PaletteFull`] only when `id` is new and all `N` slots are taken;
    /// the palette is left unchanged in that case.
    pub fn add_color(&mut self, id: char, color: Color) -> Result<()> {
        if let Some(entry) = self.entries.iter_mut().find(|(known, _)| *known == id) {
            entry.1 = color;
            return Ok(());
        }
        self.entries.try_push((id, color)).map_err(|_| Error::PaletteFull)
    }

    pub fn lookup(&self, id: char) -> Option<Color> {
        self.entries.iter().find(|(known, _)| *known == id).map(|(_, color)| *color)
    }

    pub fn contains(&self, id: char) -> bool {
        self.lookup(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        N
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (char, Color)> + '_ {
        self.entries.iter().copied()
    }
}
