pub mod ws2812b {
    use crate::colors as c;
    use crate::hardware::{HardwareController, PeriodicTimer};
    use crate::utility::convert_ns_to_slots;
    use crate::{Error, Result};
    use bitvec::prelude::*;
    use embedded_hal::digital::blocking::OutputPin;
    use embedded_time::duration::*;

    /// Pulse timing of the chip, in nanoseconds.
    ///
    /// A bit period of `full_cycle` is cut into `slots` equal slots that the periodic
    /// timer ticks through. A bit is sent as some whole number of high slots followed by
    /// the remaining slots low, so every bit lasts exactly `slots` ticks no matter its
    /// value. `zero_h` and `one_h` are rounded to the nearest slot.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct StripTimings {
        pub zero_h: u32,
        pub one_h: u32,
        pub full_cycle: u32,
        /// Minimum low hold after the last bit.
        pub latch: u32,
        pub slots: u32,
    }

    impl StripTimings {
        /// Datasheet figures on a 3-slot grid of 416ns: a zero is 416ns high and 832ns
        /// low, a one is 832ns high and 416ns low, all within the chip's 150ns tolerance.
        pub const WS2812B: StripTimings =
            StripTimings { zero_h: 400, one_h: 800, full_cycle: 1250, latch: 51_000, slots: 3 };
        /// Same figures on 50ns slots, for timers that can tick that fast.
        pub const WS2812B_FINE: StripTimings =
            StripTimings { zero_h: 400, one_h: 800, full_cycle: 1250, latch: 51_000, slots: 25 };

        /// Length of one timer slot.
        pub const fn slot(&self) -> u32 {
            self.full_cycle / self.slots
        }

        /// Actual bit period after rounding to whole slots.
        pub const fn period(&self) -> u32 {
            self.slot() * self.slots
        }

        pub const fn high_slots(&self, bit: bool) -> u32 {
            let high = if bit { self.one_h } else { self.zero_h };
            high.saturating_add(self.slot() / 2) / self.slot()
        }

        pub const fn low_slots(&self, bit: bool) -> u32 {
            self.slots - self.high_slots(bit)
        }

        /// Latch length in slots, rounded up so the hold is never shorter than `latch`.
        pub fn latch_slots(&self) -> u32 {
            convert_ns_to_slots(Nanoseconds(self.latch), Nanoseconds(self.slot()))
        }

        pub const fn is_valid(&self) -> bool {
            if self.slots < 2 || self.full_cycle < self.slots || self.latch == 0 {
                return false;
            }
            let zero = self.high_slots(false);
            let one = self.high_slots(true);
            zero >= 1 && zero < one && one < self.slots
        }
    }

    #[allow(clippy::upper_case_acronyms)]
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum ColorOrder {
        #[default]
        RGB,
        RBG,
        GRB,
        GBR,
        BRG,
        BGR,
    }

    impl ColorOrder {
        /// Slot that receives the red, green and blue byte respectively.
        pub fn offsets(&self) -> [usize; 3] {
            use ColorOrder::*;
            match self {
                RGB => [0, 1, 2],
                RBG => [0, 2, 1],
                GRB => [1, 0, 2],
                BRG => [1, 2, 0],
                GBR => [2, 0, 1],
                BGR => [2, 1, 0],
            }
        }

        /// Reorders `color` into wire order. There is no inverse: grids store the result.
        pub fn encode(&self, color: c::Color) -> c::Color {
            let offsets = self.offsets();
            let mut slots = [0_u8; 3];
            slots[offsets[0]] = color.r;
            slots[offsets[1]] = color.g;
            slots[offsets[2]] = color.b;
            c::Color::from(slots)
        }
    }

    /// Which rows of a zig-zag panel run right-to-left.
    ///
    /// Both flags together mirror every row; that is a real panel orientation, not an
    /// error.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct Wiring {
        pub reflect_odd_rows: bool,
        pub reflect_even_rows: bool,
    }

    impl Wiring {
        pub const LINEAR: Wiring = Wiring { reflect_odd_rows: false, reflect_even_rows: false };
        pub const ZIGZAG_ODD: Wiring = Wiring { reflect_odd_rows: true, reflect_even_rows: false };
        pub const ZIGZAG_EVEN: Wiring = Wiring { reflect_odd_rows: false, reflect_even_rows: true };
        pub const MIRRORED: Wiring = Wiring { reflect_odd_rows: true, reflect_even_rows: true };

        pub fn reflects(&self, y: usize) -> bool {
            let odd = y % 2 != 0;
            (self.reflect_odd_rows && odd) || (self.reflect_even_rows && !odd)
        }

        /// Mirrors `x` if row `y` runs backwards. `x` must already be below `columns`.
        pub fn reflect(&self, x: usize, y: usize, columns: usize) -> usize {
            if self.reflects(y) {
                columns - x - 1
            } else {
                x
            }
        }

        /// Buffer offset of logical `(x, y)`. Like [`address`], only the column is checked.
        pub fn map(&self, x: usize, y: usize, columns: usize) -> Result<usize> {
            if x >= columns {
                return Err(Error::OutOfBounds);
            }
            address(self.reflect(x, y, columns), y, columns)
        }

        /// Logical coordinate stored at buffer `offset`; mirroring is its own inverse.
        pub fn unmap(&self, offset: usize, columns: usize) -> (usize, usize) {
            let (x, y) = crate::utility::offset_to_xy(offset, columns);
            (self.reflect(x, y, columns), y)
        }
    }

    /// Row-major offset of `(x, y)` in a grid `columns` wide.
    ///
    /// Fails only for `x >= columns`. The row is not checked here; callers that accept a
    /// `y` from outside validate it against the row count first.
    pub fn address(x: usize, y: usize, columns: usize) -> Result<usize> {
        if x >= columns {
            return Err(Error::OutOfBounds);
        }
        Ok(columns * y + x)
    }

    /// Compile-time description of one panel.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct PhysicalGrid {
        pub columns: usize,
        pub rows: usize,
        pub wiring: Wiring,
        pub color_order: ColorOrder,
        pub strip_timings: StripTimings,
    }

    impl PhysicalGrid {
        pub const fn led_count(&self) -> usize {
            self.columns * self.rows
        }
    }

    /// Shifts `pixels` out of the pin and latches them.
    ///
    /// Bytes go out in buffer order, each MSB first. Bits are emitted inside a critical
    /// section that ends right after the last bit; the latch hold runs with interrupts
    /// enabled. An empty buffer returns without touching the pin or the timer.
    pub fn send_frame<P, T>(
        hc: &mut HardwareController<P, T>,
        strip_timings: &StripTimings,
        pixels: &[c::Color],
    ) where
        P: OutputPin,
        T: PeriodicTimer,
    {
        if pixels.is_empty() {
            return;
        }

        let zero = (strip_timings.high_slots(false), strip_timings.low_slots(false));
        let one = (strip_timings.high_slots(true), strip_timings.low_slots(true));

        #[cfg(feature = "defmt")]
        defmt::trace!("ws2812b: sending {} pixels", pixels.len());

        critical_section::with(|_| {
            // restart the timer every frame so nobody else's period is still loaded:
            hc.periodic_start(strip_timings.slot().nanoseconds());
            for pixel in pixels {
                let bytes: [u8; 3] = (*pixel).into();
                for bit in bytes[..].view_bits::<Msb0>().iter() {
                    let (high, low) = if *bit { one } else { zero };
                    send_bit(hc, high, low);
                }
            }
        });

        hc.wait_slots(strip_timings.latch_slots());
    }

    fn send_bit<P, T>(hc: &mut HardwareController<P, T>, high: u32, low: u32)
    where
        P: OutputPin,
        T: PeriodicTimer,
    {
        hc.set_high();
        hc.wait_slots(high);
        hc.set_low();
        hc.wait_slots(low);
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::colors::Color;

        const C: Color = Color { r: 0x11, g: 0x22, b: 0x33 };

        #[test]
        fn encode_matches_permutation_table() {
            let expected: [(ColorOrder, (u8, u8, u8)); 6] = [
                (ColorOrder::RGB, (0x11, 0x22, 0x33)),
                (ColorOrder::RBG, (0x11, 0x33, 0x22)),
                (ColorOrder::GRB, (0x22, 0x11, 0x33)),
                (ColorOrder::GBR, (0x22, 0x33, 0x11)),
                (ColorOrder::BRG, (0x33, 0x11, 0x22)),
                (ColorOrder::BGR, (0x33, 0x22, 0x11)),
            ];
            for (order, rgb) in expected {
                assert_eq!(order.encode(C), Color::from(rgb), "{:?}", order);
            }
        }

        #[test]
        fn default_order_is_identity() {
            assert_eq!(ColorOrder::default(), ColorOrder::RGB);
            assert_eq!(ColorOrder::default().encode(C), C);
        }

        #[test]
        fn address_is_row_major_without_reflection() {
            for y in 0..4 {
                for x in 0..5 {
                    assert_eq!(address(x, y, 5), Ok(5 * y + x));
                    assert_eq!(Wiring::LINEAR.map(x, y, 5), Ok(5 * y + x));
                }
            }
        }

        #[test]
        fn address_rejects_column_but_not_row() {
            assert_eq!(address(5, 0, 5), Err(Error::OutOfBounds));
            assert_eq!(address(0, 99, 5), Ok(495));
            assert_eq!(Wiring::MIRRORED.map(5, 0, 5), Err(Error::OutOfBounds));
        }

        #[test]
        fn zigzag_odd_mirrors_odd_rows_only() {
            let w = Wiring::ZIGZAG_ODD;
            assert_eq!(w.map(0, 0, 4), Ok(0));
            assert_eq!(w.map(0, 1, 4), Ok(4 + 3));
            assert_eq!(w.map(1, 1, 4), Ok(4 + 2));
            assert_eq!(w.map(1, 2, 4), Ok(8 + 1));
            assert_eq!(w.map(3, 3, 4), Ok(12));
        }

        #[test]
        fn zigzag_even_mirrors_even_rows_only() {
            let w = Wiring::ZIGZAG_EVEN;
            assert_eq!(w.map(0, 0, 4), Ok(3));
            assert_eq!(w.map(0, 1, 4), Ok(4));
            assert_eq!(w.map(2, 2, 4), Ok(8 + 1));
        }

        #[test]
        fn both_flags_mirror_every_row() {
            for y in 0..3 {
                assert!(Wiring::MIRRORED.reflects(y));
                assert_eq!(Wiring::MIRRORED.map(0, y, 3), Ok(3 * y + 2));
            }
        }

        #[test]
        fn unmap_inverts_map() {
            for wiring in [Wiring::LINEAR, Wiring::ZIGZAG_ODD, Wiring::ZIGZAG_EVEN, Wiring::MIRRORED] {
                for y in 0..3 {
                    for x in 0..4 {
                        let offset = wiring.map(x, y, 4).unwrap();
                        assert_eq!(wiring.unmap(offset, 4), (x, y));
                    }
                }
            }
        }

        #[test]
        fn ws2812b_slots_stay_in_tolerance() {
            for timings in [StripTimings::WS2812B, StripTimings::WS2812B_FINE] {
                assert!(timings.is_valid());
                let slot = timings.slot() as i64;
                let zero_h = timings.high_slots(false) as i64 * slot;
                let one_h = timings.high_slots(true) as i64 * slot;
                let zero_l = timings.low_slots(false) as i64 * slot;
                let one_l = timings.low_slots(true) as i64 * slot;

                assert!((zero_h - 400).abs() <= 150, "T0H {}", zero_h);
                assert!((one_h - 800).abs() <= 150, "T1H {}", one_h);
                assert!((zero_l - 850).abs() <= 150, "T0L {}", zero_l);
                assert!((one_l - 450).abs() <= 150, "T1L {}", one_l);
                assert_eq!(zero_h + zero_l, one_h + one_l);
                assert!(timings.latch_slots() * timings.slot() >= 50_000);
            }
        }

        #[test]
        fn three_slot_grid_is_one_and_two() {
            let t = StripTimings::WS2812B;
            assert_eq!(t.slot(), 416);
            assert_eq!((t.high_slots(false), t.low_slots(false)), (1, 2));
            assert_eq!((t.high_slots(true), t.low_slots(true)), (2, 1));
            assert_eq!(t.latch_slots(), 123);
        }

        #[test]
        fn degenerate_timings_are_invalid() {
            let one_slot = StripTimings { slots: 1, ..StripTimings::WS2812B };
            let no_latch = StripTimings { latch: 0, ..StripTimings::WS2812B };
            let same_high = StripTimings { one_h: 400, ..StripTimings::WS2812B };
            let always_high = StripTimings { one_h: 1250, ..StripTimings::WS2812B };
            assert!(!one_slot.is_valid());
            assert!(!no_latch.is_valid());
            assert!(!same_high.is_valid());
            assert!(!always_high.is_valid());

            let huge_one = StripTimings { one_h: u32::MAX, ..StripTimings::WS2812B };
            let huge_zero = StripTimings { zero_h: u32::MAX - 1, ..StripTimings::WS2812B };
            assert!(!huge_one.is_valid());
            assert!(!huge_zero.is_valid());
        }

        #[test]
        fn longest_latch_still_rounds_up() {
            let t = StripTimings { latch: u32::MAX, ..StripTimings::WS2812B };
            assert!(t.is_valid());
            assert_eq!(t.latch_slots(), 10_324_441);
            assert!(u64::from(t.latch_slots()) * u64::from(t.slot()) >= u64::from(u32::MAX));
        }
    }
}
