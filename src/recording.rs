//! Virtual hardware that records the waveform instead of driving a pin.
//!
//! A [`Trace`] plays the output register: every write that changes its value is stored
//! with the virtual time it happened at. A [`RecordingTimer`] over the same trace moves
//! that time forward by one period per tick and never blocks. Resolve pins from
//! `PinTable::single_port(&trace)` and the transmission engine runs unchanged, after
//! which [`Trace::pulses`] and [`Trace::bits`] give back exactly what a logic analyzer
//! on the data line would have seen.

use crate::hardware::PeriodicTimer;
use crate::leds::ws2812b::StripTimings;
use crate::pins::PortRegister;
use arrayvec::ArrayVec;
use core::cell::RefCell;
use core::convert::Infallible;
use embedded_time::duration::Nanoseconds;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterWrite {
    pub at: u64,
    pub value: u32,
}

/// A level change of one masked bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
    pub at: u64,
    pub high: bool,
}

/// One high pulse and the low time that follows it, up to the next rising edge or the
/// end of the trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pulse {
    pub start: u64,
    pub high_ns: u64,
    pub low_ns: u64,
}

/// Recorded register history with up to `N` value changes.
///
/// Changes past `N` are dropped and flagged by [`Trace::overflowed`].
#[derive(Debug)]
pub struct Trace<const N: usize> {
    now: u64,
    period: u32,
    starts: u32,
    ticks: u64,
    initial: u32,
    value: u32,
    writes: ArrayVec<RegisterWrite, N>,
    overflowed: bool,
}

impl<const N: usize> Trace<N> {
    pub fn new() -> Self {
        Self::with_value(0)
    }

    /// A register that already holds `value` when recording starts.
    pub fn with_value(value: u32) -> Self {
        Trace {
            now: 0,
            period: 0,
            starts: 0,
            ticks: 0,
            initial: value,
            value,
            writes: ArrayVec::new(),
            overflowed: false,
        }
    }

    /// Virtual time in nanoseconds.
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    /// How often the timer was (re)started.
    pub fn starts(&self) -> u32 {
        self.starts
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn writes(&self) -> &[RegisterWrite] {
        &self.writes
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    pub fn is_high(&self, mask: u32) -> bool {
        self.value & mask != 0
    }

    /// Bits outside `mask` that differ from the starting value in any recorded write.
    pub fn foreign_bits(&self, mask: u32) -> u32 {
        self.writes.iter().fold(0, |acc, write| acc | ((write.value ^ self.initial) & !mask))
    }

    fn record(&mut self, value: u32) {
        if value == self.value {
            return;
        }
        if self.writes.try_push(RegisterWrite { at: self.now, value }).is_err() {
            self.overflowed = true;
        }
        self.value = value;
    }

    pub fn edges(&self, mask: u32) -> impl Iterator<Item = Edge> + '_ {
        let mut high = self.initial & mask != 0;
        self.writes.iter().filter_map(move |write| {
            let level = write.value & mask != 0;
            if level == high {
                return None;
            }
            high = level;
            Some(Edge { at: write.at, high })
        })
    }

    pub fn pulses(&self, mask: u32) -> Pulses<N> {
        Pulses { edges: self.edges(mask).collect(), index: 0, end: self.now }
    }

    /// Decodes the pulses on `mask` as WS2812 bits: a high time past the midpoint between
    /// the zero and one high times of `strip_timings` is a one.
    pub fn bits<'a>(
        &'a self,
        mask: u32,
        strip_timings: &StripTimings,
    ) -> impl Iterator<Item = bool> + 'a {
        let threshold = u64::from(strip_timings.zero_h + strip_timings.one_h) / 2;
        self.pulses(mask).map(move |pulse| pulse.high_ns > threshold)
    }
}

impl<const N: usize> Default for Trace<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> PortRegister for &RefCell<Trace<N>> {
    fn read(&self) -> u32 {
        self.borrow().value
    }

    fn write(&mut self, value: u32) {
        self.borrow_mut().record(value);
    }
}

/// Iterator over the [`Pulse`]s of one bit, see [`Trace::pulses`].
pub struct Pulses<const N: usize> {
    edges: ArrayVec<Edge, N>,
    index: usize,
    end: u64,
}

impl<const N: usize> Iterator for Pulses<N> {
    type Item = Pulse;

    fn next(&mut self) -> Option<Pulse> {
        while let Some(edge) = self.edges.get(self.index) {
            if edge.high {
                break;
            }
            self.index += 1;
        }
        let rise = self.edges.get(self.index)?.at;
        self.index += 1;

        let fall = match self.edges.get(self.index) {
            Some(edge) => edge.at,
            None => return Some(Pulse { start: rise, high_ns: self.end - rise, low_ns: 0 }),
        };
        self.index += 1;

        let next_rise = self.edges.get(self.index).map_or(self.end, |edge| edge.at);
        Some(Pulse { start: rise, high_ns: fall - rise, low_ns: next_rise - fall })
    }
}

/// A [`PeriodicTimer`] that advances the trace clock instead of waiting.
pub struct RecordingTimer<'t, const N: usize> {
    trace: &'t RefCell<Trace<N>>,
}

impl<'t, const N: usize> RecordingTimer<'t, N> {
    pub fn new(trace: &'t RefCell<Trace<N>>) -> Self {
        RecordingTimer { trace }
    }
}

impl<'t, const N: usize> PeriodicTimer for RecordingTimer<'t, N> {
    fn periodic_start(&mut self, time: impl Into<Nanoseconds<u32>>) {
        let mut trace = self.trace.borrow_mut();
        trace.period = time.into().0;
        trace.starts += 1;
    }

    fn periodic_check_timeout(&mut self) -> nb::Result<(), Infallible> {
        let mut trace = self.trace.borrow_mut();
        let period = u64::from(trace.period);
        trace.now += period;
        trace.ticks += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::HardwareController;
    use crate::pins::{PinResolver, PinTable};

    #[test]
    fn only_changes_are_recorded() {
        let trace = RefCell::new(Trace::<8>::new());
        let mut register = &trace;
        register.write(0);
        register.write(1);
        register.write(1);
        register.write(0);

        let trace = trace.borrow();
        assert_eq!(trace.writes().len(), 2);
        assert!(!trace.overflowed());
    }

    #[test]
    fn overflow_is_flagged_not_fatal() {
        let trace = RefCell::new(Trace::<2>::new());
        let mut register = &trace;
        for value in 1..=4 {
            register.write(value);
        }
        assert!(trace.borrow().overflowed());
        assert_eq!(trace.borrow().value(), 4);
    }

    #[test]
    fn pulses_measure_high_and_low_time() {
        let trace = RefCell::new(Trace::<16>::new());
        let mut table = PinTable::<_, 8>::single_port(&trace);
        let pin = table.resolve(5).unwrap();
        let mut hc = HardwareController::new(pin, RecordingTimer::new(&trace));

        hc.periodic_start(Nanoseconds(100_u32));
        hc.set_high();
        hc.wait_slots(2);
        hc.set_low();
        hc.wait_slots(1);
        hc.set_high();
        hc.wait_slots(1);
        hc.set_low();
        hc.wait_slots(5);

        let trace = trace.borrow();
        assert_eq!(trace.now(), 900);
        assert_eq!(trace.ticks(), 9);
        let mut pulses = trace.pulses(1 << 5);
        assert_eq!(pulses.next(), Some(Pulse { start: 0, high_ns: 200, low_ns: 100 }));
        assert_eq!(pulses.next(), Some(Pulse { start: 300, high_ns: 100, low_ns: 500 }));
        assert_eq!(pulses.next(), None);
        assert_eq!(trace.foreign_bits(1 << 5), 0);
    }

    #[test]
    fn edges_ignore_other_bits() {
        let trace = RefCell::new(Trace::<8>::with_value(0b100));
        let mut register = &trace;
        register.write(0b101);
        register.write(0b001);
        register.write(0b000);

        let trace = trace.borrow();
        let edges: ArrayVec<Edge, 8> = trace.edges(0b001).collect();
        assert_eq!(edges.len(), 2);
        assert!(edges[0].high);
        assert!(!edges[1].high);
        assert_eq!(trace.foreign_bits(0b001), 0b100);
    }
}
