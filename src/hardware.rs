use core::convert::Infallible;
use embedded_hal::digital::blocking::OutputPin;
use embedded_time::duration::*;

/// The data pin of one grid together with the timer that paces its bits.
///
/// The controller is the only thing the transmission engine touches, so whoever owns it
/// owns the pin: nothing else can toggle the line mid-frame.
pub struct HardwareController<P, T>
where
    P: OutputPin,
    T: PeriodicTimer,
{
    pin: P,
    timer: T,
}

impl<P, T> HardwareController<P, T>
where
    P: OutputPin,
    T: PeriodicTimer,
{
    pub fn new(pin: P, timer: T) -> Self {
        HardwareController { pin, timer }
    }

    pub fn set_low(&mut self) {
        self.pin.set_low().ok();
    }

    pub fn set_high(&mut self) {
        self.pin.set_high().ok();
    }

    pub fn periodic_start(&mut self, time: impl Into<Nanoseconds<u32>>) {
        self.timer.periodic_start(time);
    }

    pub fn periodic_wait(&mut self) {
        self.timer.periodic_wait();
    }

    /// Waits out `slots` whole timer periods.
    pub fn wait_slots(&mut self, slots: u32) {
        for _ in 0..slots {
            self.timer.periodic_wait();
        }
    }

    pub fn free(self) -> (P, T) {
        (self.pin, self.timer)
    }
}

/// A timer that fires at a fixed period once started.
///
/// Each expiry must be measured from the previous deadline rather than from the moment
/// it was observed, otherwise polling latency accumulates across a frame.
pub trait PeriodicTimer {
    fn periodic_start(&mut self, time: impl Into<Nanoseconds<u32>>);

    /// Returns `Ok` once per elapsed period and `WouldBlock` in between.
    fn periodic_check_timeout(&mut self) -> nb::Result<(), Infallible>;

    fn periodic_wait(&mut self) {
        nb::block!(self.periodic_check_timeout()).ok();
    }
}

impl<T: PeriodicTimer> PeriodicTimer for &mut T {
    fn periodic_start(&mut self, time: impl Into<Nanoseconds<u32>>) {
        (**self).periodic_start(time);
    }

    fn periodic_check_timeout(&mut self) -> nb::Result<(), Infallible> {
        (**self).periodic_check_timeout()
    }

    fn periodic_wait(&mut self) {
        (**self).periodic_wait();
    }
}
