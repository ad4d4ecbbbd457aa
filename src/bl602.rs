//! BL602 binding: GPIO pins through the GLB registers, a busy-wait timer on `mcycle`,
//! and the critical-section implementation for the single hart.

use crate::hardware::PeriodicTimer;
use crate::pins::{PinResolver, PinTable, PortPin, PortRegister};
use crate::Result;
use core::cell::Cell;
use core::convert::Infallible;
use critical_section::{Mutex, RawRestoreState};
use embedded_time::duration::Nanoseconds;
use riscv::register::{mcycle, mstatus};

const GLB_BASE: usize = 0x4000_0000;
const GPIO_CFGCTL0: usize = GLB_BASE + 0x100;
const GPIO_CFGCTL32: usize = GLB_BASE + 0x188;
const GPIO_CFGCTL34: usize = GLB_BASE + 0x190;

/// GPIO 0 through 22 exist on the BL602.
pub const NUM_PINS: usize = 23;

const FUNC_SWGPIO: u32 = 11;
const FUNC_MASK: u32 = 0x1f;
const FUNC_SHIFT: u32 = 8;

/// The shared output value register `GPIO_CFGCTL32`.
#[derive(Clone, Copy, Debug)]
pub struct GpioOutputRegister;

impl PortRegister for GpioOutputRegister {
    fn read(&self) -> u32 {
        unsafe { core::ptr::read_volatile(GPIO_CFGCTL32 as *const u32) }
    }

    fn write(&mut self, value: u32) {
        unsafe { core::ptr::write_volatile(GPIO_CFGCTL32 as *mut u32, value) }
    }
}

static PINS_TAKEN: Mutex<Cell<bool>> = Mutex::new(Cell::new(false));

/// Resolver for the BL602 GPIO pins.
///
/// Resolving a pin switches it to the software GPIO function and enables its output
/// driver; releasing it leaves that configuration in place.
pub struct Bl602Pins {
    table: PinTable<GpioOutputRegister, NUM_PINS>,
}

impl Bl602Pins {
    /// Returns the resolver the first time it is called, `None` afterwards.
    pub fn take() -> Option<Self> {
        let first = critical_section::with(|cs| !PINS_TAKEN.borrow(cs).replace(true));
        if first {
            Some(Bl602Pins { table: PinTable::single_port(GpioOutputRegister) })
        } else {
            None
        }
    }

    fn configure_output(pin_id: u8) {
        let cfg = (GPIO_CFGCTL0 + (pin_id as usize / 2) * 4) as *mut u32;
        let shift = FUNC_SHIFT + 16 * (pin_id as u32 % 2);
        let enable = GPIO_CFGCTL34 as *mut u32;

        critical_section::with(|_| unsafe {
            let func = core::ptr::read_volatile(cfg) & !(FUNC_MASK << shift);
            core::ptr::write_volatile(cfg, func | (FUNC_SWGPIO << shift));
            let oe = core::ptr::read_volatile(enable);
            core::ptr::write_volatile(enable, oe | (1 << pin_id));
        });
    }
}

impl PinResolver for Bl602Pins {
    type Pin = PortPin<GpioOutputRegister>;

    fn resolve(&mut self, pin_id: u8) -> Result<Self::Pin> {
        let pin = self.table.resolve(pin_id)?;
        Self::configure_output(pin_id);
        Ok(pin)
    }

    fn release(&mut self, pin_id: u8) {
        self.table.release(pin_id);
    }
}

/// Busy-wait [`PeriodicTimer`] over the `mcycle` counter.
///
/// Deadlines accumulate from the previous deadline rather than from the moment the wait
/// returned, so the time spent toggling the pin does not stretch the bit period.
pub struct McycleTimer {
    sysclk_hz: u32,
    period_cycles: u64,
    deadline: u64,
}

impl McycleTimer {
    pub fn new(sysclk_hz: u32) -> Self {
        McycleTimer { sysclk_hz, period_cycles: 0, deadline: 0 }
    }
}

impl PeriodicTimer for McycleTimer {
    fn periodic_start(&mut self, time: impl Into<Nanoseconds<u32>>) {
        let nanos = u64::from(time.into().0);
        self.period_cycles = (nanos * u64::from(self.sysclk_hz) / 1_000_000_000).max(1);
        self.deadline = mcycle::read64() + self.period_cycles;
    }

    fn periodic_check_timeout(&mut self) -> nb::Result<(), Infallible> {
        if mcycle::read64() < self.deadline {
            return Err(nb::Error::WouldBlock);
        }
        self.deadline += self.period_cycles;
        Ok(())
    }
}

struct MachineInterrupts;
critical_section::set_impl!(MachineInterrupts);

unsafe impl critical_section::Impl for MachineInterrupts {
    unsafe fn acquire() -> RawRestoreState {
        let was_enabled = mstatus::read().mie();
        riscv::interrupt::disable();
        was_enabled
    }

    unsafe fn release(was_enabled: RawRestoreState) {
        if was_enabled {
            riscv::interrupt::enable();
        }
    }
}
