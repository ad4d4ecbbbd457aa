use crate::{Error, Result};
use core::cell::Cell;
use core::convert::Infallible;
use embedded_hal::digital::blocking::OutputPin;

/// A digital output register shared by several pins.
///
/// Handles are cheap copies that all refer to the same register; exclusivity is per bit
/// and is enforced by the [`PinResolver`] handing each bit out once.
pub trait PortRegister: Copy {
    fn read(&self) -> u32;
    fn write(&mut self, value: u32);
}

// Plain memory standing in for a register, used by host tests.
impl PortRegister for &Cell<u32> {
    fn read(&self) -> u32 {
        self.get()
    }

    fn write(&mut self, value: u32) {
        self.set(value);
    }
}

/// One bit of an output register, driven as a pin.
///
/// Only the bits in `mask` are ever changed; every other bit of the register is written
/// back with the value it was read with.
pub struct PortPin<R: PortRegister> {
    pin_id: u8,
    register: R,
    mask: u32,
}

impl<R: PortRegister> PortPin<R> {
    pub fn pin_id(&self) -> u8 {
        self.pin_id
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }
}

impl<R: PortRegister> OutputPin for PortPin<R> {
    type Error = Infallible;

    fn set_low(&mut self) -> core::result::Result<(), Self::Error> {
        let lo = self.register.read() & !self.mask;
        self.register.write(lo);
        Ok(())
    }

    fn set_high(&mut self) -> core::result::Result<(), Self::Error> {
        let hi = self.register.read() | self.mask;
        self.register.write(hi);
        Ok(())
    }
}

/// The platform service that turns a pin number into a register bit.
///
/// A resolved pin stays claimed until it is released, so two handles can never drive
/// the same bit.
pub trait PinResolver {
    type Pin: OutputPin;

    fn resolve(&mut self, pin_id: u8) -> Result<Self::Pin>;

    fn release(&mut self, pin_id: u8);
}

/// Table-driven [`PinResolver`]: entry `n` describes pin id `n`.
///
/// `None` entries are pins that exist in the numbering but cannot be used as outputs.
pub struct PinTable<R: PortRegister, const N: usize> {
    pins: [Option<(R, u32)>; N],
    claimed: [bool; N],
}

impl<R: PortRegister, const N: usize> PinTable<R, N> {
    pub fn new(pins: [Option<(R, u32)>; N]) -> Self {
        PinTable { pins, claimed: [false; N] }
    }

    /// Every pin `0..N` is bit `n` of the one `register`.
    pub fn single_port(register: R) -> Self {
        let mut pins = [None; N];
        for (bit, pin) in pins.iter_mut().enumerate().take(32) {
            *pin = Some((register, 1 << bit));
        }
        Self::new(pins)
    }

    pub fn is_claimed(&self, pin_id: u8) -> bool {
        self.claimed.get(pin_id as usize).copied().unwrap_or(false)
    }
}

impl<R: PortRegister, const N: usize> PinResolver for PinTable<R, N> {
    type Pin = PortPin<R>;

    fn resolve(&mut self, pin_id: u8) -> Result<PortPin<R>> {
        let index = pin_id as usize;
        let (register, mask) = match self.pins.get(index).copied().flatten() {
            Some(entry) => entry,
            None => return Err(Error::UnknownPin(pin_id)),
        };
        if self.claimed[index] {
            return Err(Error::PinInUse(pin_id));
        }
        self.claimed[index] = true;
        Ok(PortPin { pin_id, register, mask })
    }

    fn release(&mut self, pin_id: u8) {
        if let Some(claimed) = self.claimed.get_mut(pin_id as usize) {
            *claimed = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_to_register_bit() {
        let port = Cell::new(0);
        let mut table = PinTable::<_, 8>::single_port(&port);

        let mut pin = table.resolve(3).unwrap();
        assert_eq!(pin.pin_id(), 3);
        assert_eq!(pin.mask(), 0b1000);

        pin.set_high().unwrap();
        assert_eq!(port.get(), 0b1000);
        pin.set_low().unwrap();
        assert_eq!(port.get(), 0);
    }

    #[test]
    fn pin_never_touches_neighbouring_bits() {
        let port = Cell::new(0b1010_0101);
        let mut table = PinTable::<_, 8>::single_port(&port);
        let mut pin = table.resolve(1).unwrap();

        pin.set_high().unwrap();
        assert_eq!(port.get(), 0b1010_0111);
        pin.set_low().unwrap();
        assert_eq!(port.get(), 0b1010_0101);
    }

    #[test]
    fn unknown_pins_fail() {
        let port = Cell::new(0);
        let mut table = PinTable::new([Some((&port, 1)), None]);

        assert!(matches!(table.resolve(1), Err(Error::UnknownPin(1))));
        assert!(matches!(table.resolve(9), Err(Error::UnknownPin(9))));
        assert!(table.resolve(0).is_ok());
    }

    #[test]
    fn claimed_pin_cannot_alias_until_released() {
        let port = Cell::new(0);
        let mut table = PinTable::<_, 4>::single_port(&port);

        let _first = table.resolve(2).unwrap();
        assert!(table.is_claimed(2));
        assert!(matches!(table.resolve(2), Err(Error::PinInUse(2))));

        table.release(2);
        assert!(!table.is_claimed(2));
        assert!(table.resolve(2).is_ok());
    }

    #[test]
    fn separate_ports_share_nothing() {
        let port_a = Cell::new(0);
        let port_b = Cell::new(0);
        let mut table = PinTable::new([Some((&port_a, 1 << 4)), Some((&port_b, 1 << 4))]);

        let mut pin_b = table.resolve(1).unwrap();
        pin_b.set_high().unwrap();
        assert_eq!(port_a.get(), 0);
        assert_eq!(port_b.get(), 1 << 4);
    }
}
