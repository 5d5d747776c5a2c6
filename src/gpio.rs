use crate::error::{Error, Result};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioDirection {
    Input,
    Output,
}

/// Level of a pin. `DontCare` only appears in configuration requests and is
/// never stored in [`GpioRegisters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinState {
    Low,
    High,
    DontCare,
}

impl From<bool> for PinState {
    fn from(high: bool) -> Self {
        if high {
            PinState::High
        } else {
            PinState::Low
        }
    }
}

/// Represents a valid GPIO Pin number (0-15).
///
/// Pins 0-7 are bank A (D0-D7, the MPSSE low byte); pins 8-15 are bank B
/// (C0-C7, the high byte). Use `GpioPin::new(num)` or the named constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GpioPin(pub(crate) u8);

impl GpioPin {
    pub const D0: GpioPin = GpioPin(0);
    pub const D1: GpioPin = GpioPin(1);
    pub const D2: GpioPin = GpioPin(2);
    pub const D3: GpioPin = GpioPin(3);
    pub const D4: GpioPin = GpioPin(4);
    pub const D5: GpioPin = GpioPin(5);
    pub const D6: GpioPin = GpioPin(6);
    pub const D7: GpioPin = GpioPin(7);
    pub const C0: GpioPin = GpioPin(8);
    pub const C1: GpioPin = GpioPin(9);
    pub const C2: GpioPin = GpioPin(10);
    pub const C3: GpioPin = GpioPin(11);
    pub const C4: GpioPin = GpioPin(12);
    pub const C5: GpioPin = GpioPin(13);
    pub const C6: GpioPin = GpioPin(14);
    pub const C7: GpioPin = GpioPin(15);

    /// Creates a new GpioPin, returning an error if the number is out of range (0-15).
    pub fn new(pin_num: u8) -> Result<Self> {
        if pin_num <= 15 {
            Ok(GpioPin(pin_num))
        } else {
            Err(Error::PinArgumentOutOfRange {
                pin: pin_num,
                message: "Pin number must be 0-15".to_string(),
            })
        }
    }

    /// Returns the underlying pin number (0-15).
    #[inline]
    pub fn number(&self) -> u8 {
        self.0
    }

    /// Returns the bank (0 = D pins, 1 = C pins) the pin belongs to.
    #[inline]
    pub fn bank_index(&self) -> u8 {
        self.0 / 8
    }

    /// Returns the bit offset (0-7) within the bank's byte.
    #[inline]
    pub fn bit_offset(&self) -> u8 {
        self.0 % 8
    }

    /// Returns the bit mask within the 16-bit register pair.
    #[inline]
    pub fn mask(&self) -> u16 {
        1u16 << self.0
    }
}

impl fmt::Display for GpioPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bank = if self.bank_index() == 0 { 'D' } else { 'C' };
        write!(f, "{}{}", bank, self.bit_offset())
    }
}

/// One entry of a batch pin configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinConfig {
    pub pin: GpioPin,
    pub direction: GpioDirection,
    /// `DontCare` leaves the level bit untouched.
    pub value: PinState,
}

impl PinConfig {
    pub fn output(pin: GpioPin, value: PinState) -> Self {
        Self {
            pin,
            direction: GpioDirection::Output,
            value,
        }
    }

    pub fn input(pin: GpioPin) -> Self {
        Self {
            pin,
            direction: GpioDirection::Input,
            value: PinState::DontCare,
        }
    }
}

/// Host-side shadow of the two MPSSE GPIO banks.
///
/// Pure bit bookkeeping; nothing here talks to the device. The level bit of
/// an input pin holds whatever was last written there and must not be used
/// to infer the pin's actual level; read the banks through the driver instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GpioRegisters {
    direction: u16,
    level: u16,
}

impl GpioRegisters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output sets the pin's direction bit. Input clears both its direction
    /// and level bits.
    pub fn set_direction(&mut self, pin: GpioPin, direction: GpioDirection) {
        match direction {
            GpioDirection::Output => self.direction |= pin.mask(),
            GpioDirection::Input => {
                self.direction &= !pin.mask();
                self.level &= !pin.mask();
            }
        }
    }

    /// High sets, Low clears; `DontCare` is ignored.
    pub fn set_level(&mut self, pin: GpioPin, state: PinState) {
        match state {
            PinState::High => self.level |= pin.mask(),
            PinState::Low => self.level &= !pin.mask(),
            PinState::DontCare => {}
        }
    }

    pub fn direction_of(&self, pin: GpioPin) -> GpioDirection {
        if self.direction & pin.mask() != 0 {
            GpioDirection::Output
        } else {
            GpioDirection::Input
        }
    }

    /// Driven level of an output pin. Meaningless for inputs.
    pub fn level_of(&self, pin: GpioPin) -> PinState {
        if self.level & pin.mask() != 0 {
            PinState::High
        } else {
            PinState::Low
        }
    }

    /// `(direction, level)`
    pub fn snapshot(&self) -> (u16, u16) {
        (self.direction, self.level)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Display for GpioRegisters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Bit 0 printed first so columns line up with pin numbers.
        writeln!(f, "          111111")?;
        writeln!(f, "0123456789012345")?;
        writeln!(f, "{} : Direction", lsb_first_binary(self.direction))?;
        write!(f, "{} : Level", lsb_first_binary(self.level))
    }
}

fn lsb_first_binary(value: u16) -> String {
    (0..16)
        .map(|bit| if value & (1 << bit) != 0 { '1' } else { '0' })
        .collect()
}
