//! MPSSE clock divisor arithmetic.

use crate::consts::{BASE_CLOCK_HZ, MAX_CLOCK_HZ, MIN_CLOCK_HZ};
use crate::error::{Error, Result};
use log::warn;

/// Requested clocking for the MPSSE engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockConfig {
    pub frequency_hz: u32,
    pub adaptive: bool,
    /// Three-phase data clocking (I2C style). Scales the divisor by 2/3.
    pub three_phase: bool,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self::new(1_000_000)
    }
}

impl ClockConfig {
    pub fn new(frequency_hz: u32) -> Self {
        Self {
            frequency_hz,
            adaptive: false,
            three_phase: false,
        }
    }

    pub fn adaptive(mut self, enable: bool) -> Self {
        self.adaptive = enable;
        self
    }

    pub fn three_phase(mut self, enable: bool) -> Self {
        self.three_phase = enable;
        self
    }

    /// Divisor for the `0x86` command.
    pub fn divisor(&self) -> Result<u16> {
        let base = divisor(self.frequency_hz)?;
        Ok(if self.three_phase {
            (u32::from(base) * 2 / 3) as u16
        } else {
            base
        })
    }

    /// Clock the chip will actually produce for [`ClockConfig::divisor`].
    pub fn actual_frequency_hz(&self) -> Result<f64> {
        let divisor = self.divisor()?;
        Ok(f64::from(BASE_CLOCK_HZ) / (1.0 + f64::from(divisor)))
    }
}

/// `ceil((30 MHz - hz) / hz) & 0xFFFF`.
///
/// Frequencies at or above 30 MHz give divisor 0. Frequencies below
/// [`MIN_CLOCK_HZ`] wrap, exactly as the 16-bit field does on the wire.
pub fn divisor(clock_hz: u32) -> Result<u16> {
    if clock_hz == 0 {
        return Err(Error::ArgumentOutOfRange(
            "Clock frequency must be greater than 0 Hz".to_string(),
        ));
    }
    if clock_hz >= MAX_CLOCK_HZ {
        return Ok(0);
    }
    let raw = (BASE_CLOCK_HZ - clock_hz).div_ceil(clock_hz);
    if raw > 0xFFFF {
        warn!(
            "Clock {} Hz is below the {} Hz minimum; divisor {} wraps to {}",
            clock_hz,
            MIN_CLOCK_HZ,
            raw,
            raw & 0xFFFF
        );
    }
    Ok((raw & 0xFFFF) as u16)
}
