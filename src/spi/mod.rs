//! SPI over MPSSE, clocked by the chip or bit-banged through the GPIO banks.
//!
//! Pin roles on bank A (FT232H labels):
//! *   D0: SCK
//! *   D1: MOSI (data out)
//! *   D2: MISO (data in)
//! *   D3: default chip select
//!
//! Both [`HardwareSpi`] and [`SoftSpi`] implement [`SpiBus`], so device
//! drivers can be written once against `&mut dyn SpiBus`.

mod hardware;
mod soft;

pub use hardware::HardwareSpi;
pub use soft::SoftSpi;

use crate::consts::MAX_TRANSFER_LEN;
use crate::error::{self, Error, Result};
use crate::gpio::{GpioPin, PinState};

pub const CLOCK_PIN: GpioPin = GpioPin::D0;
pub const DATA_OUT_PIN: GpioPin = GpioPin::D1;
pub const DATA_IN_PIN: GpioPin = GpioPin::D2;
pub const DEFAULT_CS_PIN: GpioPin = GpioPin::D3;
pub const RESET_PIN: GpioPin = GpioPin::D4;
pub const TRIGGER_PIN: GpioPin = GpioPin::D7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEdge {
    Rising,
    Falling,
}

/// Clock polarity and phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpiMode {
    /// Write on rising, sample on falling, clock idles low.
    #[default]
    Mode0,
    /// Write on falling, sample on rising, clock idles low.
    Mode1,
    /// Write on rising, sample on falling, clock idles high.
    Mode2,
    /// Write on falling, sample on rising, clock idles high.
    Mode3,
}

impl SpiMode {
    pub fn write_edge(&self) -> ClockEdge {
        match self {
            SpiMode::Mode0 | SpiMode::Mode2 => ClockEdge::Rising,
            SpiMode::Mode1 | SpiMode::Mode3 => ClockEdge::Falling,
        }
    }

    pub fn read_edge(&self) -> ClockEdge {
        match self {
            SpiMode::Mode0 | SpiMode::Mode2 => ClockEdge::Falling,
            SpiMode::Mode1 | SpiMode::Mode3 => ClockEdge::Rising,
        }
    }

    pub fn idle_level(&self) -> PinState {
        match self {
            SpiMode::Mode0 | SpiMode::Mode1 => PinState::Low,
            SpiMode::Mode2 | SpiMode::Mode3 => PinState::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitOrder {
    #[default]
    MsbFirst,
    LsbFirst,
}

/// Which pin, if any, acts as chip select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChipSelect {
    /// No chip select; assert/de-assert are no-ops.
    #[default]
    None,
    /// [`DEFAULT_CS_PIN`] (D3), driven in software.
    Default,
    /// Left to the hardware; assert/de-assert are no-ops.
    Hardware,
    /// Any GPIO driven in software.
    Pin(GpioPin),
}

impl ChipSelect {
    /// The pin this crate drives, if it drives one.
    pub fn software_pin(&self) -> Option<GpioPin> {
        match self {
            ChipSelect::Default => Some(DEFAULT_CS_PIN),
            ChipSelect::Pin(pin) => Some(*pin),
            ChipSelect::None | ChipSelect::Hardware => None,
        }
    }
}

/// How and when chip select is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipSelectPolicy {
    pub active_low: bool,
    /// Leave CS alone around transfers; the caller asserts it once.
    /// When false, every transfer asserts and de-asserts it.
    pub constant_assert: bool,
    /// Set by `take_control_of_cs`; suppresses per-transfer CS handling so a
    /// caller can bracket several transfers (daisy chains) under one assertion.
    pub manual: bool,
}

impl Default for ChipSelectPolicy {
    fn default() -> Self {
        Self {
            active_low: true,
            constant_assert: true,
            manual: false,
        }
    }
}

impl ChipSelectPolicy {
    /// Asserts around every transfer.
    pub fn per_transfer() -> Self {
        Self {
            constant_assert: false,
            ..Self::default()
        }
    }

    pub fn asserted_level(&self) -> PinState {
        if self.active_low {
            PinState::Low
        } else {
            PinState::High
        }
    }

    pub fn deasserted_level(&self) -> PinState {
        if self.active_low {
            PinState::High
        } else {
            PinState::Low
        }
    }

    /// Whether a single transfer should bracket itself with CS.
    pub fn brackets_transfers(&self) -> bool {
        !self.constant_assert && !self.manual
    }
}

/// Bus settings handed to [`SpiBus::configure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiConfig {
    pub chip_select: ChipSelect,
    pub clock_hz: u32,
    pub mode: SpiMode,
    pub bit_order: BitOrder,
    pub cs_policy: ChipSelectPolicy,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            chip_select: ChipSelect::None,
            clock_hz: 1_000_000,
            mode: SpiMode::Mode0,
            bit_order: BitOrder::MsbFirst,
            cs_policy: ChipSelectPolicy::default(),
        }
    }
}

/// What device drivers need from an SPI link.
pub trait SpiBus {
    fn configure(&mut self, config: &SpiConfig) -> Result<()>;

    /// Half-duplex write.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Half-duplex read of `len` bytes.
    fn read(&mut self, len: usize) -> Result<Vec<u8>>;

    /// Full-duplex exchange; returns as many bytes as were sent.
    fn transfer(&mut self, data: &[u8]) -> Result<Vec<u8>>;

    fn assert_chip_select(&mut self) -> Result<()>;

    fn deassert_chip_select(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}

/// Length field of a clock-bytes command: `len - 1`, little endian.
///
/// `0x0000` means one byte, `0xFFFF` means 65536. Zero-length and
/// over-long payloads are rejected; callers split large transfers themselves.
pub fn encode_length(len: usize) -> Result<[u8; 2]> {
    if len == 0 {
        return Err(error::empty_transfer());
    }
    if len > MAX_TRANSFER_LEN {
        return Err(Error::OperationTooLarge {
            max: MAX_TRANSFER_LEN,
            actual: len,
        });
    }
    Ok(((len - 1) as u16).to_le_bytes())
}
