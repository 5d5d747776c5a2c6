use super::{
    BitOrder, ChipSelectPolicy, SpiBus, SpiConfig, CLOCK_PIN, DATA_IN_PIN, DATA_OUT_PIN,
    DEFAULT_CS_PIN, RESET_PIN, TRIGGER_PIN,
};
use crate::error::{self, Result};
use crate::gpio::{GpioPin, PinConfig, PinState};
use crate::mpsse::Mpsse;
use crate::transport::Transport;
use log::{debug, trace};

#[cfg(feature = "libftdi")]
use crate::device::{DeviceSelector, OpenOptions};
#[cfg(feature = "libftdi")]
use crate::mpsse::MpsseConfig;
#[cfg(feature = "libftdi")]
use crate::transport::FtdiTransport;

/// Bit-banged SPI through the GPIO banks.
///
/// Every edge is a separate bank write, so this is orders of magnitude slower
/// than [`HardwareSpi`](super::HardwareSpi). Useful for targets that want
/// odd framing, or for poking at a bus with a logic analyser on D7.
///
/// Data is written before the falling edge and sampled after the rising one.
///
/// SCK is dropped in the shadow registers after each byte but not written
/// out, so on the wire it stays high between bytes until the next bank write
/// (the next byte's first bit, a CS change, or any other pin update).
#[derive(Debug)]
pub struct SoftSpi<T: Transport> {
    mpsse: Mpsse<T>,
    bit_order: BitOrder,
    cs_policy: ChipSelectPolicy,
    max_speed_hz: u32,
}

#[cfg(feature = "libftdi")]
impl SoftSpi<FtdiTransport> {
    /// Opens a device and configures it at `max_speed_hz`, MSB first.
    pub fn open_default(
        selector: &DeviceSelector,
        options: OpenOptions,
        max_speed_hz: u32,
    ) -> Result<Self> {
        let mpsse = Mpsse::open_device(selector, options, MpsseConfig::default())?;
        let mut spi = Self::new(mpsse);
        spi.configure(&SpiConfig {
            clock_hz: max_speed_hz,
            cs_policy: ChipSelectPolicy::per_transfer(),
            ..SpiConfig::default()
        })?;
        Ok(spi)
    }
}

impl<T: Transport> SoftSpi<T> {
    pub fn new(mpsse: Mpsse<T>) -> Self {
        Self {
            mpsse,
            bit_order: BitOrder::default(),
            cs_policy: ChipSelectPolicy::per_transfer(),
            max_speed_hz: 0,
        }
    }

    pub fn mpsse(&self) -> &Mpsse<T> {
        &self.mpsse
    }

    pub fn mpsse_mut(&mut self) -> &mut Mpsse<T> {
        &mut self.mpsse
    }

    pub fn into_inner(self) -> Mpsse<T> {
        self.mpsse
    }

    pub fn bit_order(&self) -> BitOrder {
        self.bit_order
    }

    pub fn max_speed_hz(&self) -> u32 {
        self.max_speed_hz
    }

    pub fn cs_policy_mut(&mut self) -> &mut ChipSelectPolicy {
        &mut self.cs_policy
    }

    fn mask_for(&self, index: u32) -> u8 {
        match self.bit_order {
            BitOrder::MsbFirst => 0x80 >> index,
            BitOrder::LsbFirst => 0x01 << index,
        }
    }

    /// Clocks one bit out: data, falling edge, rising edge. Three bank writes.
    fn clock_bit(&mut self, bit: bool) -> Result<()> {
        self.mpsse.set_pin(DATA_OUT_PIN, PinState::from(bit));
        self.mpsse.write_gpio_banks()?;
        self.mpsse.set_low(CLOCK_PIN);
        self.mpsse.write_gpio_banks()?;
        self.mpsse.set_high(CLOCK_PIN);
        self.mpsse.write_gpio_banks()
    }

    /// Shifts one byte out in exactly 24 bank writes.
    ///
    /// The clock is left low in the shadow registers only; the pin stays high
    /// until the next bank write. A failed write aborts the remaining edges.
    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        trace!("Soft SPI write 0x{:02X}", byte);
        for i in 0..8 {
            let bit = byte & self.mask_for(i) != 0;
            self.clock_bit(bit)?;
        }
        self.mpsse.set_low(CLOCK_PIN);
        Ok(())
    }

    /// Shifts one byte out while sampling D2 after every rising edge.
    pub fn transfer_byte(&mut self, byte: u8) -> Result<u8> {
        let mut received = 0u8;
        for i in 0..8 {
            let mask = self.mask_for(i);
            self.clock_bit(byte & mask != 0)?;
            let pins = self.mpsse.read_gpio_banks()?;
            if pins & DATA_IN_PIN.mask() != 0 {
                received |= mask;
            }
        }
        self.mpsse.set_low(CLOCK_PIN);
        trace!("Soft SPI transfer 0x{:02X} -> 0x{:02X}", byte, received);
        Ok(received)
    }

    /// Drives D4.
    pub fn set_reset(&mut self, state: PinState) -> Result<()> {
        debug!("Soft SPI reset line {:?}", state);
        self.mpsse.output(RESET_PIN, state)
    }

    /// Inverts a pin's shadow level and pushes it.
    pub fn toggle_pin(&mut self, pin: GpioPin) -> Result<()> {
        let next = match self.mpsse.registers().level_of(pin) {
            PinState::High => PinState::Low,
            _ => PinState::High,
        };
        self.mpsse.output(pin, next)
    }

    /// Two toggles: the pin ends where it started.
    pub fn pulse_pin(&mut self, pin: GpioPin) -> Result<()> {
        self.toggle_pin(pin)?;
        self.toggle_pin(pin)
    }

    /// Pulses D7 for a logic analyser.
    pub fn trigger_pulse(&mut self) -> Result<()> {
        self.pulse_pin(TRIGGER_PIN)
    }

    /// Shadow level, not a fresh sample.
    pub fn is_pin_high(&self, pin: GpioPin) -> bool {
        self.mpsse.registers().level_of(pin) == PinState::High
    }
}

impl<T: Transport> SpiBus for SoftSpi<T> {
    /// Only `clock_hz`, `bit_order` and `cs_policy` matter here; the pins are
    /// fixed to D0-D4 and D7.
    fn configure(&mut self, config: &SpiConfig) -> Result<()> {
        debug!(
            "Configuring soft SPI: {} Hz, {:?}",
            config.clock_hz, config.bit_order
        );
        self.bit_order = config.bit_order;
        self.cs_policy = config.cs_policy;
        self.max_speed_hz = config.clock_hz;
        let deasserted = self.cs_policy.deasserted_level();
        self.mpsse.config_pins(
            &[
                PinConfig::output(CLOCK_PIN, PinState::Low),
                PinConfig::output(DATA_OUT_PIN, PinState::Low),
                PinConfig::input(DATA_IN_PIN),
                PinConfig::output(DEFAULT_CS_PIN, deasserted),
                PinConfig::output(RESET_PIN, PinState::High),
                PinConfig::output(TRIGGER_PIN, PinState::Low),
            ],
            true,
        )?;
        self.mpsse.transport_mut().set_pacing(config.clock_hz)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err(error::empty_transfer());
        }
        let bracket = self.cs_policy.brackets_transfers();
        if bracket {
            self.assert_chip_select()?;
        }
        for &byte in data {
            self.write_byte(byte)?;
        }
        if bracket {
            self.deassert_chip_select()?;
        }
        Ok(())
    }

    /// Clocks out zeros.
    fn read(&mut self, len: usize) -> Result<Vec<u8>> {
        self.transfer(&vec![0u8; len])
    }

    fn transfer(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        if data.is_empty() {
            return Err(error::empty_transfer());
        }
        let bracket = self.cs_policy.brackets_transfers();
        if bracket {
            self.assert_chip_select()?;
        }
        let mut received = Vec::with_capacity(data.len());
        for &byte in data {
            received.push(self.transfer_byte(byte)?);
        }
        if bracket {
            self.deassert_chip_select()?;
        }
        Ok(received)
    }

    fn assert_chip_select(&mut self) -> Result<()> {
        let level = self.cs_policy.asserted_level();
        self.mpsse.output(DEFAULT_CS_PIN, level)
    }

    fn deassert_chip_select(&mut self) -> Result<()> {
        let level = self.cs_policy.deasserted_level();
        self.mpsse.output(DEFAULT_CS_PIN, level)
    }

    fn close(&mut self) -> Result<()> {
        debug!("Soft SPI closing device");
        self.mpsse.close()
    }
}
