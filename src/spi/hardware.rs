use super::{
    encode_length, BitOrder, ChipSelect, ChipSelectPolicy, ClockEdge, SpiBus, SpiConfig, SpiMode,
    CLOCK_PIN, DATA_IN_PIN, DATA_OUT_PIN, TRIGGER_PIN,
};
use crate::clock::ClockConfig;
use crate::consts::opcode;
use crate::error::Result;
use crate::gpio::{GpioDirection, PinConfig, PinState};
use crate::mpsse::Mpsse;
use crate::transport::Transport;
use log::{debug, trace};

#[cfg(feature = "libftdi")]
use crate::device::{DeviceSelector, OpenOptions};
#[cfg(feature = "libftdi")]
use crate::mpsse::MpsseConfig;
#[cfg(feature = "libftdi")]
use crate::transport::FtdiTransport;

/// SPI clocked by the MPSSE engine itself.
///
/// Chip select is a plain GPIO pushed around the clock-bytes commands, so any
/// pin can serve. The engine processes commands in order, which keeps those
/// pushes correctly framed around the data.
#[derive(Debug)]
pub struct HardwareSpi<T: Transport> {
    mpsse: Mpsse<T>,
    chip_select: ChipSelect,
    cs_policy: ChipSelectPolicy,
    mode: SpiMode,
    bit_order: BitOrder,
    trigger_enabled: bool,
    // Reused across transfers; never shared between handles.
    command: Vec<u8>,
}

#[cfg(feature = "libftdi")]
impl HardwareSpi<FtdiTransport> {
    /// Opens a device and configures it with [`SpiConfig::default`].
    pub fn open_default(selector: &DeviceSelector, options: OpenOptions) -> Result<Self> {
        let mpsse = Mpsse::open_device(selector, options, MpsseConfig::default())?;
        let mut spi = Self::new(mpsse);
        spi.configure(&SpiConfig::default())?;
        Ok(spi)
    }
}

impl<T: Transport> HardwareSpi<T> {
    /// Wraps an engine that has already been opened and synchronized.
    pub fn new(mpsse: Mpsse<T>) -> Self {
        Self {
            mpsse,
            chip_select: ChipSelect::None,
            cs_policy: ChipSelectPolicy::default(),
            mode: SpiMode::default(),
            bit_order: BitOrder::default(),
            trigger_enabled: false,
            command: Vec::new(),
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

    pub fn mode(&self) -> SpiMode {
        self.mode
    }

    pub fn bit_order(&self) -> BitOrder {
        self.bit_order
    }

    pub fn chip_select(&self) -> ChipSelect {
        self.chip_select
    }

    pub fn cs_policy(&self) -> ChipSelectPolicy {
        self.cs_policy
    }

    pub fn cs_policy_mut(&mut self) -> &mut ChipSelectPolicy {
        &mut self.cs_policy
    }

    /// Selects the edges and drives SCK to the mode's idle level immediately.
    pub fn set_mode(&mut self, mode: SpiMode) -> Result<()> {
        debug!("SPI mode {:?}", mode);
        self.mode = mode;
        self.mpsse.config_pins(
            &[
                PinConfig::output(CLOCK_PIN, mode.idle_level()),
                PinConfig::output(DATA_OUT_PIN, PinState::DontCare),
                PinConfig::input(DATA_IN_PIN),
            ],
            true,
        )
    }

    pub fn set_bit_order(&mut self, order: BitOrder) {
        self.bit_order = order;
    }

    /// Changes the SCK frequency. Not every rate is reachable; the divisor
    /// rounds toward the next slower one.
    ///
    /// Adaptive and three-phase clocking stay as the engine last had them.
    pub fn set_clock(&mut self, hz: u32) -> Result<()> {
        let clock = match self.mpsse.clock() {
            Some(current) => ClockConfig {
                frequency_hz: hz,
                ..current
            },
            None => ClockConfig::new(hz),
        };
        self.mpsse.configure(&clock)
    }

    /// Direct pin configuration, pushed in one write.
    pub fn configure_pins(&mut self, pins: &[PinConfig]) -> Result<()> {
        self.mpsse.config_pins(pins, true)
    }

    /// Reserves D7 as a logic-analyser trigger. Applied by the next `configure`.
    pub fn enable_trigger(&mut self) {
        self.trigger_enabled = true;
    }

    /// Pulses D7 high then low. Carries no protocol meaning.
    pub fn trigger_pulse(&mut self) -> Result<()> {
        self.mpsse.output_high(TRIGGER_PIN)?;
        self.mpsse.output_low(TRIGGER_PIN)
    }

    /// Suspends per-transfer CS handling until [`release_control_of_cs`](Self::release_control_of_cs).
    pub fn take_control_of_cs(&mut self) {
        self.cs_policy.manual = true;
    }

    pub fn release_control_of_cs(&mut self) {
        self.cs_policy.manual = false;
    }

    /// Writes one raw byte to the engine, bracketed by CS per policy.
    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        let bracket = self.cs_policy.brackets_transfers();
        if bracket {
            self.assert_chip_select()?;
        }
        self.mpsse.write_byte(byte)?;
        if bracket {
            self.deassert_chip_select()?;
        }
        Ok(())
    }

    fn order_bits(&self) -> u8 {
        match self.bit_order {
            BitOrder::MsbFirst => 0,
            BitOrder::LsbFirst => opcode::LSB_FIRST,
        }
    }

    fn write_edge_bits(&self) -> u8 {
        match self.mode.write_edge() {
            ClockEdge::Rising => 0,
            ClockEdge::Falling => opcode::WRITE_NEG_EDGE,
        }
    }

    fn read_edge_bits(&self) -> u8 {
        match self.mode.read_edge() {
            ClockEdge::Rising => 0,
            ClockEdge::Falling => opcode::READ_NEG_EDGE,
        }
    }

    fn drive_chip_select(&mut self, level: PinState) -> Result<()> {
        match self.chip_select.software_pin() {
            Some(pin) => {
                trace!("SPI chip select {} -> {:?}", pin, level);
                self.mpsse.output(pin, level)
            }
            None => Ok(()),
        }
    }
}

impl<T: Transport> SpiBus for HardwareSpi<T> {
    fn configure(&mut self, config: &SpiConfig) -> Result<()> {
        debug!("Configuring hardware SPI: {:?}", config);
        self.chip_select = config.chip_select;
        self.cs_policy = config.cs_policy;
        self.bit_order = config.bit_order;

        // CPOL has to be on the wire before anything can clock.
        self.mpsse.set_config_pin(CLOCK_PIN, GpioDirection::Output);
        self.mpsse.output(CLOCK_PIN, config.mode.idle_level())?;

        if self.trigger_enabled {
            self.mpsse.set_config_pin(TRIGGER_PIN, GpioDirection::Output);
            self.mpsse.output_low(TRIGGER_PIN)?;
        }

        if let Some(pin) = self.chip_select.software_pin() {
            debug!("SPI chip select on pin {}", pin);
            self.mpsse.set_config_pin(pin, GpioDirection::Output);
            self.mpsse.output(pin, self.cs_policy.deasserted_level())?;
        }

        self.set_clock(config.clock_hz)?;
        self.set_mode(config.mode)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        let [len_low, len_high] = encode_length(data.len())?;
        let command = [
            opcode::CLOCK_BYTES_OUT | self.order_bits() | self.write_edge_bits(),
            len_low,
            len_high,
        ];
        trace!("SPI write {} bytes, command {:02X?}", data.len(), command);

        let bracket = self.cs_policy.brackets_transfers();
        if bracket {
            self.assert_chip_select()?;
        }
        self.mpsse.write(&command)?;
        self.mpsse.write(data)?;
        if bracket {
            self.deassert_chip_select()?;
        }
        Ok(())
    }

    fn read(&mut self, len: usize) -> Result<Vec<u8>> {
        let [len_low, len_high] = encode_length(len)?;
        let command = [
            opcode::CLOCK_BYTES_IN | self.order_bits() | self.read_edge_bits(),
            len_low,
            len_high,
            opcode::SEND_IMMEDIATE,
        ];
        trace!("SPI read {} bytes, command {:02X?}", len, command);

        let bracket = self.cs_policy.brackets_transfers();
        if bracket {
            self.assert_chip_select()?;
        }
        self.mpsse.write(&command)?;
        if bracket {
            self.deassert_chip_select()?;
        }
        self.mpsse.read(len)
    }

    fn transfer(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        let [len_low, len_high] = encode_length(data.len())?;
        let op = opcode::CLOCK_BYTES_IN_OUT
            | self.order_bits()
            | self.read_edge_bits()
            | self.write_edge_bits();
        self.command.clear();
        self.command.extend_from_slice(&[op, len_low, len_high]);
        self.command.extend_from_slice(data);
        self.command.push(opcode::SEND_IMMEDIATE);
        trace!("SPI transfer {} bytes, command 0x{:02X}", data.len(), op);

        let bracket = self.cs_policy.brackets_transfers();
        if bracket {
            self.assert_chip_select()?;
        }
        self.mpsse.write(&self.command)?;
        let response = self.mpsse.read(data.len())?;
        if bracket {
            self.deassert_chip_select()?;
        }
        Ok(response)
    }

    fn assert_chip_select(&mut self) -> Result<()> {
        let level = self.cs_policy.asserted_level();
        self.drive_chip_select(level)
    }

    fn deassert_chip_select(&mut self) -> Result<()> {
        let level = self.cs_policy.deasserted_level();
        self.drive_chip_select(level)
    }

    fn close(&mut self) -> Result<()> {
        debug!("SPI closing device");
        self.mpsse.close()
    }
}
