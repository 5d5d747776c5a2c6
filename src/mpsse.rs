//! The MPSSE protocol driver: clocking, synchronization and GPIO banks.

use crate::clock::ClockConfig;
use crate::consts::{self, opcode};
use crate::device::DriverGuard;
use crate::error::{Error, Result};
use crate::gpio::{GpioDirection, GpioPin, GpioRegisters, PinConfig, PinState};
use crate::transport::{BitMode, Transport};
use log::{debug, info, trace, warn};
use std::fmt;
use std::time::{Duration, Instant};

#[cfg(feature = "libftdi")]
use crate::device::{DeviceSelector, OpenOptions};
#[cfg(feature = "libftdi")]
use crate::transport::FtdiTransport;

/// Bring-up and polling behaviour of an [`Mpsse`] handle.
#[derive(Debug, Clone, PartialEq)]
pub struct MpsseConfig {
    pub clock: ClockConfig,
    /// Poll reads allowed for the bad-opcode handshake.
    pub sync_retries: u32,
    /// Deadline used by reads that do not pass their own.
    pub poll_timeout: Duration,
    /// Sleep between empty reads while polling. `None` spins, calling the
    /// transport back to back for the whole deadline and keeping a core busy.
    pub poll_interval: Option<Duration>,
}

/// 1 MHz, 10 sync retries, 3 s poll deadline, busy polling. Lowest latency;
/// use [`MpsseConfig::relaxed`] when CPU time matters more.
impl Default for MpsseConfig {
    fn default() -> Self {
        Self {
            clock: ClockConfig::default(),
            sync_retries: consts::DEFAULT_SYNC_RETRIES,
            poll_timeout: Duration::from_secs(3),
            poll_interval: None,
        }
    }
}

impl MpsseConfig {
    /// Sleeps 1 ms between empty polls. Slower, but leaves the CPU alone.
    pub fn relaxed() -> Self {
        Self {
            poll_interval: Some(Duration::from_millis(1)),
            ..Self::default()
        }
    }

    pub fn clock(mut self, clock: ClockConfig) -> Self {
        self.clock = clock;
        self
    }
}

/// An FTDI channel running in MPSSE mode.
///
/// Owns the transport, the GPIO shadow registers and the read buffers. Not
/// meant to be shared between threads; wrap it in a mutex if you must.
pub struct Mpsse<T: Transport> {
    transport: T,
    registers: GpioRegisters,
    clock: Option<ClockConfig>,
    config: MpsseConfig,
    chunk: Vec<u8>,
    drivers: Option<DriverGuard>,
    open: bool,
}

#[cfg(feature = "libftdi")]
impl Mpsse<FtdiTransport> {
    /// Opens a USB device and brings the engine up with `config`.
    pub fn open_device(
        selector: &DeviceSelector,
        options: OpenOptions,
        config: MpsseConfig,
    ) -> Result<Self> {
        let drivers = if options.unload_drivers {
            Some(DriverGuard::unload()?)
        } else {
            None
        };
        let transport = FtdiTransport::open(selector)?;
        let mut mpsse = Self::open(transport, config)?;
        mpsse.drivers = drivers;
        Ok(mpsse)
    }
}

impl<T: Transport> Mpsse<T> {
    /// Wraps a transport without touching the device.
    pub fn new(transport: T, config: MpsseConfig) -> Self {
        Self {
            transport,
            registers: GpioRegisters::new(),
            clock: None,
            config,
            chunk: Vec::new(),
            drivers: None,
            open: true,
        }
    }

    /// Full bring-up: [`initialize`](Self::initialize),
    /// [`configure`](Self::configure), then [`synchronize`](Self::synchronize).
    ///
    /// Any failure, sync included, drops the handle.
    pub fn open(transport: T, config: MpsseConfig) -> Result<Self> {
        let mut mpsse = Self::new(transport, config);
        mpsse.initialize()?;
        let clock = mpsse.config.clock;
        mpsse.configure(&clock)?;
        debug!("MPSSE syncing");
        if let Err(e) = mpsse.synchronize(mpsse.config.sync_retries) {
            warn!("MPSSE failed to sync: {}", e);
            return Err(e);
        }
        info!("MPSSE synced");
        Ok(mpsse)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn config(&self) -> &MpsseConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut MpsseConfig {
        &mut self.config
    }

    pub fn registers(&self) -> &GpioRegisters {
        &self.registers
    }

    /// Last clock applied with [`configure`](Self::configure).
    pub fn clock(&self) -> Option<ClockConfig> {
        self.clock
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Switches the channel to MPSSE and maxes out the USB chunk size.
    pub fn initialize(&mut self) -> Result<()> {
        self.ensure_open()?;
        debug!("Enabling MPSSE, chunk size {}", consts::CHUNK_SIZE);
        self.transport.set_chunk_size(consts::CHUNK_SIZE as u32)?;
        self.chunk = vec![0u8; consts::CHUNK_SIZE];
        self.transport.set_bitmode(0x00, BitMode::Mpsse)?;
        Ok(())
    }

    /// Sets clock divide, adaptive and three-phase modes, then the divisor.
    pub fn configure(&mut self, clock: &ClockConfig) -> Result<()> {
        let divisor = clock.divisor()?;
        let modes = [
            opcode::DISABLE_CLOCK_DIVIDE_BY_5,
            if clock.adaptive {
                opcode::ENABLE_ADAPTIVE_CLOCK
            } else {
                opcode::DISABLE_ADAPTIVE_CLOCK
            },
            if clock.three_phase {
                opcode::ENABLE_3_PHASE_CLOCK
            } else {
                opcode::DISABLE_3_PHASE_CLOCK
            },
        ];
        debug!(
            "Setting clock {} Hz (adaptive={}, three_phase={}): divisor {}",
            clock.frequency_hz, clock.adaptive, clock.three_phase, divisor
        );
        self.write(&modes)?;
        let [low, high] = divisor.to_le_bytes();
        self.write(&[opcode::SET_CLOCK_DIVISOR, low, high])?;
        self.clock = Some(*clock);
        Ok(())
    }

    /// Sends the bad opcode and polls until the chip echoes `0xFA 0xAB`.
    ///
    /// Every mismatching 2-byte read counts as one attempt; after
    /// `max_retries` of them this fails with [`Error::SyncFailure`].
    /// A device that sends nothing at all fails the first attempt's poll
    /// instead, so the error is [`Error::PollTimeout`].
    pub fn synchronize(&mut self, max_retries: u32) -> Result<()> {
        self.write(&[opcode::BAD_COMMAND])?;
        let timeout = self.config.poll_timeout;
        let mut attempts = 0;
        while attempts < max_retries {
            attempts += 1;
            let data = self.poll_read(2, timeout)?;
            if data[..] == opcode::BAD_COMMAND_ECHO {
                debug!("MPSSE sync after {} attempt(s)", attempts);
                return Ok(());
            }
            warn!(
                "MPSSE sync attempt {} got {:02X?}, trying again",
                attempts, data
            );
        }
        Err(Error::SyncFailure { attempts })
    }

    // --- Raw transport ---

    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_open()?;
        trace!("MPSSE write: {:02X?}", data);
        let written = self.transport.write(data)?;
        if written != data.len() {
            return Err(Error::ShortWrite {
                expected: data.len(),
                actual: written,
            });
        }
        Ok(())
    }

    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.write(&[byte])
    }

    /// Collects exactly `expected` bytes or fails with [`Error::PollTimeout`].
    ///
    /// Bytes beyond `expected` that arrive in the same USB read are dropped.
    pub fn poll_read(&mut self, expected: usize, timeout: Duration) -> Result<Vec<u8>> {
        self.ensure_open()?;
        if self.chunk.is_empty() {
            self.chunk = vec![0u8; consts::CHUNK_SIZE];
        }
        let mut response = Vec::with_capacity(expected);
        let start = Instant::now();
        while response.len() < expected {
            let read = self.transport.read(&mut self.chunk)?;
            let take = read.min(expected - response.len());
            response.extend_from_slice(&self.chunk[..take]);
            if take < read {
                warn!("Dropping {} surplus byte(s) from poll read", read - take);
            }
            if response.len() == expected {
                break;
            }
            if start.elapsed() > timeout {
                return Err(Error::PollTimeout {
                    expected,
                    received: response.len(),
                    timeout,
                });
            }
            if read == 0 {
                if let Some(interval) = self.config.poll_interval {
                    std::thread::sleep(interval);
                }
            }
        }
        trace!("MPSSE read: {:02X?}", response);
        Ok(response)
    }

    /// [`poll_read`](Self::poll_read) with the configured default deadline.
    pub fn read(&mut self, expected: usize) -> Result<Vec<u8>> {
        let timeout = self.config.poll_timeout;
        self.poll_read(expected, timeout)
    }

    // --- GPIO banks ---

    fn gpio_command(&self) -> [u8; 6] {
        let (direction, level) = self.registers.snapshot();
        let [level_low, level_high] = level.to_le_bytes();
        let [dir_low, dir_high] = direction.to_le_bytes();
        [
            opcode::SET_BITS_LOW,
            level_low,
            dir_low,
            opcode::SET_BITS_HIGH,
            level_high,
            dir_high,
        ]
    }

    /// Pushes both banks from the shadow registers in one write.
    pub fn write_gpio_banks(&mut self) -> Result<()> {
        let command = self.gpio_command();
        self.write(&command)
    }

    /// Reads both banks: D0-D7 in the low byte, C0-C7 in the high byte.
    pub fn read_gpio_banks(&mut self) -> Result<u16> {
        self.write(&[opcode::GET_BITS_LOW, opcode::GET_BITS_HIGH])?;
        let data = self.read(2)?;
        let pins = u16::from_le_bytes([data[0], data[1]]);
        trace!("Read GPIO banks: 0x{:04X}", pins);
        Ok(pins)
    }

    // --- Pin helpers (model only) ---

    /// Sets direction without writing to the device.
    pub fn set_config_pin(&mut self, pin: GpioPin, direction: GpioDirection) {
        self.registers.set_direction(pin, direction);
    }

    /// Sets the level without writing to the device.
    pub fn set_pin(&mut self, pin: GpioPin, state: PinState) {
        self.registers.set_level(pin, state);
    }

    pub fn set_high(&mut self, pin: GpioPin) {
        self.set_pin(pin, PinState::High);
    }

    pub fn set_low(&mut self, pin: GpioPin) {
        self.set_pin(pin, PinState::Low);
    }

    // --- Pin helpers (model + push) ---

    pub fn config_pin(&mut self, pin: GpioPin, direction: GpioDirection) -> Result<()> {
        self.set_config_pin(pin, direction);
        self.write_gpio_banks()
    }

    /// Applies a batch of pin configurations, pushing once if `write` is set.
    pub fn config_pins(&mut self, pins: &[PinConfig], write: bool) -> Result<()> {
        for config in pins {
            self.registers.set_direction(config.pin, config.direction);
            self.registers.set_level(config.pin, config.value);
        }
        if write {
            self.write_gpio_banks()?;
        }
        Ok(())
    }

    pub fn output(&mut self, pin: GpioPin, state: PinState) -> Result<()> {
        self.set_pin(pin, state);
        self.write_gpio_banks()
    }

    pub fn output_high(&mut self, pin: GpioPin) -> Result<()> {
        self.output(pin, PinState::High)
    }

    pub fn output_low(&mut self, pin: GpioPin) -> Result<()> {
        self.output(pin, PinState::Low)
    }

    /// Samples a pin through a bank read.
    pub fn read_input(&mut self, pin: GpioPin) -> Result<PinState> {
        let pins = self.read_gpio_banks()?;
        Ok(if pins & pin.mask() != 0 {
            PinState::High
        } else {
            PinState::Low
        })
    }

    /// Releases the handle, then reloads any drivers unloaded at open.
    ///
    /// The shadow registers and clock go back to their unopened state; every
    /// later I/O call fails with [`Error::DeviceNotOpen`].
    pub fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        info!("Closing MPSSE device");
        self.open = false;
        self.registers.reset();
        self.clock = None;
        self.chunk = Vec::new();
        self.transport.close()?;
        if let Some(mut drivers) = self.drivers.take() {
            drivers.reload()?;
        }
        info!("MPSSE device closed");
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(Error::DeviceNotOpen)
        }
    }
}

impl<T: Transport> fmt::Debug for Mpsse<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mpsse")
            .field("registers", &self.registers)
            .field("clock", &self.clock)
            .field("config", &self.config)
            .field("open", &self.open)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> fmt::Display for Mpsse<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.registers)
    }
}
