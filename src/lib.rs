//! # mpsse-bridge
//!
//! A Rust crate for driving the Multi-Protocol Synchronous Serial Engine
//! (MPSSE) of FTDI USB bridge chips, primarily the FT232H: GPIO on both pin
//! banks, SPI clocked by the engine, and bit-banged SPI for oddball targets.
//!
//! USB access goes through the [`Transport`] trait. The `libftdi` feature
//! provides [`FtdiTransport`], built on the `ftdi` crate (libftdi1 bindings).
//! Everything else is plain byte assembly and can be exercised against any
//! `Transport`, which is how the test suite runs without hardware.
//!
//! ## Features
//!
//! *   Engine bring-up: MPSSE bit mode, clock divisor, adaptive and
//!     three-phase clocking, and the bad-opcode sync handshake
//!     ([`Mpsse::open`]).
//! *   Bounded polling reads with a deadline ([`Mpsse::poll_read`]).
//! *   GPIO on 16 pins, D0-D7 and C0-C7 ([`GpioPin`]):
//!     *   Shadow registers for direction and level ([`GpioRegisters`]).
//!     *   Both banks pushed in one write, so pins never glitch between banks.
//!     *   Batch configuration ([`Mpsse::config_pins`]) and input sampling.
//! *   Hardware SPI ([`HardwareSpi`]):
//!     *   All four modes, MSB or LSB first, up to 65536 bytes per command.
//!     *   Chip select on any GPIO, active low or high, per transfer or held.
//!     *   Manual CS control for daisy-chained devices.
//!     *   Optional logic-analyser trigger on D7.
//! *   Software SPI ([`SoftSpi`]) through the GPIO banks.
//! *   Optional unloading of the kernel serial drivers while the device is
//!     open ([`OpenOptions::unload_drivers`]).
//!
//! ## Installation
//!
//! ```toml
//! [dependencies]
//! mpsse-bridge = { version = "0.1.0", features = ["libftdi"] }
//! log = "0.4"          # Optional, for logging
//! ```
//!
//! The `libftdi` feature needs libftdi1 and libusb installed on the system.
//!
//! ## Basic Usage
//!
//! ```no_run
//! # #[cfg(feature = "libftdi")]
//! # fn main() -> mpsse_bridge::Result<()> {
//! use mpsse_bridge::{
//!     spi::{ChipSelect, HardwareSpi, SpiBus, SpiConfig, SpiMode},
//!     DeviceSelector, GpioPin, Mpsse, MpsseConfig, OpenOptions,
//! };
//!
//! // Optional: Initialize logging
//! // env_logger::init();
//!
//! let mpsse = Mpsse::open_device(
//!     &DeviceSelector::ft232h(),
//!     OpenOptions::default(),
//!     MpsseConfig::default(),
//! )?;
//!
//! let mut spi = HardwareSpi::new(mpsse);
//! spi.configure(&SpiConfig {
//!     chip_select: ChipSelect::Default,
//!     clock_hz: 2_000_000,
//!     mode: SpiMode::Mode0,
//!     ..SpiConfig::default()
//! })?;
//!
//! spi.assert_chip_select()?;
//! let id = spi.transfer(&[0x9F, 0x00, 0x00, 0x00])?;
//! spi.deassert_chip_select()?;
//! println!("JEDEC ID: {:02X?}", &id[1..]);
//!
//! // GPIO on the high bank is still free.
//! spi.mpsse_mut().config_pin(GpioPin::C0, mpsse_bridge::GpioDirection::Output)?;
//! spi.mpsse_mut().output_high(GpioPin::C0)?;
//!
//! spi.close()?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "libftdi"))]
//! # fn main() {}
//! ```
//!
//! ## Hardware Setup Notes
//!
//! *   **Linux udev Rules:** Grant user access instead of running as root.
//!     Create `/etc/udev/rules.d/99-ftdi.rules`:
//!     ```udev
//!     SUBSYSTEM=="usb", ATTRS{idVendor}=="0403", ATTRS{idProduct}=="6014", MODE="0666", GROUP="plugdev"
//!     ```
//!     The kernel `ftdi_sio` driver may still claim the channel; libftdi
//!     detaches it, or use [`OpenOptions::unload_drivers`] as root.
//! *   **Voltage Levels:** FT232H I/O is 3.3V, 5V tolerant on inputs.
//!
//! ## Pin Mapping
//!
//! *   D0-D7 (ADBUS) map to `GpioPin(0)`-`GpioPin(7)`, the MPSSE low byte.
//! *   C0-C7 (ACBUS) map to `GpioPin(8)`-`GpioPin(15)`, the high byte.
//! *   SPI uses D0 (SCK), D1 (MOSI), D2 (MISO) and D3 (default CS).
//!
//! ## License
//!
//! This project is licensed under the WTFPL - see the [LICENSE](LICENSE) file for details.

mod consts;
mod error;
pub mod clock;
pub mod device;
pub mod gpio;
pub mod mpsse;
pub mod spi;
pub mod transport;

pub use clock::ClockConfig;
pub use device::{Channel, DeviceSelector, OpenOptions};
pub use error::{Error, Result};
pub use gpio::{GpioDirection, GpioPin, GpioRegisters, PinConfig, PinState};
pub use mpsse::{Mpsse, MpsseConfig};
pub use spi::{HardwareSpi, SoftSpi, SpiBus};
pub use transport::{BitMode, Transport};

#[cfg(feature = "libftdi")]
pub use transport::FtdiTransport;

// Re-export only the constants callers need
pub use consts::{
    opcode, BASE_CLOCK_HZ, FT232H_PID, FTDI_VID, MAX_CLOCK_HZ, MAX_TRANSFER_LEN, MIN_CLOCK_HZ,
};
