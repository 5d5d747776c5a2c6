//! The USB seam the MPSSE engine is written against.

use crate::error::Result;

/// Bit mode of the FTDI channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitMode {
    /// Plain UART/FIFO operation.
    Reset,
    /// Multi-Protocol Synchronous Serial Engine.
    Mpsse,
}

/// Raw byte pipe to an FTDI channel.
///
/// Implemented by [`FtdiTransport`] over libftdi1 and by test doubles.
/// Everything above this trait only sees bytes.
pub trait Transport {
    /// Bulk write. Returns how many bytes the device accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Bulk read of whatever is buffered. `Ok(0)` means nothing yet.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    fn set_bitmode(&mut self, mask: u8, mode: BitMode) -> Result<()>;

    /// Read and write chunk size, in bytes.
    fn set_chunk_size(&mut self, size: u32) -> Result<()>;

    /// Pacing hint for bit-banged protocols. Transports without one ignore it.
    fn set_pacing(&mut self, _hz: u32) -> Result<()> {
        Ok(())
    }

    /// Release the underlying handle.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        (**self).write(data)
    }
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }
    fn set_bitmode(&mut self, mask: u8, mode: BitMode) -> Result<()> {
        (**self).set_bitmode(mask, mode)
    }
    fn set_chunk_size(&mut self, size: u32) -> Result<()> {
        (**self).set_chunk_size(size)
    }
    fn set_pacing(&mut self, hz: u32) -> Result<()> {
        (**self).set_pacing(hz)
    }
    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

#[cfg(feature = "libftdi")]
pub use self::libftdi::FtdiTransport;

#[cfg(feature = "libftdi")]
mod libftdi {
    use super::{BitMode, Transport};
    use crate::device::{Channel, DeviceSelector, OpenFailure};
    use crate::error::{Error, Result};
    use log::{debug, trace};
    use std::io::{Read, Write};

    /// [`Transport`] over a libftdi1 device handle.
    pub struct FtdiTransport {
        device: Option<ftdi::Device>,
    }

    impl FtdiTransport {
        /// Opens the first device matching `selector`.
        pub fn open(selector: &DeviceSelector) -> Result<Self> {
            let interface = match selector.channel {
                Channel::A => ftdi::Interface::A,
                Channel::B => ftdi::Interface::B,
                Channel::C => ftdi::Interface::C,
                Channel::D => ftdi::Interface::D,
            };
            debug!(
                "Looking for FTDI device VID={:04X} PID={:04X} channel {:?}",
                selector.vid, selector.pid, selector.channel
            );
            let mut device = ftdi::find_by_vid_pid(selector.vid, selector.pid)
                .interface(interface)
                .open()
                .map_err(|e| {
                    let message = e.to_string();
                    match OpenFailure::classify(&message) {
                        Some(failure) => selector.open_error(failure, message),
                        None => Error::Ftdi(e),
                    }
                })?;
            device.usb_reset()?;
            device.set_latency_timer(2)?;
            debug!(
                "Opened FTDI device VID={:04X} PID={:04X}",
                selector.vid, selector.pid
            );
            Ok(Self {
                device: Some(device),
            })
        }

        fn device(&mut self) -> Result<&mut ftdi::Device> {
            self.device.as_mut().ok_or(Error::DeviceNotOpen)
        }
    }

    impl Transport for FtdiTransport {
        fn write(&mut self, data: &[u8]) -> Result<usize> {
            let written = self.device()?.write(data)?;
            trace!("Sent {} of {} bytes", written, data.len());
            Ok(written)
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            Ok(self.device()?.read(buf)?)
        }

        fn set_bitmode(&mut self, mask: u8, mode: BitMode) -> Result<()> {
            let mode = match mode {
                BitMode::Reset => ftdi::BitMode::Reset,
                BitMode::Mpsse => ftdi::BitMode::Mpsse,
            };
            self.device()?.set_bitmode(mask, mode)?;
            Ok(())
        }

        fn set_chunk_size(&mut self, size: u32) -> Result<()> {
            let device = self.device()?;
            device.set_read_chunksize(size);
            device.set_write_chunksize(size);
            Ok(())
        }

        fn set_pacing(&mut self, hz: u32) -> Result<()> {
            self.device()?.set_baud_rate(hz)?;
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            // Dropping the handle closes it.
            self.device.take();
            Ok(())
        }
    }
}
