use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when driving an MPSSE bridge.
///
/// Transport failures are passed up unchanged through the GPIO and SPI
/// layers. Only [`Error::SyncFailure`] and [`Error::DeviceNotFound`] are
/// fatal; they are raised while a handle is being brought up, so no usable
/// instance ever exists after them.
#[derive(Error, Debug)]
pub enum Error {
    /// Error from the libftdi binding.
    #[cfg(feature = "libftdi")]
    #[error("libftdi error: {0}")]
    Ftdi(#[from] ftdi::Error),
    /// General I/O error during device communication.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// No USB device matched the requested vendor/product pair.
    #[error("Device {vid:04X}:{pid:04X} not found: {message}")]
    DeviceNotFound {
        /// Vendor ID that was searched for.
        vid: u16,
        /// Product ID that was searched for.
        pid: u16,
        /// Detail reported by the USB layer.
        message: String,
    },
    /// Unloading or reloading the platform serial drivers needs elevated privileges.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    /// The handle was closed (or never opened).
    #[error("Device is not open")]
    DeviceNotOpen,
    /// The transport accepted fewer bytes than were handed to it.
    #[error("Short write: expected to write {expected} bytes, only {actual} written")]
    ShortWrite {
        /// Bytes requested.
        expected: usize,
        /// Bytes the transport reported as written.
        actual: usize,
    },
    /// The bad-opcode handshake never produced the `0xFA 0xAB` echo.
    #[error("Could not synchronize with MPSSE after {attempts} attempts")]
    SyncFailure {
        /// Number of poll reads performed.
        attempts: u32,
    },
    /// Not enough bytes arrived before the poll deadline.
    #[error("Timed out after {timeout:?} polling for {expected} bytes (received {received})")]
    PollTimeout {
        /// Bytes the caller was waiting for.
        expected: usize,
        /// Bytes collected before the deadline.
        received: usize,
        /// The deadline that elapsed.
        timeout: Duration,
    },
    /// GPIO pin number is outside 0-15.
    #[error("GPIO pin {pin} argument out of range (0-15): {message}")]
    PinArgumentOutOfRange {
        /// The invalid pin number that was specified.
        pin: u8,
        /// Detailed error message explaining the constraint.
        message: String,
    },
    /// Function argument is outside the valid range.
    #[error("Argument out of range: {0}")]
    ArgumentOutOfRange(String),
    /// Requested operation exceeds device or protocol limits.
    #[error("Requested operation size is too large (max {max}, got {actual})")]
    OperationTooLarge {
        /// Maximum allowed size for this operation.
        max: usize,
        /// Actual size requested.
        actual: usize,
    },
}

/// Result type alias for MPSSE operations.
pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn empty_transfer() -> Error {
    Error::ArgumentOutOfRange("SPI transfer length must be at least 1 byte".to_string())
}
