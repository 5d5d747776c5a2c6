//! USB identities, MPSSE opcodes and wire-level limits.

// Default Vendor/Product IDs
/// FTDI vendor ID.
pub const FTDI_VID: u16 = 0x0403;
/// FT232H product ID (single channel, Adafruit breakout and similar).
pub const FT232H_PID: u16 = 0x6014;

/// Transport read/write chunk size. Matches the 16-bit length-minus-one field,
/// so one SPI transaction never exceeds it.
pub const CHUNK_SIZE: usize = 65536;

/// Largest payload a single clock-bytes command can carry.
pub const MAX_TRANSFER_LEN: usize = 65536;

/// Base for the divisor formula. Validated on hardware; do not replace with 60 MHz.
pub const BASE_CLOCK_HZ: u32 = 30_000_000;
/// Slowest clock the FT232H can produce.
pub const MIN_CLOCK_HZ: u32 = 450;
/// Fastest clock the divisor formula yields (divisor 0).
pub const MAX_CLOCK_HZ: u32 = 30_000_000;

pub const DEFAULT_SYNC_RETRIES: u32 = 10;

// --- MPSSE opcodes ---
pub mod opcode {
    /// Set data bits, low byte (D0-D7): value, direction.
    pub const SET_BITS_LOW: u8 = 0x80;
    /// Read data bits, low byte.
    pub const GET_BITS_LOW: u8 = 0x81;
    /// Set data bits, high byte (C0-C7): value, direction.
    pub const SET_BITS_HIGH: u8 = 0x82;
    /// Read data bits, high byte.
    pub const GET_BITS_HIGH: u8 = 0x83;
    /// Set TCK divisor: low byte, high byte.
    pub const SET_CLOCK_DIVISOR: u8 = 0x86;
    /// Flush the chip's read buffer to the host now.
    pub const SEND_IMMEDIATE: u8 = 0x87;
    pub const DISABLE_CLOCK_DIVIDE_BY_5: u8 = 0x8A;
    pub const ENABLE_3_PHASE_CLOCK: u8 = 0x8C;
    pub const DISABLE_3_PHASE_CLOCK: u8 = 0x8D;
    pub const ENABLE_ADAPTIVE_CLOCK: u8 = 0x96;
    pub const DISABLE_ADAPTIVE_CLOCK: u8 = 0x97;
    /// Deliberately invalid; the chip answers with [`BAD_COMMAND_ECHO`].
    pub const BAD_COMMAND: u8 = 0xAB;
    pub const BAD_COMMAND_ECHO: [u8; 2] = [0xFA, BAD_COMMAND];

    // Clock-bytes commands. Modifier bits are OR'd in.
    pub const CLOCK_BYTES_OUT: u8 = 0x10;
    pub const CLOCK_BYTES_IN: u8 = 0x20;
    pub const CLOCK_BYTES_IN_OUT: u8 = 0x30;
    /// Write on the falling clock edge.
    pub const WRITE_NEG_EDGE: u8 = 0x01;
    /// Read on the falling clock edge.
    pub const READ_NEG_EDGE: u8 = 0x04;
    /// Shift LSB first.
    pub const LSB_FIRST: u8 = 0x08;
}
