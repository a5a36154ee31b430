//! Unified error types for the water-quality monitor.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! poller's fault handling uniform. All variants are `Copy` so a fault can
//! be rendered into a snapshot and logged without allocation.

use core::fmt;

use embedded_hal::digital;
use embedded_hal::i2c;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Bus or transport failure talking to a device.
    Device(DeviceError),
    /// No sensor hardware detected (typically at startup).
    DeviceNotFound(&'static str),
    /// Malformed fit data, channel index or actuator command.
    InvalidInput(&'static str),
    /// A device payload did not match the expected format.
    Parse(&'static str),
    /// Configuration or calibration file could not be used.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device(e) => write!(f, "device error: {e}"),
            Self::DeviceNotFound(what) => write!(f, "device not found: {what}"),
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Device errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// I2C transaction failed.
    Bus(i2c::ErrorKind),
    /// GPIO write failed.
    Pin(digital::ErrorKind),
    /// Reading a device file failed.
    Io(std::io::ErrorKind),
    /// The read completed but took longer than the per-channel budget.
    BudgetExceeded,
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(kind) => write!(f, "I2C bus: {kind}"),
            Self::Pin(kind) => write!(f, "GPIO: {kind}"),
            Self::Io(kind) => write!(f, "I/O: {kind}"),
            Self::BudgetExceeded => write!(f, "read exceeded its time budget"),
        }
    }
}

impl From<DeviceError> for Error {
    fn from(e: DeviceError) -> Self {
        Self::Device(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Device(DeviceError::Io(e.kind()))
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
