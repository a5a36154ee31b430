//! PCF8591 8-bit I2C ADC and the analog channel reader built on it.
//!
//! pH, TDS and turbidity probes are wired to AIN0..AIN3 of a single
//! converter. A conversion is triggered by writing the control byte; the
//! first byte read back belongs to the *previous* conversion (the
//! sample-and-hold lags by one), so it is discarded before the settled
//! value is read.
//!
//! ## Bus ownership
//!
//! All channels share one converter through [`SharedAdc`]. The poller is
//! the only component that reads channels, so the mutex is uncontended;
//! it exists to make the single-owner discipline explicit.

use std::sync::{Arc, Mutex, PoisonError};

use embedded_hal::i2c::{self, I2c};
use log::debug;

use super::calibration::CalibrationModel;
use super::{ChannelReader, round_to};
use crate::error::{DeviceError, Error, Result};

/// Factory-default 7-bit address (A0..A2 tied low).
pub const DEFAULT_ADDRESS: u8 = 0x48;

/// Analog-output enable, four single-ended inputs, no auto-increment.
const CONTROL_BASE: u8 = 0x40;

const MAX_CHANNEL: u8 = 3;
const FULL_SCALE: f64 = 255.0;

fn bus_error<E: i2c::Error>(e: E) -> Error {
    DeviceError::Bus(e.kind()).into()
}

/// Convert a raw 8-bit conversion into volts, rounded to 4 decimals.
pub fn raw_to_voltage(raw: u8, vref: f64) -> f64 {
    round_to(f64::from(raw) / FULL_SCALE * vref, 4)
}

pub struct Pcf8591<I2C> {
    i2c: I2C,
    address: u8,
    vref: f64,
}

impl<I2C: I2c> Pcf8591<I2C> {
    pub fn new(i2c: I2C, address: u8, vref: f64) -> Self {
        Self { i2c, address, vref }
    }

    pub fn vref(&self) -> f64 {
        self.vref
    }

    /// Select `channel`, drop the stale sample and return the settled byte.
    pub fn read_raw(&mut self, channel: u8) -> Result<u8> {
        if channel > MAX_CHANNEL {
            return Err(Error::InvalidInput("PCF8591 channel must be 0..=3"));
        }
        self.i2c
            .write(self.address, &[CONTROL_BASE | channel])
            .map_err(bus_error)?;

        let mut buf = [0u8; 1];
        self.i2c.read(self.address, &mut buf).map_err(bus_error)?;
        self.i2c.read(self.address, &mut buf).map_err(bus_error)?;
        Ok(buf[0])
    }

    pub fn read_voltage(&mut self, channel: u8) -> Result<f64> {
        let raw = self.read_raw(channel)?;
        Ok(raw_to_voltage(raw, self.vref))
    }

    /// Give back the bus (used by tests to inspect a mock).
    pub fn release(self) -> I2C {
        self.i2c
    }
}

/// Converter handle shared by every analog channel.
pub type SharedAdc<I2C> = Arc<Mutex<Pcf8591<I2C>>>;

pub fn shared<I2C>(adc: Pcf8591<I2C>) -> SharedAdc<I2C> {
    Arc::new(Mutex::new(adc))
}

/// One input of the shared converter, with its optional calibration.
pub struct AnalogChannel<I2C> {
    adc: SharedAdc<I2C>,
    channel: u8,
    calibration: Option<CalibrationModel>,
}

impl<I2C: I2c> AnalogChannel<I2C> {
    pub fn new(
        adc: SharedAdc<I2C>,
        channel: u8,
        calibration: Option<CalibrationModel>,
    ) -> Result<Self> {
        if channel > MAX_CHANNEL {
            return Err(Error::InvalidInput("PCF8591 channel must be 0..=3"));
        }
        Ok(Self {
            adc,
            channel,
            calibration,
        })
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    fn with_adc<T>(&self, f: impl FnOnce(&mut Pcf8591<I2C>) -> Result<T>) -> Result<T> {
        let mut adc = self.adc.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut adc)
    }
}

impl<I2C: I2c + Send> ChannelReader for AnalogChannel<I2C> {
    fn read_raw(&mut self) -> Result<Option<i32>> {
        let raw = self.with_adc(|adc| adc.read_raw(self.channel))?;
        Ok(Some(i32::from(raw)))
    }

    /// Volts, passed through the channel's calibration when one exists.
    fn read_physical(&mut self) -> Result<Option<f64>> {
        let voltage = self.with_adc(|adc| adc.read_voltage(self.channel))?;
        let value = match self.calibration {
            Some(cal) => cal.apply(voltage),
            None => voltage,
        };
        debug!("AIN{}: {:.4} V -> {:.4}", self.channel, voltage, value);
        Ok(Some(value))
    }
}
