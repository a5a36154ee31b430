//! On/off relay channel (pump, valve).
//!
//! Wraps a single [`OutputPin`] and remembers the commanded state so
//! callers never need to read the line back. Polarity is configurable:
//! the common opto-isolated boards energise the coil on a LOW input.
//!
//! The output is driven to OFF on construction, so a restart never
//! inherits whatever the line was left at.

use embedded_hal::digital::{Error as _, OutputPin};

use crate::error::{DeviceError, Result};

pub struct Relay<P> {
    pin: P,
    active_high: bool,
    on: bool,
}

impl<P: OutputPin> Relay<P> {
    pub fn new(pin: P, active_high: bool) -> Result<Self> {
        let mut relay = Self {
            pin,
            active_high,
            on: true,
        };
        relay.set(false)?;
        Ok(relay)
    }

    /// Drive the coil. Re-asserts the level even when unchanged.
    pub fn set(&mut self, on: bool) -> Result<()> {
        let high = on == self.active_high;
        let driven = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        driven.map_err(|e| DeviceError::Pin(e.kind()))?;
        self.on = on;
        Ok(())
    }

    pub fn on(&mut self) -> Result<()> {
        self.set(true)
    }

    pub fn off(&mut self) -> Result<()> {
        self.set(false)
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn release(self) -> P {
        self.pin
    }
}
