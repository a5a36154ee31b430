//! Linux userspace peripherals.
//!
//! Opens the I2C character device for the converter, the GPIO character
//! device for the relays, and finds the thermometer under sysfs. Each
//! function logs the underlying OS error and returns a crate [`Error`]
//! so startup can decide what is fatal.

use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::{CdevPin, Delay, I2cdev};
use log::{info, warn};

use crate::config::SystemConfig;
use crate::error::{Error, Result};
use crate::sensors::analog::Pcf8591;
use crate::sensors::onewire::Ds18b20;

use super::hardware::RelayActuators;

const GPIO_CONSUMER: &str = "bluewater";

pub fn open_adc(config: &SystemConfig) -> Result<Pcf8591<I2cdev>> {
    let path = config.i2c_device();
    let bus = I2cdev::new(&path).map_err(|e| {
        warn!("{}: {}", path.display(), e);
        Error::DeviceNotFound("I2C bus")
    })?;
    info!(
        "PCF8591 on {} at 0x{:02x}, vref {} V",
        path.display(),
        config.adc.address,
        config.adc.vref
    );
    Ok(Pcf8591::new(bus, config.adc.address, config.adc.vref))
}

pub fn discover_thermometer(config: &SystemConfig) -> Result<Ds18b20<Delay>> {
    Ds18b20::discover(&config.onewire.base_dir, config.retry_policy(), Delay)
}

fn request_output(chip: &mut Chip, offset: u32, idle_high: bool) -> Result<CdevPin> {
    let handle = chip
        .get_line(offset)
        .and_then(|line| {
            line.request(LineRequestFlags::OUTPUT, u8::from(idle_high), GPIO_CONSUMER)
        })
        .map_err(|e| {
            warn!("GPIO line {}: {}", offset, e);
            Error::DeviceNotFound("GPIO line")
        })?;
    CdevPin::new(handle).map_err(|e| {
        warn!("GPIO line {}: {}", offset, e);
        Error::DeviceNotFound("GPIO line")
    })
}

pub fn open_relays(config: &SystemConfig) -> Result<RelayActuators<CdevPin>> {
    let gpio = &config.gpio;
    let mut chip = Chip::new(&gpio.chip).map_err(|e| {
        warn!("{}: {}", gpio.chip.display(), e);
        Error::DeviceNotFound("GPIO chip")
    })?;
    // Request the lines at their OFF level so nothing glitches on.
    let idle_high = !gpio.relay_active_high;
    let pump = request_output(&mut chip, gpio.pump_pin, idle_high)?;
    let valve = request_output(&mut chip, gpio.valve_pin, idle_high)?;
    info!(
        "relays on {}: pump={} valve={} active_{}",
        gpio.chip.display(),
        gpio.pump_pin,
        gpio.valve_pin,
        if gpio.relay_active_high { "high" } else { "low" }
    );
    RelayActuators::from_pins(pump, valve, gpio.relay_active_high)
}
