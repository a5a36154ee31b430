//! Hardware adapter: bridges real peripherals to the domain port traits.
//!
//! [`RelayActuators`] owns the two relay outputs behind [`ActuatorPort`];
//! [`build_sensor_bank`] wires the converter inputs and the thermometer
//! into a [`SensorBank`] for the [`SensorPort`](crate::app::ports::SensorPort)
//! side. Both are generic over the `embedded-hal` traits so the same code
//! runs against Linux peripherals and test doubles.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::I2c;
use log::{info, warn};

use crate::app::ports::ActuatorPort;
use crate::config::SystemConfig;
use crate::drivers::relay::Relay;
use crate::error::Result;
use crate::sensors::analog::{self, AnalogChannel, Pcf8591};
use crate::sensors::calibration::CalibrationRegistry;
use crate::sensors::onewire::Ds18b20;
use crate::sensors::{NoSensor, SensorBank, SensorKind};
use crate::state::Actuator;

// ── ActuatorPort implementation ───────────────────────────────

/// Pump and valve relays.
pub struct RelayActuators<P> {
    pump: Relay<P>,
    valve: Relay<P>,
}

impl<P: OutputPin> RelayActuators<P> {
    pub fn new(pump: Relay<P>, valve: Relay<P>) -> Self {
        Self { pump, valve }
    }

    /// Wrap raw pins; both relays start OFF.
    pub fn from_pins(pump: P, valve: P, active_high: bool) -> Result<Self> {
        Ok(Self::new(
            Relay::new(pump, active_high)?,
            Relay::new(valve, active_high)?,
        ))
    }

    fn relay(&mut self, actuator: Actuator) -> &mut Relay<P> {
        match actuator {
            Actuator::Pump => &mut self.pump,
            Actuator::Valve => &mut self.valve,
        }
    }
}

impl<P: OutputPin> ActuatorPort for RelayActuators<P> {
    fn set(&mut self, actuator: Actuator, on: bool) -> Result<bool> {
        let relay = self.relay(actuator);
        relay.set(on)?;
        Ok(relay.is_on())
    }

    fn is_on(&self, actuator: Actuator) -> bool {
        match actuator {
            Actuator::Pump => self.pump.is_on(),
            Actuator::Valve => self.valve.is_on(),
        }
    }

    /// Attempts both outputs even when the first one fails.
    fn all_off(&mut self) -> Result<()> {
        let pump = self.pump.off();
        let valve = self.valve.off();
        pump.and(valve)
    }
}

// ── SensorPort wiring ─────────────────────────────────────────

/// Assemble the sensor bank from whatever hardware came up.
///
/// `adc` is `None` when the converter could not be opened; its channels
/// then read as absent. A failed thermometer discovery likewise leaves a
/// [`NoSensor`] stub in the temperature slot. Analog channels get their
/// registry calibration; the temperature correction is applied by the
/// poller instead.
pub fn build_sensor_bank<I2C, D>(
    adc: Option<Pcf8591<I2C>>,
    thermometer: Result<Ds18b20<D>>,
    config: &SystemConfig,
    registry: &CalibrationRegistry,
) -> SensorBank
where
    I2C: I2c + Send + 'static,
    D: DelayNs + Send + 'static,
{
    let mut bank = SensorBank::new();

    match adc {
        Some(adc) => {
            let shared = analog::shared(adc);
            for kind in [SensorKind::Ph, SensorKind::Tds, SensorKind::Turbidity] {
                let Some(channel) = config.channel_for(kind) else {
                    continue;
                };
                let calibration = registry.get(kind.name());
                match AnalogChannel::new(shared.clone(), channel, calibration) {
                    Ok(reader) => bank.set_reader(kind, Box::new(reader)),
                    Err(e) => {
                        warn!("{}: {}", kind.name(), e);
                        bank.set_reader(kind, Box::new(NoSensor));
                    }
                }
            }
        }
        None => {
            warn!("ADC unavailable, analog channels will read as absent");
            for kind in [SensorKind::Ph, SensorKind::Tds, SensorKind::Turbidity] {
                if config.channel_for(kind).is_some() {
                    bank.set_reader(kind, Box::new(NoSensor));
                }
            }
        }
    }

    match thermometer {
        Ok(sensor) => {
            info!("DS18B20 at {}", sensor.device_file().display());
            bank.set_reader(SensorKind::Temperature, Box::new(sensor));
        }
        Err(e) => {
            warn!("temperature sensor unavailable: {}", e);
            bank.set_reader(SensorKind::Temperature, Box::new(NoSensor));
        }
    }

    bank.log_layout();
    bank
}
