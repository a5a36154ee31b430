//! System configuration parameters
//!
//! Everything tunable about the monitor: converter wiring, relay pins,
//! one-wire retry policy and loop timing. Loaded from YAML by
//! [`YamlConfigFile`](crate::adapters::config_file::YamlConfigFile);
//! every field has a default so a partial file is valid.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::sensors::SensorKind;
use crate::sensors::analog::DEFAULT_ADDRESS;
use crate::sensors::calibration::{CalibrationModel, CalibrationRegistry};
use crate::sensors::onewire::{self, RetryPolicy};

/// PCF8591 wiring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdcConfig {
    /// I2C bus number (`/dev/i2c-<bus>`).
    pub bus: u8,
    /// 7-bit device address.
    pub address: u8,
    /// Reference voltage (V), full scale of the converter.
    pub vref: f64,
    /// Sensor name → analog input (0..=3). Unlisted sensors are not wired.
    pub channels: BTreeMap<String, u8>,
}

impl Default for AdcConfig {
    fn default() -> Self {
        Self {
            bus: 1,
            address: DEFAULT_ADDRESS,
            vref: 3.3,
            channels: BTreeMap::from([
                ("ph".to_owned(), 0),
                ("turbidity".to_owned(), 1),
                ("tds".to_owned(), 2),
            ]),
        }
    }
}

/// Relay outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpioConfig {
    /// GPIO character device.
    pub chip: PathBuf,
    pub pump_pin: u32,
    pub valve_pin: u32,
    /// Most opto-isolated relay boards switch on a LOW input.
    pub relay_active_high: bool,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            chip: PathBuf::from("/dev/gpiochip0"),
            pump_pin: 17,
            valve_pin: 27,
            relay_active_high: false,
        }
    }
}

/// DS18B20 discovery and retry schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OneWireConfig {
    pub base_dir: PathBuf,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for OneWireConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            base_dir: PathBuf::from(onewire::DEFAULT_BASE_DIR),
            max_retries: policy.max_retries,
            retry_delay_ms: policy.delay.as_millis() as u64,
        }
    }
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub adc: AdcConfig,
    pub gpio: GpioConfig,
    pub onewire: OneWireConfig,

    // --- Timing ---
    /// Poll cycle period (milliseconds)
    pub poll_interval_ms: u64,
    /// Per-channel read budget (milliseconds, 0 = unbounded)
    pub read_budget_ms: u64,

    // --- Calibration ---
    /// Calibration registry file
    pub calibration_path: PathBuf,
    /// Inline entries used where the registry file has none
    pub calibration: BTreeMap<String, serde_yaml::Value>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            adc: AdcConfig::default(),
            gpio: GpioConfig::default(),
            onewire: OneWireConfig::default(),

            poll_interval_ms: 2000,
            // 6 conversions of 750 ms plus 5 pauses of 200 ms.
            read_budget_ms: 5500,

            calibration_path: PathBuf::from("config/calibration.yaml"),
            calibration: BTreeMap::new(),
        }
    }
}

impl SystemConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Effective per-channel budget, never shorter than a full one-wire
    /// retry run so a read the retry policy allows is not discarded.
    pub fn read_budget(&self) -> Option<Duration> {
        (self.read_budget_ms > 0).then(|| {
            Duration::from_millis(self.read_budget_ms).max(self.retry_policy().worst_case())
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.onewire.max_retries,
            delay: Duration::from_millis(self.onewire.retry_delay_ms),
        }
    }

    pub fn i2c_device(&self) -> PathBuf {
        PathBuf::from(format!("/dev/i2c-{}", self.adc.bus))
    }

    /// Analog input wired to `kind`, if any.
    pub fn channel_for(&self, kind: SensorKind) -> Option<u8> {
        self.adc.channels.get(kind.name()).copied()
    }

    /// Inline `calibration:` entries as a registry.
    pub fn inline_calibration(&self) -> CalibrationRegistry {
        let mut registry = CalibrationRegistry::new();
        for (name, node) in &self.calibration {
            registry.insert(name, CalibrationModel::from_yaml(node));
        }
        registry
    }

    /// Reject values that would make the monitor misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.adc.vref.is_finite() || self.adc.vref <= 0.0 {
            return Err(ConfigError::ValidationFailed("adc.vref must be a positive voltage"));
        }
        if self.adc.address > 0x7f {
            return Err(ConfigError::ValidationFailed("adc.address must be a 7-bit address"));
        }
        for (name, &channel) in &self.adc.channels {
            if channel > 3 {
                return Err(ConfigError::ValidationFailed("adc.channels entries must be 0..=3"));
            }
            if SensorKind::from_name(name).is_none_or(|k| k == SensorKind::Temperature) {
                return Err(ConfigError::ValidationFailed(
                    "adc.channels keys must be ph, tds or turbidity",
                ));
            }
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("poll_interval_ms must be > 0"));
        }
        if self.onewire.max_retries > onewire::MAX_RETRIES {
            return Err(ConfigError::ValidationFailed("onewire.max_retries must be <= 10"));
        }
        if Duration::from_millis(self.onewire.retry_delay_ms) > onewire::MAX_RETRY_DELAY {
            return Err(ConfigError::ValidationFailed(
                "onewire.retry_delay_ms must be <= 60000",
            ));
        }
        if self.gpio.pump_pin == self.gpio.valve_pin {
            return Err(ConfigError::ValidationFailed("pump and valve need distinct pins"));
        }
        Ok(())
    }
}
