//! DS18B20 digital thermometer on the Linux one-wire bus (`w1-gpio`).
//!
//! The kernel exposes each probe as `/sys/bus/w1/devices/28-*/w1_slave`,
//! a two-line text file:
//!
//! ```text
//! 72 01 4b 46 7f ff 0e 10 57 : crc=57 YES
//! 72 01 4b 46 7f ff 0e 10 57 t=23125
//! ```
//!
//! The first line ends in `YES` when the scratchpad CRC matched; the second
//! carries the temperature in millidegrees Celsius. A failed CRC is common
//! on long cable runs, so reads are retried under a [`RetryPolicy`]; when
//! every attempt fails the reading is absent rather than an error.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use super::ChannelReader;
use crate::error::{Error, Result};

pub const DEFAULT_BASE_DIR: &str = "/sys/bus/w1/devices";

/// Family code prefix of DS18B20 device directories.
const FAMILY_PREFIX: &str = "28-";
const SLAVE_FILE: &str = "w1_slave";
const CRC_PASS_MARKER: &str = "YES";
const TEMP_TOKEN: &str = "t=";

/// Reading `w1_slave` triggers a 12-bit conversion in the kernel driver.
pub const CONVERSION_TIME: Duration = Duration::from_millis(750);

/// Upper limits accepted by configuration validation.
pub const MAX_RETRIES: u32 = 10;
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Bounded retry schedule for CRC failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Re-reads after the first attempt.
    pub max_retries: u32,
    /// Pause before each re-read.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Longest a read may legitimately take: every attempt waits out a
    /// full conversion, with a pause between attempts.
    pub fn worst_case(&self) -> Duration {
        CONVERSION_TIME
            .saturating_mul(self.max_retries.saturating_add(1))
            .saturating_add(self.delay.saturating_mul(self.max_retries))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            delay: Duration::from_millis(200),
        }
    }
}

/// Extract the millidegree value from the data line.
pub fn parse_millidegrees(data_line: &str) -> Result<i32> {
    let Some(pos) = data_line.find(TEMP_TOKEN) else {
        return Err(Error::Parse("temperature token missing"));
    };
    data_line[pos + TEMP_TOKEN.len()..]
        .trim()
        .parse::<i32>()
        .map_err(|_| Error::Parse("temperature token is not an integer"))
}

/// Return the data line if the payload is complete and its CRC passed.
fn validated_data_line(payload: &str) -> Option<&str> {
    let mut lines = payload.lines();
    let status = lines.next()?;
    let data = lines.next()?;
    status.trim_end().ends_with(CRC_PASS_MARKER).then_some(data)
}

pub struct Ds18b20<D> {
    device_file: PathBuf,
    policy: RetryPolicy,
    delay: D,
}

impl<D: DelayNs> Ds18b20<D> {
    /// Locate the first `28-*` device under `base_dir`.
    pub fn discover(base_dir: &Path, policy: RetryPolicy, delay: D) -> Result<Self> {
        let entries = fs::read_dir(base_dir)
            .map_err(|_| Error::DeviceNotFound("one-wire bus directory missing"))?;

        let mut devices: Vec<PathBuf> = entries
            .filter_map(core::result::Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(FAMILY_PREFIX))
            .map(|e| e.path())
            .collect();
        devices.sort();

        let Some(device_dir) = devices.first() else {
            return Err(Error::DeviceNotFound("no DS18B20 on the one-wire bus"));
        };
        if devices.len() > 1 {
            warn!(
                "{} DS18B20 probes found, using {}",
                devices.len(),
                device_dir.display()
            );
        }
        info!("DS18B20 at {}", device_dir.display());
        Ok(Self::with_device_file(
            device_dir.join(SLAVE_FILE),
            policy,
            delay,
        ))
    }

    pub fn with_device_file(device_file: PathBuf, policy: RetryPolicy, delay: D) -> Self {
        Self {
            device_file,
            policy,
            delay,
        }
    }

    pub fn device_file(&self) -> &Path {
        &self.device_file
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    fn read_payload(&self) -> Option<String> {
        match fs::read_to_string(&self.device_file) {
            Ok(text) => Some(text),
            Err(e) => {
                debug!("{}: {}", self.device_file.display(), e);
                None
            }
        }
    }

    /// Read until the CRC passes or the retry budget is spent.
    fn read_validated(&mut self) -> Option<String> {
        // Fits in u32 once clamped to MAX_RETRY_DELAY.
        let pause_ms = self.policy.delay.min(MAX_RETRY_DELAY).as_millis() as u32;
        let mut retries_left = self.policy.max_retries;
        loop {
            if let Some(line) = self
                .read_payload()
                .as_deref()
                .and_then(validated_data_line)
            {
                return Some(line.to_owned());
            }
            if retries_left == 0 {
                warn!(
                    "DS18B20 CRC did not pass after {} retries",
                    self.policy.max_retries
                );
                return None;
            }
            retries_left -= 1;
            self.delay.delay_ms(pause_ms);
        }
    }
}

impl<D: DelayNs + Send> ChannelReader for Ds18b20<D> {
    /// Millidegrees Celsius.
    fn read_raw(&mut self) -> Result<Option<i32>> {
        let Some(line) = self.read_validated() else {
            return Ok(None);
        };
        match parse_millidegrees(&line) {
            Ok(milli) => Ok(Some(milli)),
            Err(e) => {
                warn!("DS18B20 payload rejected: {}", e);
                Ok(None)
            }
        }
    }

    /// Degrees Celsius, uncalibrated.
    fn read_physical(&mut self) -> Result<Option<f64>> {
        Ok(self.read_raw()?.map(|milli| f64::from(milli) / 1000.0))
    }
}
