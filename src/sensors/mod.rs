//! Sensor subsystem: channel readers and the aggregating [`SensorBank`].
//!
//! Every physical measurement source sits behind the [`ChannelReader`]
//! capability. The bank owns one reader per [`SensorKind`] and is handed
//! to the poller, which reads each channel independently every cycle.
//!
//! Readers report absence as `Ok(None)`: a sensor that is missing or whose
//! payload never validated is an expected outcome, not a fault.

pub mod analog;
pub mod calibration;
pub mod onewire;

use log::info;

use crate::app::ports::SensorPort;
use crate::error::Result;

/// The four channels the monitor samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SensorKind {
    Ph,
    Tds,
    Turbidity,
    Temperature,
}

impl SensorKind {
    /// Sampling order within one poll cycle.
    pub const ALL: [Self; 4] = [Self::Ph, Self::Tds, Self::Turbidity, Self::Temperature];

    /// Name used as calibration-registry and config key.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ph => "ph",
            Self::Tds => "tds",
            Self::Turbidity => "turbidity",
            Self::Temperature => "temp",
        }
    }

    /// Decimal places kept when a value is reported.
    pub const fn report_decimals(self) -> i32 {
        match self {
            Self::Ph => 3,
            Self::Tds | Self::Turbidity | Self::Temperature => 2,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

/// Uniform contract over a single measurement source.
pub trait ChannelReader: Send {
    /// Device-native integer reading (ADC counts, millidegrees, ...).
    fn read_raw(&mut self) -> Result<Option<i32>>;

    /// Reading converted to physical units, calibrated where applicable.
    fn read_physical(&mut self) -> Result<Option<f64>>;
}

impl<R: ChannelReader + ?Sized> ChannelReader for Box<R> {
    fn read_raw(&mut self) -> Result<Option<i32>> {
        (**self).read_raw()
    }

    fn read_physical(&mut self) -> Result<Option<f64>> {
        (**self).read_physical()
    }
}

/// Stand-in for hardware that was not detected at startup.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSensor;

impl ChannelReader for NoSensor {
    fn read_raw(&mut self) -> Result<Option<i32>> {
        Ok(None)
    }

    fn read_physical(&mut self) -> Result<Option<f64>> {
        Ok(None)
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Owns one reader per configured channel.
///
/// Channels without a reader read as absent, matching a channel that is
/// simply not wired in the configuration.
#[derive(Default)]
pub struct SensorBank {
    readers: Vec<(SensorKind, Box<dyn ChannelReader>)>,
}

impl SensorBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install (or replace) the reader for `kind`.
    pub fn set_reader(&mut self, kind: SensorKind, reader: Box<dyn ChannelReader>) {
        self.readers.retain(|(k, _)| *k != kind);
        self.readers.push((kind, reader));
    }

    #[must_use]
    pub fn with_reader(mut self, kind: SensorKind, reader: impl ChannelReader + 'static) -> Self {
        self.set_reader(kind, Box::new(reader));
        self
    }

    pub fn has_reader(&self, kind: SensorKind) -> bool {
        self.readers.iter().any(|(k, _)| *k == kind)
    }

    /// Log which channels are wired.
    pub fn log_layout(&self) {
        for kind in SensorKind::ALL {
            info!(
                "channel {:<9} {}",
                kind.name(),
                if self.has_reader(kind) { "wired" } else { "not configured" }
            );
        }
    }
}

impl SensorPort for SensorBank {
    fn read_channel(&mut self, kind: SensorKind) -> Result<Option<f64>> {
        match self.readers.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, reader)) => reader.read_physical(),
            None => Ok(None),
        }
    }
}
