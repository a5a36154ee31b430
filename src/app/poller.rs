//! The sampling control loop.
//!
//! [`Poller`] owns no hardware. Each cycle it walks every
//! [`SensorKind`] through the injected [`SensorPort`], isolates failures
//! per channel, applies the temperature correction and the reporting
//! precision, and publishes one complete [`SensorSnapshot`] into the
//! [`StateStore`].
//!
//! ```text
//!  Idle ──▶ Sampling ──▶ Publishing ──▶ Idle ──(sleep period)──▶ ...
//! ```
//!
//! Faults never change the cadence: no backoff, no jitter.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::config::SystemConfig;
use crate::error::{DeviceError, Result};
use crate::sensors::calibration::CalibrationModel;
use crate::sensors::{SensorKind, round_to};
use crate::state::{SensorSnapshot, StateStore};

use super::events::PollEvent;
use super::ports::{EventSink, SensorPort};

/// Longest uninterrupted sleep, so a stop request is seen promptly.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    Idle,
    Sampling,
    Publishing,
}

pub struct Poller {
    store: Arc<StateStore>,
    period: Duration,
    /// Secondary correction applied to the one-wire reading.
    temperature_calibration: Option<CalibrationModel>,
    /// Reads slower than this are discarded; `None` disables the check.
    read_budget: Option<Duration>,
    phase: PollPhase,
    cycle: u64,
}

impl Poller {
    pub fn new(store: Arc<StateStore>, period: Duration) -> Self {
        Self {
            store,
            period,
            temperature_calibration: None,
            read_budget: None,
            phase: PollPhase::Idle,
            cycle: 0,
        }
    }

    /// Build from the system configuration and the `temp` registry entry.
    pub fn from_config(
        store: Arc<StateStore>,
        config: &SystemConfig,
        temperature_calibration: Option<CalibrationModel>,
    ) -> Self {
        let mut poller = Self::new(store, config.poll_interval());
        poller.temperature_calibration = temperature_calibration;
        poller.read_budget = config.read_budget();
        poller
    }

    #[must_use]
    pub fn with_temperature_calibration(mut self, model: CalibrationModel) -> Self {
        self.temperature_calibration = Some(model);
        self
    }

    #[must_use]
    pub fn with_read_budget(mut self, budget: Duration) -> Self {
        self.read_budget = Some(budget);
        self
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    /// Cycles completed so far.
    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    // ── One cycle ─────────────────────────────────────────────

    /// Sample every channel once and publish the result.
    pub fn poll_once(
        &mut self,
        sensors: &mut impl SensorPort,
        sink: &mut impl EventSink,
    ) -> Arc<SensorSnapshot> {
        self.phase = PollPhase::Sampling;
        self.cycle += 1;

        let mut snapshot = SensorSnapshot {
            cycle: self.cycle,
            ..SensorSnapshot::empty()
        };

        for kind in SensorKind::ALL {
            match self.sample(sensors, kind) {
                Ok(value) => snapshot.set_value(kind, value),
                Err(error) => {
                    warn!("cycle {}: {} read failed: {}", self.cycle, kind.name(), error);
                    snapshot.record_error(format_args!("{}: {}", kind.name(), error));
                    sink.emit(&PollEvent::ChannelFault {
                        sensor: kind,
                        error,
                    });
                }
            }
        }

        self.phase = PollPhase::Publishing;
        let published = self.store.publish(snapshot);
        sink.emit(&PollEvent::CycleCompleted(Arc::clone(&published)));

        self.phase = PollPhase::Idle;
        published
    }

    fn sample(&self, sensors: &mut impl SensorPort, kind: SensorKind) -> Result<Option<f64>> {
        let started = Instant::now();
        let value = sensors.read_channel(kind)?;

        if let Some(budget) = self.read_budget {
            let took = started.elapsed();
            if took > budget {
                debug!("{} took {:?}, budget {:?}", kind.name(), took, budget);
                return Err(DeviceError::BudgetExceeded.into());
            }
        }

        Ok(value.map(|v| {
            let v = match (kind, self.temperature_calibration) {
                (SensorKind::Temperature, Some(cal)) => cal.apply(v),
                _ => v,
            };
            round_to(v, kind.report_decimals())
        }))
    }

    // ── Loop ──────────────────────────────────────────────────

    /// Poll at a fixed period until `stop` is set.
    pub fn run(
        mut self,
        sensors: &mut impl SensorPort,
        sink: &mut impl EventSink,
        stop: &AtomicBool,
    ) {
        info!("poller started, period {:?}", self.period);
        sink.emit(&PollEvent::Started {
            period: self.period,
        });

        while !stop.load(Ordering::Acquire) {
            self.poll_once(sensors, sink);
            sleep_unless_stopped(self.period, stop);
        }

        info!("poller stopped after {} cycles", self.cycle);
        sink.emit(&PollEvent::Stopped { cycles: self.cycle });
    }

    /// Run the loop on a dedicated, named thread.
    pub fn spawn<S, K>(
        self,
        mut sensors: S,
        mut sink: K,
        stop: Arc<AtomicBool>,
    ) -> std::io::Result<JoinHandle<()>>
    where
        S: SensorPort + Send + 'static,
        K: EventSink + Send + 'static,
    {
        thread::Builder::new()
            .name("poller".into())
            .spawn(move || self.run(&mut sensors, &mut sink, &stop))
    }
}

fn sleep_unless_stopped(period: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + period;
    loop {
        if stop.load(Ordering::Acquire) {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::sleep((deadline - now).min(SLEEP_SLICE));
    }
}
