//! Mock hardware for integration tests.
//!
//! Every mock keeps its observable state behind an `Arc` so tests can
//! inspect it after the mock has been moved into a driver or thread.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use bluewater::app::events::PollEvent;
use bluewater::app::ports::EventSink;
use bluewater::error::Result;
use bluewater::sensors::ChannelReader;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, OutputPin};
use embedded_hal::i2c::{self, I2c, Operation};

// ── PCF8591 bus ───────────────────────────────────────────────

/// Answers PCF8591 conversions from a per-input level table.
#[derive(Clone, Default)]
pub struct MockAdcBus {
    pub levels: Arc<Mutex<[u8; 4]>>,
    pub failing: Arc<Mutex<bool>>,
    selected: usize,
}

#[allow(dead_code)]
impl MockAdcBus {
    pub fn with_levels(levels: [u8; 4]) -> Self {
        Self {
            levels: Arc::new(Mutex::new(levels)),
            ..Default::default()
        }
    }

    pub fn set_level(&self, channel: usize, raw: u8) {
        self.levels.lock().unwrap()[channel] = raw;
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }
}

impl i2c::ErrorType for MockAdcBus {
    type Error = i2c::ErrorKind;
}

impl I2c for MockAdcBus {
    fn transaction(
        &mut self,
        _address: u8,
        operations: &mut [Operation<'_>],
    ) -> core::result::Result<(), Self::Error> {
        if *self.failing.lock().unwrap() {
            return Err(i2c::ErrorKind::NoAcknowledge(
                i2c::NoAcknowledgeSource::Address,
            ));
        }
        for op in operations {
            match op {
                Operation::Write(bytes) => {
                    if let Some(control) = bytes.first() {
                        self.selected = usize::from(control & 0x03);
                    }
                }
                Operation::Read(buf) => {
                    let level = self.levels.lock().unwrap()[self.selected];
                    buf.fill(level);
                }
            }
        }
        Ok(())
    }
}

// ── Relay pins ────────────────────────────────────────────────

/// Output pin that records every level written to it.
#[derive(Clone, Default)]
pub struct MockPin {
    pub levels: Arc<Mutex<Vec<bool>>>,
}

#[allow(dead_code)]
impl MockPin {
    pub fn last_level(&self) -> Option<bool> {
        self.levels.lock().unwrap().last().copied()
    }

    pub fn writes(&self) -> usize {
        self.levels.lock().unwrap().len()
    }
}

impl digital::ErrorType for MockPin {
    type Error = core::convert::Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> core::result::Result<(), Self::Error> {
        self.levels.lock().unwrap().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> core::result::Result<(), Self::Error> {
        self.levels.lock().unwrap().push(true);
        Ok(())
    }
}

// ── Delay ─────────────────────────────────────────────────────

/// Counts pauses instead of sleeping.
#[derive(Clone, Default)]
pub struct CountingDelay {
    pub pauses: Arc<Mutex<u32>>,
}

impl DelayNs for CountingDelay {
    fn delay_ns(&mut self, _ns: u32) {
        *self.pauses.lock().unwrap() += 1;
    }

    fn delay_ms(&mut self, _ms: u32) {
        *self.pauses.lock().unwrap() += 1;
    }
}

// ── Scripted channel ──────────────────────────────────────────

/// Channel reader that replays a script, then repeats `fallback`.
pub struct ScriptedReader {
    script: VecDeque<Result<Option<f64>>>,
    fallback: Result<Option<f64>>,
}

#[allow(dead_code)]
impl ScriptedReader {
    pub fn always(value: Result<Option<f64>>) -> Self {
        Self {
            script: VecDeque::new(),
            fallback: value,
        }
    }

    pub fn then(mut self, value: Result<Option<f64>>) -> Self {
        self.script.push_back(value);
        self
    }
}

impl ChannelReader for ScriptedReader {
    fn read_raw(&mut self) -> Result<Option<i32>> {
        Ok(self.read_physical()?.map(|v| v as i32))
    }

    fn read_physical(&mut self) -> Result<Option<f64>> {
        self.script.pop_front().unwrap_or(self.fallback)
    }
}

// ── Event sink ────────────────────────────────────────────────

/// Keeps every event for later assertions.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub events: Arc<Mutex<Vec<PollEvent>>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn faults(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                PollEvent::ChannelFault { sensor, .. } => Some(sensor.name().to_owned()),
                _ => None,
            })
            .collect()
    }

    pub fn completed_cycles(&self) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, PollEvent::CycleCompleted(_)))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &PollEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ── One-wire sysfs fixture ────────────────────────────────────

/// Lay out `<base>/<id>/w1_slave` with `payload`.
#[allow(dead_code)]
pub fn write_w1_slave(base: &Path, id: &str, payload: &str) {
    let dir = base.join(id);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("w1_slave"), payload).unwrap();
}

#[allow(dead_code)]
pub fn w1_payload(crc_ok: bool, millidegrees: i32) -> String {
    format!(
        "72 01 4b 46 7f ff 0e 10 57 : crc=57 {}\n72 01 4b 46 7f ff 0e 10 57 t={}\n",
        if crc_ok { "YES" } else { "NO" },
        millidegrees
    )
}
