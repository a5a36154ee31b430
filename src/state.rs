//! Shared state hand-off between the poller and its readers.
//!
//! [`StateStore`] is the single point of truth for the latest
//! [`SensorSnapshot`] and the confirmed actuator states. Exactly one
//! writer (the poller) publishes snapshots; any number of boundary
//! requests read them concurrently.
//!
//! Snapshots are immutable once published. `publish` swaps an `Arc`
//! under a write lock and `current` clones the `Arc` under a read lock,
//! so a reader sees either the previous complete snapshot or the new one,
//! never a mixture, and no lock is held while a reader inspects values.

use core::fmt::{self, Write as _};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;

use crate::sensors::SensorKind;

/// Upper bound on the rendered fault text carried by a snapshot.
pub const LAST_ERROR_CAPACITY: usize = 192;

pub type ErrorText = heapless::String<LAST_ERROR_CAPACITY>;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// One complete set of readings produced by a single poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SensorSnapshot {
    /// Poll cycle that produced this snapshot (0 = nothing sampled yet).
    pub cycle: u64,
    pub ph: Option<f64>,
    pub tds: Option<f64>,
    pub turbidity: Option<f64>,
    pub temperature: Option<f64>,
    /// Faults recorded during the cycle, `None` when it was clean.
    pub last_error: Option<ErrorText>,
}

impl SensorSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn value(&self, kind: SensorKind) -> Option<f64> {
        match kind {
            SensorKind::Ph => self.ph,
            SensorKind::Tds => self.tds,
            SensorKind::Turbidity => self.turbidity,
            SensorKind::Temperature => self.temperature,
        }
    }

    pub fn set_value(&mut self, kind: SensorKind, value: Option<f64>) {
        let slot = match kind {
            SensorKind::Ph => &mut self.ph,
            SensorKind::Tds => &mut self.tds,
            SensorKind::Turbidity => &mut self.turbidity,
            SensorKind::Temperature => &mut self.temperature,
        };
        *slot = value;
    }

    /// Append a fault, separating entries with `"; "`.
    ///
    /// The entry that reaches [`LAST_ERROR_CAPACITY`] is cut at a char
    /// boundary; once the text is full later faults are dropped.
    pub fn record_error(&mut self, fault: fmt::Arguments<'_>) {
        let text = self.last_error.get_or_insert_with(ErrorText::new);
        let separator = if text.is_empty() { "" } else { "; " };
        if LAST_ERROR_CAPACITY - text.len() <= separator.len() {
            return;
        }
        let before = text.len();
        let _ = text.push_str(separator);
        // Err only signals that the entry was clipped.
        let _ = Clipped(text).write_fmt(fault);
        if text.len() == before + separator.len() {
            text.truncate(before);
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

/// Writes char by char and stops at the first one that does not fit.
struct Clipped<'a>(&'a mut ErrorText);

impl fmt::Write for Clipped<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            self.0.push(c).map_err(|()| fmt::Error)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Actuators
// ---------------------------------------------------------------------------

/// The two relay-driven outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Actuator {
    Pump,
    Valve,
}

impl Actuator {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pump => "pump",
            Self::Valve => "valve",
        }
    }
}

/// Last confirmed on/off state of every actuator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActuatorState {
    pub pump: bool,
    pub valve: bool,
}

impl ActuatorState {
    pub fn get(&self, actuator: Actuator) -> bool {
        match actuator {
            Actuator::Pump => self.pump,
            Actuator::Valve => self.valve,
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub struct StateStore {
    snapshot: RwLock<Arc<SensorSnapshot>>,
    pump_on: AtomicBool,
    valve_on: AtomicBool,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    /// Empty snapshot, every actuator off.
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(SensorSnapshot::empty())),
            pump_on: AtomicBool::new(false),
            valve_on: AtomicBool::new(false),
        }
    }

    /// Atomically replace the current snapshot and return the shared copy.
    pub fn publish(&self, snapshot: SensorSnapshot) -> Arc<SensorSnapshot> {
        let next = Arc::new(snapshot);
        let mut slot = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Arc::clone(&next);
        next
    }

    /// The latest complete snapshot.
    pub fn current(&self) -> Arc<SensorSnapshot> {
        let slot = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&slot)
    }

    /// Mirror a state the actuator has already reached.
    pub fn record_actuator(&self, actuator: Actuator, on: bool) {
        let flag = match actuator {
            Actuator::Pump => &self.pump_on,
            Actuator::Valve => &self.valve_on,
        };
        flag.store(on, Ordering::Release);
    }

    pub fn actuators(&self) -> ActuatorState {
        ActuatorState {
            pump: self.pump_on.load(Ordering::Acquire),
            valve: self.valve_on.load(Ordering::Acquire),
        }
    }
}
