//! Boundary interface consumed by the external API layer.
//!
//! [`ControlApi`] is what an HTTP router, the service console or a test
//! talks to. Reads go straight to the [`StateStore`]; actuator commands go
//! to the [`ActuatorPort`] behind a mutex and are mirrored into the store
//! once the output has switched. Nothing here waits on the poller.
//!
//! Wire shapes:
//!
//! | call               | JSON                                          |
//! |--------------------|-----------------------------------------------|
//! | `sensors()`        | `{"ph":7.01,"tds":null,"turb":..,"temp":..,"error":null}` |
//! | `actuator_states()`| `{"pump":false,"valve":true}`                 |
//! | `set_pump(..)`     | `{"pump":true,"status":"success"}`            |

use std::sync::{Arc, Mutex, PoisonError};

use log::info;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::Result;
use crate::state::{Actuator, ActuatorState, SensorSnapshot, StateStore};

use super::commands::ActuatorRequest;
use super::ports::ActuatorPort;

/// Reporting view of a [`SensorSnapshot`].
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SensorReport {
    pub ph: Option<f64>,
    pub tds: Option<f64>,
    pub turb: Option<f64>,
    pub temp: Option<f64>,
    pub error: Option<String>,
}

impl From<&SensorSnapshot> for SensorReport {
    fn from(s: &SensorSnapshot) -> Self {
        Self {
            ph: s.ph,
            tds: s.tds,
            turb: s.turbidity,
            temp: s.temperature,
            error: s.last_error().map(str::to_owned),
        }
    }
}

/// Result of an actuator command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandReply {
    pub actuator: Actuator,
    pub on: bool,
}

impl Serialize for CommandReply {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(self.actuator.name(), &self.on)?;
        map.serialize_entry("status", "success")?;
        map.end()
    }
}

pub struct ControlApi<A> {
    store: Arc<StateStore>,
    actuators: Mutex<A>,
}

impl<A: ActuatorPort> ControlApi<A> {
    /// Wrap the actuators and seed the store with their current states.
    pub fn new(store: Arc<StateStore>, actuators: A) -> Self {
        for actuator in [Actuator::Pump, Actuator::Valve] {
            store.record_actuator(actuator, actuators.is_on(actuator));
        }
        Self {
            store,
            actuators: Mutex::new(actuators),
        }
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// Latest published readings.
    pub fn sensors(&self) -> SensorReport {
        SensorReport::from(self.store.current().as_ref())
    }

    pub fn actuator_states(&self) -> ActuatorState {
        self.store.actuators()
    }

    pub fn set_pump(&self, request: &ActuatorRequest) -> Result<CommandReply> {
        self.set(Actuator::Pump, request)
    }

    pub fn set_valve(&self, request: &ActuatorRequest) -> Result<CommandReply> {
        self.set(Actuator::Valve, request)
    }

    pub fn set(&self, actuator: Actuator, request: &ActuatorRequest) -> Result<CommandReply> {
        let on = request.require_on()?;
        let reached = {
            let mut port = self.actuators.lock().unwrap_or_else(PoisonError::into_inner);
            let reached = port.set(actuator, on)?;
            // Recorded under the lock so the store follows the pin's order.
            self.store.record_actuator(actuator, reached);
            reached
        };
        info!("ACT | {} -> {}", actuator.name(), if reached { "on" } else { "off" });
        Ok(CommandReply {
            actuator,
            on: reached,
        })
    }

    /// Switch everything off, e.g. before exiting.
    pub fn shutdown(&self) -> Result<()> {
        let mut port = self.actuators.lock().unwrap_or_else(PoisonError::into_inner);
        port.all_off()?;
        for actuator in [Actuator::Pump, Actuator::Valve] {
            self.store.record_actuator(actuator, port.is_on(actuator));
        }
        info!("ACT | all off");
        Ok(())
    }
}
