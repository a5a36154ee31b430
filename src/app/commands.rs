//! Inbound commands to the control API.
//!
//! These represent actions requested by the outside world: JSON actuator
//! requests from an HTTP layer, or lines typed on the service console.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::state::Actuator;

/// Body of a "set pump" / "set valve" request: `{"on": true}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ActuatorRequest {
    pub on: Option<bool>,
}

impl ActuatorRequest {
    pub const fn turn(on: bool) -> Self {
        Self { on: Some(on) }
    }

    /// Parse a JSON request body. Malformed JSON or a non-boolean `on`
    /// is rejected; a missing `on` is caught later by [`Self::require_on`].
    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| {
            log::debug!("actuator request rejected: {}", e);
            Error::InvalidInput("malformed actuator request")
        })
    }

    pub fn require_on(&self) -> Result<bool> {
        self.on
            .ok_or(Error::InvalidInput("'on' field is missing"))
    }
}

/// One line of the service console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Print the latest sensor report.
    Sensors,
    /// Print actuator states.
    Status,
    /// Switch an actuator.
    Set(Actuator, bool),
    Help,
    Quit,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace().map(str::to_ascii_lowercase);
        let cmd = words.next().ok_or(Error::InvalidInput("empty command"))?;
        let arg = words.next();

        let actuator = match cmd.as_str() {
            "sensors" => return Ok(Self::Sensors),
            "status" | "state" => return Ok(Self::Status),
            "help" | "?" => return Ok(Self::Help),
            "quit" | "exit" => return Ok(Self::Quit),
            "pump" => Actuator::Pump,
            "valve" => Actuator::Valve,
            _ => return Err(Error::InvalidInput("unknown command")),
        };

        match arg.as_deref() {
            Some("on" | "open" | "1") => Ok(Self::Set(actuator, true)),
            Some("off" | "close" | "0") => Ok(Self::Set(actuator, false)),
            _ => Err(Error::InvalidInput("expected 'on' or 'off'")),
        }
    }
}
