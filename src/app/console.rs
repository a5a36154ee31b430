//! Line-oriented service console over the control API.
//!
//! Each line is parsed into a [`ConsoleCommand`] and answered with a single
//! JSON line, the same shapes an HTTP layer would return.

use std::io::{BufRead, Write};

use log::warn;

use crate::error::Result;

use super::api::ControlApi;
use super::commands::{ActuatorRequest, ConsoleCommand};
use super::ports::ActuatorPort;

const HELP: &str = "commands: sensors | status | pump on|off | valve on|off | quit";

/// What the console loop should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Print(String),
    Quit,
}

pub fn execute<A: ActuatorPort>(api: &ControlApi<A>, command: ConsoleCommand) -> Result<Reply> {
    let line = match command {
        ConsoleCommand::Sensors => to_json(&api.sensors()),
        ConsoleCommand::Status => to_json(&api.actuator_states()),
        ConsoleCommand::Set(actuator, on) => {
            to_json(&api.set(actuator, &ActuatorRequest::turn(on))?)
        }
        ConsoleCommand::Help => HELP.to_owned(),
        ConsoleCommand::Quit => return Ok(Reply::Quit),
    };
    Ok(Reply::Print(line))
}

fn to_json(value: &impl serde::Serialize) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
}

/// Serve commands from `input` until EOF or `quit`.
pub fn serve<A: ActuatorPort>(
    api: &ControlApi<A>,
    input: impl BufRead,
    mut output: impl Write,
) -> std::io::Result<()> {
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let reply = ConsoleCommand::parse(&line).and_then(|cmd| execute(api, cmd));
        match reply {
            Ok(Reply::Print(text)) => writeln!(output, "{text}")?,
            Ok(Reply::Quit) => break,
            Err(e) => {
                warn!("console: {}", e);
                writeln!(output, "{}", to_json(&serde_json::json!({ "error": e.to_string() })))?;
            }
        }
    }
    Ok(())
}
