//! Application core: sampling loop and boundary interface, zero I/O.
//!
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod api;
pub mod commands;
pub mod console;
pub mod events;
pub mod poller;
pub mod ports;
