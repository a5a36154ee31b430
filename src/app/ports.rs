//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Poller / ControlApi (domain)
//! ```
//!
//! Driven adapters (sensor bank, relays, event sinks, config storage)
//! implement these traits. The domain consumes them via generics, so the
//! poller and the control API never touch hardware directly.

use crate::config::SystemConfig;
use crate::error::Result;
use crate::sensors::SensorKind;
use crate::state::Actuator;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the poller calls this once per channel per cycle.
pub trait SensorPort {
    /// Physical (calibrated) value of one channel; `Ok(None)` when absent.
    fn read_channel(&mut self, kind: SensorKind) -> Result<Option<f64>>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the on/off outputs.
///
/// Implementations are idempotent: switching an output to the state it
/// is already in is a no-op that still succeeds.
pub trait ActuatorPort {
    /// Drive `actuator` and return the state it ended up in.
    fn set(&mut self, actuator: Actuator, on: bool) -> Result<bool>;

    fn is_on(&self, actuator: Actuator) -> bool;

    /// Switch every output off for a safe shutdown.
    fn all_off(&mut self) -> Result<()>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The poller emits structured [`PollEvent`](super::events::PollEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::PollEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate before persisting; invalid values are
/// rejected with [`ConfigError::ValidationFailed`], not clamped.
pub trait ConfigPort {
    /// Load configuration, falling back to defaults when nothing is stored.
    fn load(&self) -> core::result::Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> core::result::Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config could not be deserialized.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}
