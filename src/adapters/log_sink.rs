//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing one structured line per poller
//! event through the `log` facade (stderr via `env_logger` in the
//! binary). A network publisher would implement the same trait.

use log::{info, warn};

use crate::app::events::PollEvent;
use crate::app::ports::EventSink;
use crate::state::SensorSnapshot;

/// Adapter that logs every [`PollEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

fn fmt_value(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_owned(), |v| v.to_string())
}

pub(crate) fn snapshot_line(s: &SensorSnapshot) -> String {
    format!(
        "SNAP | #{} | pH={} tds={} turb={} T={}\u{00b0}C | err={}",
        s.cycle,
        fmt_value(s.ph),
        fmt_value(s.tds),
        fmt_value(s.turbidity),
        fmt_value(s.temperature),
        s.last_error().unwrap_or("none"),
    )
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &PollEvent) {
        match event {
            PollEvent::Started { period } => {
                info!("START | period={:?}", period);
            }
            PollEvent::ChannelFault { sensor, error } => {
                warn!("FAULT | {} | {}", sensor.name(), error);
            }
            PollEvent::CycleCompleted(snapshot) => {
                info!("{}", snapshot_line(snapshot));
            }
            PollEvent::Stopped { cycles } => {
                info!("STOP  | cycles={}", cycles);
            }
        }
    }
}
