//! Outbound poller events.
//!
//! The [`Poller`](super::poller::Poller) emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other
//! side decide what to do with them.

use std::sync::Arc;
use std::time::Duration;

use crate::error::Error;
use crate::sensors::SensorKind;
use crate::state::SensorSnapshot;

#[derive(Debug, Clone)]
pub enum PollEvent {
    /// The poll loop is running with the given period.
    Started { period: Duration },

    /// One channel failed during a cycle; the others were still sampled.
    ChannelFault { sensor: SensorKind, error: Error },

    /// A cycle finished and its snapshot was published.
    CycleCompleted(Arc<SensorSnapshot>),

    /// The poll loop exited after `cycles` cycles.
    Stopped { cycles: u64 },
}
