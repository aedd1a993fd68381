//! Message types for actor communication
//!
//! 1. **Commands**: sent to one actor via mpsc, optionally answered over oneshot
//! 2. **Events**: [`CycleReport`]s broadcast by the monitor to every subscriber

use std::time::Duration;

use tokio::sync::oneshot;

pub use crate::host::{AlertDecision, CycleReport, ServiceCheck};
use crate::storage::Event;

/// Commands that can be sent to a MonitorActor
#[derive(Debug)]
pub enum MonitorCommand {
    /// Run a cycle immediately, bypassing the interval timer
    ///
    /// The report is published like a regular one and also sent back.
    RunCycleNow {
        respond_to: oneshot::Sender<anyhow::Result<CycleReport>>,
    },

    /// Update the cycle interval
    ///
    /// Restarts the timer, so the next cycle runs right away.
    UpdateInterval { interval_secs: u64 },

    /// Gracefully shut down the monitor
    ///
    /// A cycle in progress finishes before the actor exits.
    Shutdown,
}

/// Commands that can be sent to the RecorderActor
#[derive(Debug)]
pub enum RecorderCommand {
    /// Persist an event that did not come out of a cycle (e.g. start/stop)
    RecordEvent {
        event: Event,
        respond_to: Option<oneshot::Sender<bool>>,
    },

    /// Gracefully shut down the recorder
    ///
    /// Reports still queued in the broadcast channel are drained first.
    Shutdown,
}

/// Commands that can be sent to the AlertActor
#[derive(Debug)]
pub enum AlertCommand {
    /// Suppress notifications, for maintenance windows
    ///
    /// `None` mutes until `Unmute`.
    Mute { duration: Option<Duration> },

    Unmute,

    /// Gracefully shut down the alert actor
    Shutdown,
}
