//! MonitorActor - Drives the monitoring cycle of one host
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → HostMonitor::run_cycle → Publish CycleReport → [RecorderActor, AlertActor, ...]
//!     ↑
//!     └─── Commands (RunCycleNow, UpdateInterval, Shutdown)
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{Interval, MissedTickBehavior, interval};
use tracing::{debug, error, instrument, trace, warn};

use crate::host::HostMonitor;

use super::messages::{CycleReport, MonitorCommand};

/// Actor that owns a [`HostMonitor`] and runs its cycles
///
/// Cycles never overlap: a tick that arrives while a cycle is still running is delayed until
/// the cycle finishes.
pub struct MonitorActor {
    monitor: HostMonitor,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<MonitorCommand>,

    /// Broadcast sender for publishing reports
    report_tx: broadcast::Sender<CycleReport>,

    interval_duration: Duration,
}

fn new_ticker(period: Duration) -> Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

impl MonitorActor {
    pub fn new(
        monitor: HostMonitor,
        interval_duration: Duration,
        command_rx: mpsc::Receiver<MonitorCommand>,
        report_tx: broadcast::Sender<CycleReport>,
    ) -> Self {
        Self {
            monitor,
            command_rx,
            report_tx,
            interval_duration,
        }
    }

    /// Run the actor's main loop
    ///
    /// This runs until a Shutdown command is received or every handle is dropped.
    #[instrument(skip(self), fields(host = %self.monitor.host()))]
    pub async fn run(mut self) {
        debug!("starting monitor actor");

        let mut ticker = new_ticker(self.interval_duration);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        error!("monitoring cycle failed: {:#}", e);
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        MonitorCommand::RunCycleNow { respond_to } => {
                            debug!("received RunCycleNow command");
                            let result = self.run_cycle().await;
                            let _ = respond_to.send(result);
                        }

                        MonitorCommand::UpdateInterval { interval_secs } => {
                            if interval_secs == 0 {
                                warn!("ignoring interval of 0s");
                                continue;
                            }

                            debug!("updating interval to {interval_secs}s");
                            self.interval_duration = Duration::from_secs(interval_secs);
                            ticker = new_ticker(self.interval_duration);
                        }

                        MonitorCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }

                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        debug!("monitor actor stopped");
    }

    async fn run_cycle(&mut self) -> Result<CycleReport> {
        let report = self.monitor.run_cycle().await?;

        // no subscribers is fine
        match self.report_tx.send(report.clone()) {
            Ok(receivers) => trace!("published cycle report to {receivers} receivers"),
            Err(_) => trace!("no receivers for cycle report"),
        }

        Ok(report)
    }
}

/// Handle for controlling a MonitorActor
#[derive(Clone)]
pub struct MonitorHandle {
    sender: mpsc::Sender<MonitorCommand>,
    pub host: String,
}

impl MonitorHandle {
    /// Spawn a new monitor actor publishing to `report_tx`.
    pub fn spawn(
        monitor: HostMonitor,
        interval_duration: Duration,
        report_tx: broadcast::Sender<CycleReport>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let host = monitor.host().to_string();

        let actor = MonitorActor::new(monitor, interval_duration, cmd_rx, report_tx);
        tokio::spawn(actor.run());

        Self {
            sender: cmd_tx,
            host,
        }
    }

    /// Run a cycle right away and return its report.
    pub async fn run_cycle_now(&self) -> Result<CycleReport> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::RunCycleNow { respond_to: tx })
            .await
            .context("failed to send RunCycleNow command")?;

        rx.await.context("failed to receive response")?
    }

    pub async fn update_interval(&self, interval_secs: u64) -> Result<()> {
        self.sender
            .send(MonitorCommand::UpdateInterval { interval_secs })
            .await
            .context("failed to send UpdateInterval command")?;
        Ok(())
    }

    /// Shut the actor down and wait until it has stopped.
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(MonitorCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        self.sender.closed().await;
        Ok(())
    }
}
