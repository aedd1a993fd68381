//! AlertActor - Delivers alert decisions from cycle reports
//!
//! The escalation level is already decided by the monitor; this actor only hands each
//! [`AlertDecision`](super::messages::AlertDecision) to a [`Notifier`], unless alerts are muted.
//!
//! ```text
//! Unmuted ──Mute{None}──→ Muted (until Unmute)
//!    │
//!    └─────Mute{Some(d)}──→ Muted until now + d, then Unmuted again
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::alerts::Notifier;

use super::messages::{AlertCommand, CycleReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MuteState {
    Unmuted,
    Until(Instant),
    Indefinitely,
}

impl MuteState {
    fn is_muted(&self, now: Instant) -> bool {
        match self {
            MuteState::Unmuted => false,
            MuteState::Until(deadline) => now < *deadline,
            MuteState::Indefinitely => true,
        }
    }
}

pub struct AlertActor {
    notifier: Arc<dyn Notifier>,

    command_rx: mpsc::Receiver<AlertCommand>,

    /// Report receiver (broadcast subscription)
    report_rx: broadcast::Receiver<CycleReport>,

    mute: MuteState,
}

impl AlertActor {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        command_rx: mpsc::Receiver<AlertCommand>,
        report_rx: broadcast::Receiver<CycleReport>,
    ) -> Self {
        Self {
            notifier,
            command_rx,
            report_rx,
            mute: MuteState::Unmuted,
        }
    }

    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting alert actor");

        loop {
            tokio::select! {
                biased;

                result = self.report_rx.recv() => {
                    match result {
                        Ok(report) => self.handle_report(report).await,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("alert actor lagged, skipped {skipped} reports");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!("report channel closed, shutting down");
                            break;
                        }
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        AlertCommand::Mute { duration: Some(duration) } => {
                            debug!("muting alerts for {}s", duration.as_secs());
                            self.mute = MuteState::Until(Instant::now() + duration);
                        }

                        AlertCommand::Mute { duration: None } => {
                            debug!("muting alerts until unmuted");
                            self.mute = MuteState::Indefinitely;
                        }

                        AlertCommand::Unmute => {
                            debug!("unmuting alerts");
                            self.mute = MuteState::Unmuted;
                        }

                        AlertCommand::Shutdown => {
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

        debug!("alert actor stopped");
    }

    async fn handle_report(&mut self, report: CycleReport) {
        if report.alerts.is_empty() {
            return;
        }

        if self.mute.is_muted(Instant::now()) {
            debug!("alerts muted, dropping {} alerts", report.alerts.len());
            return;
        }
        self.mute = MuteState::Unmuted;

        for alert in &report.alerts {
            info!(
                "[{}] {}: {}",
                alert.level.as_str().to_uppercase(),
                alert.subject,
                alert.message
            );
            self.notifier
                .notify(alert.level, &alert.subject, &alert.message)
                .await;
        }
    }
}

/// Handle for the AlertActor
#[derive(Clone)]
pub struct AlertHandle {
    sender: mpsc::Sender<AlertCommand>,
}

impl AlertHandle {
    pub fn spawn(notifier: Arc<dyn Notifier>, report_rx: broadcast::Receiver<CycleReport>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = AlertActor::new(notifier, cmd_rx, report_rx);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Mute alerts for `duration`, or until [`unmute`](Self::unmute) if `None`.
    pub async fn mute(&self, duration: Option<Duration>) {
        let _ = self.sender.send(AlertCommand::Mute { duration }).await;
    }

    pub async fn unmute(&self) {
        let _ = self.sender.send(AlertCommand::Unmute).await;
    }

    /// Shut the actor down and wait until it has stopped.
    pub async fn shutdown(&self) {
        let _ = self.sender.send(AlertCommand::Shutdown).await;
        self.sender.closed().await;
    }
}
