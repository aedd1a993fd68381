//! RecorderActor - Persists cycle reports through a [`Recorder`]
//!
//! Every report turns into:
//!
//! - one metric row
//! - one trend row per classified metric
//! - `anomaly`, `remediation`, `monitoring` and `alert` events
//!
//! Storage errors are logged per row and never stop the pipeline.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{Value, json};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, instrument, trace, warn};

use crate::remediation::RemediationAction;
use crate::storage::{Event, EventKind, Recorder, StorageError, StorageResult};

use super::messages::{CycleReport, RecorderCommand};

pub struct RecorderActor {
    recorder: Arc<dyn Recorder>,

    command_rx: mpsc::Receiver<RecorderCommand>,

    /// Report receiver (broadcast subscription)
    report_rx: broadcast::Receiver<CycleReport>,

    /// Cleared once the report channel closes; commands are still served
    reports_open: bool,
}

impl RecorderActor {
    pub fn new(
        recorder: Arc<dyn Recorder>,
        command_rx: mpsc::Receiver<RecorderCommand>,
        report_rx: broadcast::Receiver<CycleReport>,
    ) -> Self {
        Self {
            recorder,
            command_rx,
            report_rx,
            reports_open: true,
        }
    }

    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting recorder actor");

        loop {
            tokio::select! {
                // reports first, so a Shutdown never overtakes queued reports
                biased;

                result = self.report_rx.recv(), if self.reports_open => {
                    match result {
                        Ok(report) => self.record_report(&report).await,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("recorder lagged, skipped {skipped} reports");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!("report channel closed");
                            self.reports_open = false;
                        }
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        RecorderCommand::RecordEvent { event, respond_to } => {
                            let ok = match self.recorder.record_event(event).await {
                                Ok(()) => true,
                                Err(e) => {
                                    error!("failed to record event: {e}");
                                    false
                                }
                            };

                            if let Some(tx) = respond_to {
                                let _ = tx.send(ok);
                            }
                        }

                        RecorderCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }

                else => {
                    warn!("all channels closed, shutting down");
                    break;
                }
            }
        }

        debug!("recorder actor stopped");
    }

    /// Every row is written on its own; a failed write is logged and the rest still go through.
    async fn record_report(&self, report: &CycleReport) {
        let recorder = self.recorder.as_ref();
        let mut failed = 0usize;

        if let Err(e) = recorder.record_metric(&report.sample).await {
            error!("failed to record metrics: {e}");
            failed += 1;
        }

        for (metric, verdict) in &report.analysis.trends {
            if let Err(e) = recorder
                .record_trend(*metric, metric.read(&report.sample), *verdict)
                .await
            {
                error!("failed to record {metric} trend: {e}");
                failed += 1;
            }
        }

        for event in report_events(report) {
            let result = match event {
                Ok(event) => recorder.record_event(event).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                error!("failed to record event: {e}");
                failed += 1;
            }
        }

        if failed > 0 {
            warn!("{failed} writes failed for report from {}", report.host);
        }
        trace!(
            "recorded report for {} ({} trends)",
            report.host,
            report.analysis.trends.len()
        );
    }
}

/// Events for one report, in anomaly, remediation, monitoring, alert order
fn report_events(report: &CycleReport) -> Vec<StorageResult<Event>> {
    let mut events = Vec::new();

    for anomaly in &report.analysis.anomalies {
        events.push(serde_json::to_value(anomaly).map_err(StorageError::from).map(|metadata| {
            Event::new(
                EventKind::Anomaly,
                format!(
                    "{} anomaly detected: {} increase",
                    anomaly.metric,
                    anomaly.increase_display()
                ),
                metadata,
            )
        }));
    }

    for action in &report.remediation.actions {
        events.push(remediation_metadata(action).map(|metadata| {
            Event::new(EventKind::Remediation, action.to_string(), metadata)
        }));
    }

    for check in &report.services {
        let message = match (check.healthy, check.restarted) {
            (true, _) => format!("{} is healthy", check.name),
            (false, Some(true)) => format!("{} was down and has been restarted", check.name),
            (false, _) => format!("{} is down and could not be restarted", check.name),
        };
        events.push(
            serde_json::to_value(check)
                .map_err(StorageError::from)
                .map(|metadata| Event::new(EventKind::Monitoring, message, metadata)),
        );
    }

    for alert in &report.alerts {
        events.push(Ok(Event::new(
            EventKind::Alert,
            format!("{}: {}", alert.subject, alert.message),
            json!({ "issue": alert.issue, "level": alert.level }),
        )));
    }

    events
}

/// The tagged action (killed pids, top processes, errors) plus its issue and outcome
fn remediation_metadata(action: &RemediationAction) -> StorageResult<Value> {
    let mut metadata = serde_json::to_value(action)?;
    if let Some(fields) = metadata.as_object_mut() {
        fields.insert("issue".into(), action.issue().into());
        fields.insert("failed".into(), action.is_failure().into());
    }
    Ok(metadata)
}

/// Handle for the RecorderActor
#[derive(Clone)]
pub struct RecorderHandle {
    sender: mpsc::Sender<RecorderCommand>,
}

impl RecorderHandle {
    pub fn spawn(recorder: Arc<dyn Recorder>, report_rx: broadcast::Receiver<CycleReport>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = RecorderActor::new(recorder, cmd_rx, report_rx);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Queue an event without waiting for it to be written.
    pub async fn record_event(&self, event: Event) -> Result<()> {
        self.sender
            .send(RecorderCommand::RecordEvent {
                event,
                respond_to: None,
            })
            .await
            .context("failed to send RecordEvent command")
    }

    /// Record an event and wait until it is written. Returns whether writing succeeded.
    pub async fn record_event_sync(&self, event: Event) -> Result<bool> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RecorderCommand::RecordEvent {
                event,
                respond_to: Some(tx),
            })
            .await
            .context("failed to send RecordEvent command")?;

        rx.await.context("failed to receive response")
    }

    pub async fn record_system(&self, message: &str) -> Result<bool> {
        self.record_event_sync(Event::new(EventKind::System, message, serde_json::Value::Null))
            .await
    }

    /// Shut the actor down and wait until it has stopped.
    pub async fn shutdown(&self) {
        let _ = self.sender.send(RecorderCommand::Shutdown).await;
        self.sender.closed().await;
    }
}
