//! Integration tests for the full actor pipeline
//!
//! Monitor → [Recorder, Alert], driven through the handles the agent binary uses.

use std::sync::Arc;
use std::time::Duration;

use host_sentinel::{
    actors::{alert::AlertHandle, monitor::MonitorHandle, recorder::RecorderHandle},
    alerts::AlertManager,
    config::{Alert, Config, LoggingConfig, Webhook},
    escalation::AlertLevel,
    monitors::{baseline::Metric, trend::TrendVerdict},
    storage::{EventKind, file::FileRecorder, memory::MemoryRecorder},
};
use pretty_assertions::assert_eq;
use tokio::sync::broadcast;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

const NEVER: Duration = Duration::from_secs(3600);

#[tokio::test]
async fn test_cycle_reports_reach_recorder_and_notifier() {
    let fakes = Fakes::new([
        sample(20.0, 40.0, 50.0),
        sample(22.0, 40.0, 50.0),
        sample(95.0, 40.0, 50.0),
    ]);
    let memory = Arc::new(MemoryRecorder::new());
    let notifier = Arc::new(RecordingNotifier::default());

    let (report_tx, mut report_rx) = broadcast::channel(64);
    let recorder = RecorderHandle::spawn(memory.clone(), report_tx.subscribe());
    let alerts = AlertHandle::spawn(notifier.clone(), report_tx.subscribe());
    let monitor = MonitorHandle::spawn(fakes.monitor(&Config::default()), NEVER, report_tx);

    // first tick runs immediately, the rest on demand
    monitor.run_cycle_now().await.unwrap();
    monitor.run_cycle_now().await.unwrap();
    for _ in 0..3 {
        report_rx.recv().await.unwrap();
    }

    monitor.shutdown().await.unwrap();
    alerts.shutdown().await;
    recorder.shutdown().await;

    assert_eq!(memory.metrics().await.len(), 3);

    let sent = notifier.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, AlertLevel::High);
    assert_eq!(sent[0].1, "Critical CPU Usage");
    assert_eq!(sent[0].2, "CPU at 95.0%");

    let events = memory.events().await;
    let anomalies: Vec<_> = events
        .iter()
        .filter(|e| e.kind == EventKind::Anomaly)
        .collect();
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].metadata["metric"], "cpu");

    // trends need a baseline, so the first cycle has none
    let trends = memory.trends().await;
    assert_eq!(trends.len(), 6);
    assert!(
        trends
            .iter()
            .any(|t| t.metric == Metric::Cpu && t.trend == TrendVerdict::Increasing)
    );
}

#[tokio::test]
async fn test_escalation_sequence_through_pipeline() {
    let fakes = Fakes::new((0..5).map(|_| sample(95.0, 10.0, 10.0)));
    let notifier = Arc::new(RecordingNotifier::default());

    let (report_tx, mut report_rx) = broadcast::channel(64);
    let alerts = AlertHandle::spawn(notifier.clone(), report_tx.subscribe());
    let monitor = MonitorHandle::spawn(fakes.monitor(&Config::default()), NEVER, report_tx);

    for _ in 0..4 {
        monitor.run_cycle_now().await.unwrap();
    }
    for _ in 0..5 {
        report_rx.recv().await.unwrap();
    }

    monitor.shutdown().await.unwrap();
    alerts.shutdown().await;

    assert_eq!(
        notifier.levels().await,
        vec![
            AlertLevel::High,
            AlertLevel::High,
            AlertLevel::High,
            AlertLevel::High,
            AlertLevel::Critical,
        ]
    );
}

#[tokio::test]
async fn test_disk_alert_delivered_to_webhook() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/slack"))
        .and(body_partial_json(serde_json::json!({
            "attachments": [{
                "title": "CRITICAL Alert",
                "text": "Critical Disk Usage: Disk at 96.5%"
            }]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fakes = Fakes::new([sample(10.0, 10.0, 96.5)]);
    let notifier = Arc::new(AlertManager::new(
        vec![Alert::Webhook(Webhook {
            url: format!("{}/slack", mock_server.uri()),
        })],
        "test-host",
    ));

    let (report_tx, mut report_rx) = broadcast::channel(64);
    let alerts = AlertHandle::spawn(notifier, report_tx.subscribe());
    let monitor = MonitorHandle::spawn(fakes.monitor(&Config::default()), NEVER, report_tx);

    let report = report_rx.recv().await.unwrap();
    assert_eq!(report.alerts[0].level, AlertLevel::Critical);

    monitor.shutdown().await.unwrap();
    alerts.shutdown().await;
    // MockServer verifies the expectation on drop
}

#[tokio::test]
async fn test_muted_alerts_are_not_delivered() {
    let fakes = Fakes::new([sample(95.0, 10.0, 10.0)]);
    let notifier = Arc::new(RecordingNotifier::default());

    let (report_tx, mut report_rx) = broadcast::channel(64);
    let alerts = AlertHandle::spawn(notifier.clone(), report_tx.subscribe());
    alerts.mute(None).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    let monitor = MonitorHandle::spawn(fakes.monitor(&Config::default()), NEVER, report_tx);
    let report = report_rx.recv().await.unwrap();
    assert_eq!(report.alerts.len(), 1);

    monitor.shutdown().await.unwrap();
    alerts.shutdown().await;

    assert!(notifier.sent.lock().await.is_empty());
}

#[tokio::test]
async fn test_agent_lifecycle_with_file_recorder() {
    let dir = tempfile::tempdir().unwrap();
    let logging = LoggingConfig {
        events_file: dir.path().join("server_events.json"),
        metrics_file: dir.path().join("server_metrics.csv"),
        trends_file: dir.path().join("performance_trends.csv"),
    };

    let fakes = Fakes::new([sample(30.0, 40.0, 82.0), sample(31.0, 40.0, 85.0)]);
    let file_recorder = Arc::new(FileRecorder::new(&logging).await.unwrap());

    let (report_tx, mut report_rx) = broadcast::channel(64);
    let recorder = RecorderHandle::spawn(file_recorder, report_tx.subscribe());
    assert!(recorder.record_system("Automation suite started").await.unwrap());

    let monitor = MonitorHandle::spawn(fakes.monitor(&Config::default()), NEVER, report_tx);
    monitor.run_cycle_now().await.unwrap();
    report_rx.recv().await.unwrap();
    report_rx.recv().await.unwrap();

    monitor.shutdown().await.unwrap();
    assert!(recorder.record_system("Automation suite stopped").await.unwrap());
    recorder.shutdown().await;

    let metrics = std::fs::read_to_string(&logging.metrics_file).unwrap();
    assert_eq!(metrics.lines().count(), 3);
    assert_eq!(
        metrics.lines().next(),
        Some("timestamp,cpu,memory,disk,network_sent,network_recv")
    );

    let events: Vec<serde_json::Value> = std::fs::read_to_string(&logging.events_file)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let types: Vec<_> = events.iter().map(|e| e["type"].as_str().unwrap()).collect();
    assert_eq!(types, vec!["system", "remediation", "remediation", "system"]);
    assert_eq!(events[1]["message"], "Cleared temporary files");
    assert_eq!(events[3]["message"], "Automation suite stopped");
}
