//! Failure tests for the monitoring cycle
//!
//! - Sensor failures
//! - Remediation capabilities refusing to work
//! - Services that stay down
//! - Repeated failures turning into alerts

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use host_sentinel::{
    MetricSample,
    actors::monitor::MonitorHandle,
    config::Config,
    escalation::AlertLevel,
    host::ServiceCheck,
    remediation::RemediationAction,
};
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::helpers::*;

fn config_with_services(ports: &[(&str, u16)]) -> Config {
    Config {
        services: ports.iter().map(|(name, port)| service(name, *port)).collect(),
        ..Config::default()
    }
}

#[tokio::test]
async fn test_monitor_survives_collection_failures() {
    let fakes = Fakes::new(Vec::<MetricSample>::new());
    let (report_tx, mut report_rx) = broadcast::channel(16);
    let monitor = MonitorHandle::spawn(
        fakes.monitor(&Config::default()),
        Duration::from_secs(3600),
        report_tx,
    );

    let err = monitor.run_cycle_now().await.unwrap_err();
    assert!(format!("{err:#}").contains("sensor unavailable"));

    // sensor comes back
    fakes.collector.push(sample(10.0, 10.0, 10.0));
    let report = monitor.run_cycle_now().await.unwrap();
    assert_eq!(report.sample.cpu_percent, 10.0);

    // only the successful cycle was published
    assert_eq!(report_rx.recv().await.unwrap(), report);
    assert!(report_rx.try_recv().is_err());

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_failed_capabilities_are_reported_not_raised() {
    let mut fakes = Fakes::new([sample(85.0, 90.0, 85.0)]);
    fakes.capabilities = Arc::new(FakeCapabilities::failing());
    let mut monitor = fakes.monitor(&Config::default());

    let report = monitor.run_cycle().await.unwrap();

    assert_eq!(report.remediation.actions.len(), 3);
    assert!(report.remediation.actions.iter().all(|a| a.is_failure()));
    assert_matches!(
        &report.remediation.actions[0],
        RemediationAction::ZombieScanFailed { error } if error.contains("permission denied")
    );
    assert_matches!(&report.remediation.actions[1], RemediationAction::TempClearFailed { .. });
    assert_matches!(&report.remediation.actions[2], RemediationAction::TopMemoryFailed { .. });
    assert!(report.alerts.is_empty());
}

#[tokio::test]
async fn test_zombies_are_killed_on_high_cpu() {
    let mut fakes = Fakes::new([sample(85.0, 10.0, 10.0)]);
    fakes.capabilities = Arc::new(FakeCapabilities {
        zombies: vec![
            host_sentinel::ProcessInfo {
                pid: 4242,
                name: "defunct".to_string(),
                memory_percent: None,
            },
        ],
        ..Default::default()
    });
    let mut monitor = fakes.monitor(&Config::default());

    let report = monitor.run_cycle().await.unwrap();

    assert_eq!(
        report.remediation.actions,
        vec![RemediationAction::ZombiesKilled {
            found: 1,
            killed: vec![4242]
        }]
    );
    assert_eq!(*fakes.capabilities.killed.lock().unwrap(), vec![4242]);
}

#[tokio::test(start_paused = true)]
async fn test_service_recovers_after_retry() {
    let mut fakes = Fakes::new([sample(10.0, 10.0, 10.0)]);
    fakes.prober = Arc::new(FakeProber::with_down(&[80]));
    fakes.restarter = Arc::new(FakeRestarter::failing(1));
    let mut monitor = fakes.monitor(&config_with_services(&[("nginx", 80), ("redis", 6379)]));

    let started = Instant::now();
    let report = monitor.run_cycle().await.unwrap();

    assert_eq!(
        report.services,
        vec![
            ServiceCheck {
                name: "nginx".to_string(),
                healthy: false,
                restarted: Some(true),
            },
            ServiceCheck {
                name: "redis".to_string(),
                healthy: true,
                restarted: None,
            },
        ]
    );
    assert_eq!(fakes.restarter.attempts("nginx"), 2);
    assert_eq!(fakes.restarter.attempts("redis"), 0);
    // one backoff, then the settle delay
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(8) && elapsed < Duration::from_secs(9));
}

#[tokio::test(start_paused = true)]
async fn test_service_that_stays_down_escalates() {
    let mut fakes = Fakes::new((0..3).map(|_| sample(10.0, 10.0, 10.0)));
    fakes.prober = Arc::new(FakeProber::with_down(&[5432]));
    fakes.restarter = Arc::new(FakeRestarter::failing(usize::MAX));
    let mut monitor = fakes.monitor(&config_with_services(&[("postgres", 5432)]));

    let first = monitor.run_cycle().await.unwrap();
    assert_eq!(first.services[0].restarted, Some(false));
    assert_eq!(fakes.restarter.attempts("postgres"), 3);
    assert!(first.alerts.is_empty());

    monitor.run_cycle().await.unwrap();
    let third = monitor.run_cycle().await.unwrap();

    assert_eq!(fakes.restarter.attempts("postgres"), 9);
    assert_eq!(third.alerts.len(), 1);
    assert_eq!(third.alerts[0].issue, "repeated_failure");
    assert_eq!(third.alerts[0].level, AlertLevel::Medium);
    assert!(third.alerts[0].message.starts_with("Failed to restart postgres"));
}

#[tokio::test]
async fn test_two_failures_do_not_alert() {
    let mut fakes = Fakes::new((0..2).map(|_| sample(10.0, 10.0, 85.0)));
    fakes.capabilities = Arc::new(FakeCapabilities::failing());
    let mut monitor = fakes.monitor(&Config::default());

    for _ in 0..2 {
        let report = monitor.run_cycle().await.unwrap();
        assert!(report.alerts.is_empty());
    }
}
