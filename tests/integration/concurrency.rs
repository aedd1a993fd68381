//! Concurrency tests for service checks
//!
//! Probes and restarts of different services overlap within a cycle; restarts of the same
//! service never do.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use host_sentinel::{config::HealthConfig, health::ServiceHealthProber};
use tokio::time::Instant;

use crate::helpers::*;

#[tokio::test(start_paused = true)]
async fn test_probes_run_concurrently() {
    let mut fakes = Fakes::new([sample(10.0, 10.0, 10.0)]);
    fakes.prober = Arc::new(FakeProber {
        delay: Some(Duration::from_secs(2)),
        ..Default::default()
    });

    let config = host_sentinel::config::Config {
        services: (0..5).map(|i| service(&format!("svc-{i}"), 8000 + i)).collect(),
        ..Default::default()
    };
    let mut monitor = fakes.monitor(&config);

    let started = Instant::now();
    let report = monitor.run_cycle().await.unwrap();

    assert_eq!(report.services.len(), 5);
    assert!(report.services.iter().all(|check| check.healthy));
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_slow_probe_counts_as_down() {
    let mut fakes = Fakes::new([sample(10.0, 10.0, 10.0)]);
    // slower than the 3s probe timeout
    fakes.prober = Arc::new(FakeProber {
        delay: Some(Duration::from_secs(30)),
        ..Default::default()
    });

    let config = host_sentinel::config::Config {
        services: vec![service("api", 8080)],
        ..Default::default()
    };
    let mut monitor = fakes.monitor(&config);

    let report = monitor.run_cycle().await.unwrap();

    assert!(!report.services[0].healthy);
    assert_eq!(report.services[0].restarted, Some(true));
    assert_eq!(fakes.restarter.attempts("api"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_restarts_of_one_service_are_serialized() {
    let health = Arc::new(ServiceHealthProber::new(HealthConfig::default()));
    let restarter = Arc::new(FakeRestarter::default());

    let started = Instant::now();
    let results = join_all((0..3).map(|_| {
        let health = health.clone();
        let restarter = restarter.clone();
        async move { health.restart("nginx", restarter.as_ref(), 3).await }
    }))
    .await;

    assert_eq!(results, vec![true, true, true]);
    assert_eq!(restarter.attempts("nginx"), 3);
    // three settle delays back to back
    assert!(started.elapsed() >= Duration::from_secs(9));
}
