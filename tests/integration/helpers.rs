//! Fakes and fixtures shared by the integration tests

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use host_sentinel::{
    MetricSample, ProcessInfo,
    alerts::Notifier,
    config::{Config, ServiceConfig},
    escalation::AlertLevel,
    host::{Collaborators, HostMonitor},
    monitors::collector::MetricsCollector,
    remediation::{CapabilityError, Prober, RemediationCapabilities, ServiceRestarter},
};

pub fn sample(cpu: f64, memory: f64, disk: f64) -> MetricSample {
    MetricSample::from_usage(cpu, memory, disk)
}

pub fn service(name: &str, port: u16) -> ServiceConfig {
    ServiceConfig {
        name: name.to_string(),
        host: "localhost".to_string(),
        port,
    }
}

/// Hands out queued samples, failing once the queue is empty
#[derive(Default)]
pub struct ScriptedCollector {
    samples: Mutex<VecDeque<MetricSample>>,
}

impl ScriptedCollector {
    pub fn new(samples: impl IntoIterator<Item = MetricSample>) -> Self {
        Self {
            samples: Mutex::new(samples.into_iter().collect()),
        }
    }

    pub fn push(&self, sample: MetricSample) {
        self.samples.lock().unwrap().push_back(sample);
    }
}

#[async_trait]
impl MetricsCollector for ScriptedCollector {
    async fn collect(&self) -> anyhow::Result<MetricSample> {
        self.samples
            .lock()
            .unwrap()
            .pop_front()
            .context("sensor unavailable")
    }
}

#[derive(Default)]
pub struct FakeCapabilities {
    pub zombies: Vec<ProcessInfo>,
    pub top_memory: Vec<ProcessInfo>,
    pub fail_everything: bool,
    pub killed: Mutex<Vec<u32>>,
    pub temp_clears: Mutex<usize>,
}

impl FakeCapabilities {
    pub fn failing() -> Self {
        Self {
            fail_everything: true,
            ..Default::default()
        }
    }

    fn check(&self) -> Result<(), CapabilityError> {
        if self.fail_everything {
            Err(CapabilityError::PermissionDenied("not root".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemediationCapabilities for FakeCapabilities {
    async fn list_zombie_processes(&self) -> Result<Vec<ProcessInfo>, CapabilityError> {
        self.check()?;
        Ok(self.zombies.clone())
    }

    async fn kill_process(&self, pid: u32) -> Result<(), CapabilityError> {
        self.check()?;
        self.killed.lock().unwrap().push(pid);
        Ok(())
    }

    async fn clear_temp_storage(&self) -> Result<(), CapabilityError> {
        self.check()?;
        *self.temp_clears.lock().unwrap() += 1;
        Ok(())
    }

    async fn list_top_memory_processes(
        &self,
        n: usize,
    ) -> Result<Vec<ProcessInfo>, CapabilityError> {
        self.check()?;
        Ok(self.top_memory.iter().take(n).cloned().collect())
    }
}

/// Reports a fixed health per port (unknown ports are healthy), optionally after a delay
#[derive(Default)]
pub struct FakeProber {
    pub health: HashMap<u16, bool>,
    pub delay: Option<Duration>,
}

impl FakeProber {
    pub fn with_down(ports: &[u16]) -> Self {
        Self {
            health: ports.iter().map(|port| (*port, false)).collect(),
            delay: None,
        }
    }
}

#[async_trait]
impl Prober for FakeProber {
    async fn probe_tcp(&self, _host: &str, port: u16, _timeout: Duration) -> bool {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.health.get(&port).copied().unwrap_or(true)
    }
}

/// Fails the first `failures` restarts of each service, then succeeds
#[derive(Default)]
pub struct FakeRestarter {
    pub failures: usize,
    pub attempts: Mutex<HashMap<String, usize>>,
}

impl FakeRestarter {
    pub fn failing(failures: usize) -> Self {
        Self {
            failures,
            ..Default::default()
        }
    }

    pub fn attempts(&self, name: &str) -> usize {
        self.attempts.lock().unwrap().get(name).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ServiceRestarter for FakeRestarter {
    async fn restart_service(&self, name: &str, _timeout: Duration) -> Result<(), CapabilityError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let count = attempts.entry(name.to_string()).or_default();
            *count += 1;
            *count
        };

        if attempt <= self.failures {
            Err(CapabilityError::CommandFailed(format!("{name}: unit failed")))
        } else {
            Ok(())
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: tokio::sync::Mutex<Vec<(AlertLevel, String, String)>>,
}

impl RecordingNotifier {
    pub async fn levels(&self) -> Vec<AlertLevel> {
        self.sent.lock().await.iter().map(|(level, _, _)| *level).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, level: AlertLevel, subject: &str, message: &str) {
        self.sent
            .lock()
            .await
            .push((level, subject.to_string(), message.to_string()));
    }
}

pub struct Fakes {
    pub collector: Arc<ScriptedCollector>,
    pub capabilities: Arc<FakeCapabilities>,
    pub prober: Arc<FakeProber>,
    pub restarter: Arc<FakeRestarter>,
}

impl Fakes {
    pub fn new(samples: impl IntoIterator<Item = MetricSample>) -> Self {
        Self {
            collector: Arc::new(ScriptedCollector::new(samples)),
            capabilities: Arc::new(FakeCapabilities::default()),
            prober: Arc::new(FakeProber::default()),
            restarter: Arc::new(FakeRestarter::default()),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            collector: self.collector.clone(),
            capabilities: self.capabilities.clone(),
            prober: self.prober.clone(),
            restarter: self.restarter.clone(),
        }
    }

    pub fn monitor(&self, config: &Config) -> HostMonitor {
        HostMonitor::new("test-host", self.collaborators(), config)
    }
}
