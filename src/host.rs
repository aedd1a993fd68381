//! Per-host monitoring cycle
//!
//! ```text
//! collect → analyze (anomalies, trends) → remediate → probe services → decide alerts
//! ```
//!
//! A [`HostMonitor`] owns all state of one host (baseline, escalation counters, failure patterns),
//! so several hosts can be monitored from one process without sharing anything.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::{
    MetricSample,
    config::{Config, ServiceConfig},
    escalation::{AlertLevel, EscalationPolicy},
    health::ServiceHealthProber,
    monitors::{
        analysis::{CycleAnalysis, HostAnalyzer},
        collector::MetricsCollector,
        patterns::ErrorPatternTracker,
    },
    remediation::{
        Prober, RemediationCapabilities, RemediationEngine, RemediationOutcome, ServiceRestarter,
    },
};

pub const CPU_ALERT_THRESHOLD: f64 = 90.0;
pub const DISK_ALERT_THRESHOLD: f64 = 90.0;

/// Occurrences within the pattern window that make a failure worth an alert
pub const REPEATED_FAILURE_THRESHOLD: usize = 3;

/// External capabilities a [`HostMonitor`] drives
#[derive(Clone)]
pub struct Collaborators {
    pub collector: Arc<dyn MetricsCollector>,
    pub capabilities: Arc<dyn RemediationCapabilities>,
    pub prober: Arc<dyn Prober>,
    pub restarter: Arc<dyn ServiceRestarter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCheck {
    pub name: String,
    pub healthy: bool,
    /// `None` if no restart was needed
    pub restarted: Option<bool>,
}

/// Decision to notify about an issue at an escalated level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDecision {
    pub issue: String,
    pub level: AlertLevel,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub host: String,
    pub sample: MetricSample,
    pub analysis: CycleAnalysis,
    pub remediation: RemediationOutcome,
    pub services: Vec<ServiceCheck>,
    pub alerts: Vec<AlertDecision>,
}

pub struct HostMonitor {
    host: String,
    collaborators: Collaborators,
    services: Vec<ServiceConfig>,

    analyzer: HostAnalyzer,
    escalation: EscalationPolicy,
    remediation: RemediationEngine,
    health: ServiceHealthProber,
    patterns: ErrorPatternTracker,
}

impl HostMonitor {
    pub fn new(host: impl Into<String>, collaborators: Collaborators, config: &Config) -> Self {
        Self {
            host: host.into(),
            collaborators,
            services: config.services.clone(),
            analyzer: HostAnalyzer::new(),
            escalation: EscalationPolicy::new(),
            remediation: RemediationEngine::new(config.remediation.timeouts),
            health: ServiceHealthProber::new(config.health),
            patterns: ErrorPatternTracker::new(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn analyzer(&self) -> &HostAnalyzer {
        &self.analyzer
    }

    pub fn escalation(&self) -> &EscalationPolicy {
        &self.escalation
    }

    /// Run one full cycle.
    ///
    /// Fails only if no sample could be collected; every later step records its failures in the
    /// report instead.
    #[instrument(skip(self), fields(host = %self.host))]
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let sample = self
            .collaborators
            .collector
            .collect()
            .await
            .context("failed to collect metrics")?;

        info!(
            "CPU={:.1}% | Memory={:.1}% | Disk={:.1}%",
            sample.cpu_percent, sample.memory_percent, sample.disk_percent
        );

        let analysis = self.analyzer.analyze(&sample);
        for anomaly in &analysis.anomalies {
            warn!(
                "{} spike: {:.1} vs baseline {:.1} (+{})",
                anomaly.metric,
                anomaly.observed_value,
                anomaly.baseline_value,
                anomaly.increase_display()
            );
        }

        let remediation = self
            .remediation
            .remediate(&sample, self.collaborators.capabilities.as_ref())
            .await;

        let services = self.check_services().await;

        let mut alerts = self.threshold_alerts(&sample);
        alerts.extend(self.failure_alerts(&remediation, &services, sample.captured_at));

        Ok(CycleReport {
            host: self.host.clone(),
            sample,
            analysis,
            remediation,
            services,
            alerts,
        })
    }

    /// Probe every service concurrently and restart the unhealthy ones.
    async fn check_services(&self) -> Vec<ServiceCheck> {
        let health = &self.health;
        let prober = self.collaborators.prober.as_ref();
        let restarter = self.collaborators.restarter.as_ref();
        let timeout = health.config().probe_timeout();
        let max_attempts = health.config().max_attempts;

        let checks = self.services.iter().map(|service| async move {
            let healthy = health
                .is_healthy(prober, &service.host, service.port, timeout)
                .await;

            let restarted = if healthy {
                None
            } else {
                warn!("{} is down, restarting", service.name);
                Some(health.restart(&service.name, restarter, max_attempts).await)
            };

            ServiceCheck {
                name: service.name.clone(),
                healthy,
                restarted,
            }
        });

        join_all(checks).await
    }

    fn threshold_alerts(&mut self, sample: &MetricSample) -> Vec<AlertDecision> {
        let mut alerts = vec![];

        if sample.cpu_percent > CPU_ALERT_THRESHOLD {
            let level = self.escalation.escalate("high_cpu", AlertLevel::High);
            alerts.push(AlertDecision {
                issue: "high_cpu".to_string(),
                level,
                subject: "Critical CPU Usage".to_string(),
                message: format!("CPU at {:.1}%", sample.cpu_percent),
            });
        }

        if sample.disk_percent > DISK_ALERT_THRESHOLD {
            let level = self.escalation.escalate("high_disk", AlertLevel::Critical);
            alerts.push(AlertDecision {
                issue: "high_disk".to_string(),
                level,
                subject: "Critical Disk Usage".to_string(),
                message: format!("Disk at {:.1}%", sample.disk_percent),
            });
        }

        alerts
    }

    fn failure_alerts(
        &mut self,
        remediation: &RemediationOutcome,
        services: &[ServiceCheck],
        now: DateTime<Utc>,
    ) -> Vec<AlertDecision> {
        let failures = remediation
            .failures()
            .map(ToString::to_string)
            .chain(
                services
                    .iter()
                    .filter(|check| check.restarted == Some(false))
                    .map(|check| format!("Failed to restart {}", check.name)),
            )
            .collect::<Vec<_>>();

        let mut alerts = vec![];
        for failure in failures {
            let count = self.patterns.record(&failure, now);
            if count < REPEATED_FAILURE_THRESHOLD {
                continue;
            }

            let level = self
                .escalation
                .escalate("repeated_failure", AlertLevel::Medium);
            alerts.push(AlertDecision {
                issue: "repeated_failure".to_string(),
                level,
                subject: "Repeated Failure".to_string(),
                message: format!("{failure} ({count} times in the last 5 minutes)"),
            });
        }

        alerts
    }
}
