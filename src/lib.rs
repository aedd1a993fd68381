pub mod actors;
pub mod alerts;
pub mod config;
pub mod discord;
pub mod email;
pub mod escalation;
pub mod health;
pub mod host;
pub mod monitors;
pub mod remediation;
pub mod storage;
pub mod util;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One snapshot of observed resource usage on a host.
///
/// Created once per cycle by a [`monitors::collector::MetricsCollector`] and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
    /// Bytes sent since the collector was started
    pub network_sent_delta: u64,
    /// Bytes received since the collector was started
    pub network_recv_delta: u64,
    pub process_count: u64,
    pub captured_at: DateTime<Utc>,
}

impl MetricSample {
    /// Build a sample with zero network traffic and no processes, captured now.
    pub fn from_usage(cpu_percent: f64, memory_percent: f64, disk_percent: f64) -> Self {
        Self {
            cpu_percent,
            memory_percent,
            disk_percent,
            network_sent_delta: 0,
            network_recv_delta: 0,
            process_count: 0,
            captured_at: Utc::now(),
        }
    }
}

/// A process as reported by the remediation capabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    /// Share of total memory, only filled in for top-memory listings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_percent: Option<f64>,
}
