//! Metric collection from the local operating system

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sysinfo::{Disks, Networks, System};
use tracing::{instrument, trace};

use crate::MetricSample;

/// Source of one [`MetricSample`] per cycle
#[async_trait]
pub trait MetricsCollector: Send + Sync {
    async fn collect(&self) -> Result<MetricSample>;
}

/// Network byte counters summed over all interfaces
#[derive(Debug, Clone, Copy, Default)]
struct NetworkTotals {
    sent: u64,
    received: u64,
}

impl NetworkTotals {
    fn read() -> Self {
        let networks = Networks::new_with_refreshed_list();
        networks
            .iter()
            .fold(NetworkTotals::default(), |acc, (_, data)| NetworkTotals {
                sent: acc.sent.saturating_add(data.total_transmitted()),
                received: acc.received.saturating_add(data.total_received()),
            })
    }
}

/// Collects metrics through `sysinfo`.
///
/// Network traffic is reported relative to the counters at construction time.
#[derive(Debug, Clone)]
pub struct SysinfoCollector {
    network_start: NetworkTotals,
}

impl SysinfoCollector {
    pub fn new() -> Self {
        Self {
            network_start: NetworkTotals::read(),
        }
    }

    fn sample(network_start: NetworkTotals) -> MetricSample {
        let mut sys = System::new_all();
        sys.refresh_all();
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        sys.refresh_cpu_usage();

        let memory_percent = if sys.total_memory() == 0 {
            0.0
        } else {
            sys.used_memory() as f64 / sys.total_memory() as f64 * 100.0
        };

        let network = NetworkTotals::read();

        MetricSample {
            cpu_percent: f64::from(sys.global_cpu_usage()),
            memory_percent,
            disk_percent: root_disk_usage(),
            network_sent_delta: network.sent.saturating_sub(network_start.sent),
            network_recv_delta: network.received.saturating_sub(network_start.received),
            process_count: sys.processes().len() as u64,
            captured_at: Utc::now(),
        }
    }
}

impl Default for SysinfoCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Usage of the disk mounted at `/`, or of the largest disk if there is none.
fn root_disk_usage() -> f64 {
    let disks = Disks::new_with_refreshed_list();

    let disk = disks
        .iter()
        .find(|disk| disk.mount_point() == Path::new("/"))
        .or_else(|| disks.iter().max_by_key(|disk| disk.total_space()));

    match disk {
        Some(disk) if disk.total_space() > 0 => {
            let used = disk.total_space().saturating_sub(disk.available_space());
            used as f64 / disk.total_space() as f64 * 100.0
        }
        _ => 0.0,
    }
}

#[async_trait]
impl MetricsCollector for SysinfoCollector {
    #[instrument(skip_all)]
    async fn collect(&self) -> Result<MetricSample> {
        let network_start = self.network_start;
        let sample = tokio::task::spawn_blocking(move || Self::sample(network_start))
            .await
            .context("metric collection task failed")?;

        trace!(
            "collected cpu={:.1}% memory={:.1}% disk={:.1}%",
            sample.cpu_percent, sample.memory_percent, sample.disk_percent
        );

        Ok(sample)
    }
}
