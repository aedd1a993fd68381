//! File backed recorder
//!
//! - events: one JSON object per line (`timestamp`, `type`, `message`, `metadata`)
//! - metrics: CSV `timestamp,cpu,memory,disk,network_sent,network_recv`
//! - trends: CSV `timestamp,metric,value,trend`
//!
//! CSV headers are written only when the file is created, so restarting the agent keeps
//! appending to the same files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use super::backend::{Event, Recorder};
use super::error::StorageResult;
use crate::MetricSample;
use crate::config::LoggingConfig;
use crate::monitors::{baseline::Metric, trend::TrendVerdict};

const METRICS_HEADER: &str = "timestamp,cpu,memory,disk,network_sent,network_recv";
const TRENDS_HEADER: &str = "timestamp,metric,value,trend";

pub struct FileRecorder {
    events_file: PathBuf,
    metrics_file: PathBuf,
    trends_file: PathBuf,

    /// Serializes appends so lines from concurrent writers never interleave
    write_lock: Mutex<()>,
}

impl FileRecorder {
    /// Create the recorder, writing CSV headers for files that do not exist yet.
    pub async fn new(config: &LoggingConfig) -> StorageResult<Self> {
        init_csv(&config.metrics_file, METRICS_HEADER).await?;
        init_csv(&config.trends_file, TRENDS_HEADER).await?;

        debug!(
            "recording events to {}, metrics to {}, trends to {}",
            config.events_file.display(),
            config.metrics_file.display(),
            config.trends_file.display()
        );

        Ok(Self {
            events_file: config.events_file.clone(),
            metrics_file: config.metrics_file.clone(),
            trends_file: config.trends_file.clone(),
            write_lock: Mutex::new(()),
        })
    }

    pub fn events_file(&self) -> &Path {
        &self.events_file
    }

    async fn append(&self, path: &Path, line: &str) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut file = OpenOptions::new().create(true).append(true).open(path).await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }
}

async fn init_csv(path: &Path, header: &str) -> StorageResult<()> {
    if tokio::fs::try_exists(path).await? {
        return Ok(());
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    tokio::fs::write(path, format!("{header}\n")).await?;
    Ok(())
}

#[async_trait]
impl Recorder for FileRecorder {
    #[instrument(skip_all, fields(kind = %event.kind))]
    async fn record_event(&self, event: Event) -> StorageResult<()> {
        let line = serde_json::to_string(&event)?;
        self.append(&self.events_file, &line).await
    }

    async fn record_metric(&self, sample: &MetricSample) -> StorageResult<()> {
        let line = format!(
            "{},{},{},{},{},{}",
            sample.captured_at.to_rfc3339(),
            sample.cpu_percent,
            sample.memory_percent,
            sample.disk_percent,
            sample.network_sent_delta,
            sample.network_recv_delta
        );
        self.append(&self.metrics_file, &line).await
    }

    async fn record_trend(
        &self,
        metric: Metric,
        value: f64,
        verdict: TrendVerdict,
    ) -> StorageResult<()> {
        let line = format!("{},{metric},{value},{verdict}", Utc::now().to_rfc3339());
        self.append(&self.trends_file, &line).await
    }
}
