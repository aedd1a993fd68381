//! In-memory recorder (no persistence)
//!
//! Useful for tests and for running the agent without touching the filesystem.
//! All data is lost on restart.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::backend::{Event, Recorder, TrendRecord};
use super::error::StorageResult;
use crate::MetricSample;
use crate::monitors::{baseline::Metric, trend::TrendVerdict};

#[derive(Debug, Default)]
pub struct MemoryRecorder {
    events: RwLock<Vec<Event>>,
    metrics: RwLock<Vec<MetricSample>>,
    trends: RwLock<Vec<TrendRecord>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<Event> {
        self.events.read().await.clone()
    }

    pub async fn metrics(&self) -> Vec<MetricSample> {
        self.metrics.read().await.clone()
    }

    pub async fn trends(&self) -> Vec<TrendRecord> {
        self.trends.read().await.clone()
    }
}

#[async_trait]
impl Recorder for MemoryRecorder {
    async fn record_event(&self, event: Event) -> StorageResult<()> {
        self.events.write().await.push(event);
        Ok(())
    }

    async fn record_metric(&self, sample: &MetricSample) -> StorageResult<()> {
        self.metrics.write().await.push(sample.clone());
        Ok(())
    }

    async fn record_trend(
        &self,
        metric: Metric,
        value: f64,
        verdict: TrendVerdict,
    ) -> StorageResult<()> {
        self.trends.write().await.push(TrendRecord {
            timestamp: Utc::now(),
            metric,
            value,
            trend: verdict,
        });
        Ok(())
    }
}
