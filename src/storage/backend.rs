//! Recorder trait definition
//!
//! This module defines the `Recorder` trait that all persistence
//! implementations must implement.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::StorageResult;
use crate::MetricSample;
use crate::monitors::{baseline::Metric, trend::TrendVerdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Agent lifecycle (start, stop)
    System,
    /// Service health checks
    Monitoring,
    Remediation,
    Anomaly,
    Alert,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::System => "system",
            EventKind::Monitoring => "monitoring",
            EventKind::Remediation => "remediation",
            EventKind::Anomaly => "anomaly",
            EventKind::Alert => "alert",
        };
        f.write_str(name)
    }
}

/// A single line in the event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub message: String,
    pub metadata: Value,
}

impl Event {
    pub fn new(kind: EventKind, message: impl Into<String>, metadata: Value) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            message: message.into(),
            metadata: if metadata.is_null() {
                Value::Object(Default::default())
            } else {
                metadata
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendRecord {
    pub timestamp: DateTime<Utc>,
    pub metric: Metric,
    pub value: f64,
    pub trend: TrendVerdict,
}

/// Persistence collaborator for cycle results
///
/// Implementations must be `Send + Sync` as they are shared with the
/// recorder actor task.
#[async_trait]
pub trait Recorder: Send + Sync {
    /// Append an event; `Value::Null` metadata is stored as an empty object
    async fn record_event(&self, event: Event) -> StorageResult<()>;

    async fn record_metric(&self, sample: &MetricSample) -> StorageResult<()>;

    async fn record_trend(
        &self,
        metric: Metric,
        value: f64,
        verdict: TrendVerdict,
    ) -> StorageResult<()>;

    /// Shorthand for a lifecycle event without metadata
    async fn record_system(&self, message: &str) -> StorageResult<()> {
        self.record_event(Event::new(EventKind::System, message, Value::Null))
            .await
    }
}
