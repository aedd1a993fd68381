use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::MetricSample;

use super::baseline::{Baseline, Metric};

/// Absolute percentage points a metric has to drift from its baseline to count as a trend
pub const TREND_THRESHOLD: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendVerdict {
    Increasing,
    Decreasing,
    Stable,
}

impl TrendVerdict {
    pub fn from_diff(diff: f64) -> TrendVerdict {
        if diff > TREND_THRESHOLD {
            TrendVerdict::Increasing
        } else if diff < -TREND_THRESHOLD {
            TrendVerdict::Decreasing
        } else {
            TrendVerdict::Stable
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendVerdict::Increasing => "increasing",
            TrendVerdict::Decreasing => "decreasing",
            TrendVerdict::Stable => "stable",
        }
    }
}

impl fmt::Display for TrendVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies drift of each metric relative to a baseline snapshot.
///
/// Stateless: it only reads the baseline it is handed, so anomaly detection and trend
/// classification can share the same snapshot for a cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrendClassifier;

impl TrendClassifier {
    /// Verdicts for every metric that already has a baseline value.
    pub fn classify(baseline: &Baseline, sample: &MetricSample) -> BTreeMap<Metric, TrendVerdict> {
        Metric::ALL
            .into_iter()
            .filter_map(|metric| {
                let reference = baseline.get(metric)?;
                let diff = metric.read(sample) - reference;
                Some((metric, TrendVerdict::from_diff(diff)))
            })
            .collect()
    }
}
