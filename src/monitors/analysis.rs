use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::MetricSample;

use super::anomaly::{Anomaly, AnomalyDetector};
use super::baseline::{Baseline, Metric};
use super::trend::{TrendClassifier, TrendVerdict};

/// Result of analysing one sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleAnalysis {
    pub anomalies: Vec<Anomaly>,
    pub trends: BTreeMap<Metric, TrendVerdict>,
}

/// Per-host analysis state.
///
/// Trends are classified against the same pre-update baseline snapshot the anomaly detector
/// compares against, and the baseline is blended exactly once per call to [`HostAnalyzer::analyze`].
#[derive(Debug, Clone, Default)]
pub struct HostAnalyzer {
    detector: AnomalyDetector,
}

impl HostAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn baseline(&self) -> &Baseline {
        self.detector.baseline()
    }

    #[instrument(skip_all)]
    pub fn analyze(&mut self, sample: &MetricSample) -> CycleAnalysis {
        let trends = TrendClassifier::classify(self.detector.baseline(), sample);
        let anomalies = self.detector.observe(sample);

        if !anomalies.is_empty() {
            debug!("{} anomalies detected", anomalies.len());
        }

        CycleAnalysis { anomalies, trends }
    }
}
