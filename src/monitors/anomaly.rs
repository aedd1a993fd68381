//! Spike detection against the adaptive baseline
//!
//! A metric is anomalous when it exceeds its baseline by more than 50%. The comparison is always
//! made against the baseline as it was *before* this cycle's observation was blended in.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::MetricSample;

use super::baseline::{Baseline, Metric};

/// Observed value must exceed `baseline * ANOMALY_FACTOR` to count as an anomaly
pub const ANOMALY_FACTOR: f64 = 1.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub metric: Metric,
    pub observed_value: f64,
    pub baseline_value: f64,
    /// `(observed / baseline - 1) * 100`, infinite for a zero baseline
    pub percent_increase: f64,
}

impl Anomaly {
    /// Increase formatted for display, e.g. `"60.0%"`.
    pub fn increase_display(&self) -> String {
        format!("{:.1}%", self.percent_increase)
    }
}

/// Owns the baseline of one host and reports spikes against it.
#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    baseline: Baseline,
}

impl AnomalyDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    /// Compare the sample against the baseline, then blend it in.
    ///
    /// Metrics seen for the first time only initialize their baseline. Every call updates the
    /// baseline, so observing the same sample twice moves it twice.
    pub fn observe(&mut self, sample: &MetricSample) -> Vec<Anomaly> {
        let mut anomalies = vec![];

        for metric in Metric::ALL {
            let observed = metric.read(sample);

            let Some(baseline_value) = self.baseline.get(metric) else {
                trace!("{metric}: initializing baseline at {observed:.2}");
                self.baseline.initialize(metric, observed);
                continue;
            };

            if observed > baseline_value * ANOMALY_FACTOR {
                let percent_increase = (observed / baseline_value - 1.0) * 100.0;
                anomalies.push(Anomaly {
                    metric,
                    observed_value: observed,
                    baseline_value,
                    percent_increase,
                });
            }

            self.baseline.blend(metric, observed);
            trace!(
                "{metric}: observed {observed:.2}, baseline {baseline_value:.2} -> {:.2}",
                self.baseline.get(metric).unwrap_or(baseline_value)
            );
        }

        anomalies
    }
}
