use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::MetricSample;

/// Weight of the previous baseline when blending in a new observation.
pub const BASELINE_RETENTION: f64 = 0.9;

/// Weight of the new observation when blending.
pub const OBSERVATION_WEIGHT: f64 = 0.1;

/// Resource metrics that are tracked against a baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Cpu,
    Memory,
    Disk,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Cpu, Metric::Memory, Metric::Disk];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Cpu => "cpu",
            Metric::Memory => "memory",
            Metric::Disk => "disk",
        }
    }

    /// Read this metric from a sample.
    ///
    /// NaN is read as 0 and everything else is clamped into [0, 100], so a broken counter
    /// never poisons the baseline.
    pub fn read(&self, sample: &MetricSample) -> f64 {
        let raw = match self {
            Metric::Cpu => sample.cpu_percent,
            Metric::Memory => sample.memory_percent,
            Metric::Disk => sample.disk_percent,
        };

        if raw.is_nan() {
            0.0
        } else {
            raw.clamp(0.0, 100.0)
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Adaptive reference value per metric.
///
/// Absent until the first sample is seen, then moved towards every observation with an
/// exponential moving average.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Baseline {
    values: BTreeMap<Metric, f64>,
}

impl Baseline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.values.get(&metric).copied()
    }

    pub fn is_initialized(&self) -> bool {
        !self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        self.values.iter().map(|(metric, value)| (*metric, *value))
    }

    /// Store the value for a metric that has no baseline yet.
    ///
    /// Returns `true` if the metric was newly initialized.
    pub fn initialize(&mut self, metric: Metric, value: f64) -> bool {
        if self.values.contains_key(&metric) {
            return false;
        }
        self.values.insert(metric, value);
        true
    }

    /// Blend an observation into an existing baseline value.
    ///
    /// Metrics without a baseline are left untouched.
    pub fn blend(&mut self, metric: Metric, observed: f64) {
        if let Some(value) = self.values.get_mut(&metric) {
            *value = *value * BASELINE_RETENTION + observed * OBSERVATION_WEIGHT;
        }
    }

    /// Blend every tracked metric present in the sample.
    pub fn update(&mut self, sample: &MetricSample) {
        for metric in Metric::ALL {
            self.blend(metric, metric.read(sample));
        }
    }
}
