//! Frequency based alert escalation
//!
//! Every call to [`EscalationPolicy::escalate`] counts one more occurrence of an issue. The count
//! decides the effective level:
//!
//! ```text
//! count 1      → requested level
//! count 3      → High
//! count >= 5   → Critical
//! otherwise    → requested level
//! ```
//!
//! Counts 2 and 4 fall back to the requested level even after count 3 forced `High`. Counters
//! never decay while the agent runs.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Low => "low",
            AlertLevel::Medium => "medium",
            AlertLevel::High => "high",
            AlertLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct EscalationPolicy {
    occurrences: HashMap<String, usize>,
}

impl EscalationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more occurrence of `issue` and return the level it should be reported at.
    pub fn escalate(&mut self, issue: &str, requested: AlertLevel) -> AlertLevel {
        let count = self.occurrences.entry(issue.to_string()).or_insert(0);
        *count += 1;

        let effective = match *count {
            1 => requested,
            3 => AlertLevel::High,
            n if n >= 5 => AlertLevel::Critical,
            _ => requested,
        };

        debug!("{issue}: occurrence {count}, requested {requested} -> {effective}");
        effective
    }

    pub fn occurrences(&self, issue: &str) -> usize {
        self.occurrences.get(issue).copied().unwrap_or_default()
    }
}
