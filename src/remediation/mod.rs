//! Bounded automatic remediation
//!
//! Each rule is evaluated independently against the same sample:
//!
//! | Condition      | Action                                              |
//! |----------------|-----------------------------------------------------|
//! | `cpu > 80`     | kill zombie processes, if any                       |
//! | `disk > 80`    | clear temporary storage                             |
//! | `memory > 85`  | list the top 5 memory consumers (no termination)    |
//!
//! Capability failures never abort the pass. They are recorded as actions in the
//! [`RemediationOutcome`] and the remaining rules still run.

pub mod capabilities;
pub mod system;

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{MetricSample, ProcessInfo, config::RemediationTimeouts};

pub use capabilities::{CapabilityError, Prober, RemediationCapabilities, ServiceRestarter};

pub const CPU_THRESHOLD: f64 = 80.0;
pub const DISK_THRESHOLD: f64 = 80.0;
pub const MEMORY_THRESHOLD: f64 = 85.0;
pub const TOP_MEMORY_PROCESSES: usize = 5;

/// One action taken (or attempted) during a remediation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RemediationAction {
    ZombiesKilled { found: usize, killed: Vec<u32> },
    ZombieScanFailed { error: String },
    TempCleared,
    TempClearFailed { error: String },
    TopMemoryProcesses { processes: Vec<ProcessInfo> },
    TopMemoryFailed { error: String },
}

impl RemediationAction {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            RemediationAction::ZombieScanFailed { .. }
                | RemediationAction::TempClearFailed { .. }
                | RemediationAction::TopMemoryFailed { .. }
        )
    }

    /// Issue this action addresses, e.g. `high_cpu`
    pub fn issue(&self) -> &'static str {
        match self {
            RemediationAction::ZombiesKilled { .. } | RemediationAction::ZombieScanFailed { .. } => {
                "high_cpu"
            }
            RemediationAction::TempCleared | RemediationAction::TempClearFailed { .. } => {
                "high_disk"
            }
            RemediationAction::TopMemoryProcesses { .. }
            | RemediationAction::TopMemoryFailed { .. } => "high_memory",
        }
    }
}

impl fmt::Display for RemediationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemediationAction::ZombiesKilled { found, killed } => {
                write!(f, "Killed {} of {found} zombie processes", killed.len())
            }
            RemediationAction::ZombieScanFailed { error } => {
                write!(f, "Failed to scan for zombie processes: {error}")
            }
            RemediationAction::TempCleared => write!(f, "Cleared temporary files"),
            RemediationAction::TempClearFailed { error } => {
                write!(f, "Failed to clear temporary files: {error}")
            }
            RemediationAction::TopMemoryProcesses { processes } => {
                write!(f, "Top memory processes logged ({})", processes.len())
            }
            RemediationAction::TopMemoryFailed { error } => {
                write!(f, "Failed to list top memory processes: {error}")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemediationOutcome {
    pub actions: Vec<RemediationAction>,
}

impl RemediationOutcome {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn descriptions(&self) -> Vec<String> {
        self.actions.iter().map(ToString::to_string).collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &RemediationAction> {
        self.actions.iter().filter(|action| action.is_failure())
    }
}

/// Run a capability call under a timeout, folding an elapsed timer into the error.
pub(crate) async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, CapabilityError>
where
    F: Future<Output = Result<T, CapabilityError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(CapabilityError::Timeout(limit)))
}

#[derive(Debug, Clone, Default)]
pub struct RemediationEngine {
    timeouts: RemediationTimeouts,
}

impl RemediationEngine {
    pub fn new(timeouts: RemediationTimeouts) -> Self {
        Self { timeouts }
    }

    #[instrument(skip_all)]
    pub async fn remediate(
        &self,
        sample: &MetricSample,
        capabilities: &dyn RemediationCapabilities,
    ) -> RemediationOutcome {
        let mut outcome = RemediationOutcome::default();

        if sample.cpu_percent > CPU_THRESHOLD {
            if let Some(action) = self.kill_zombies(capabilities).await {
                outcome.actions.push(action);
            }
        }

        if sample.disk_percent > DISK_THRESHOLD {
            outcome.actions.push(self.clear_temp(capabilities).await);
        }

        if sample.memory_percent > MEMORY_THRESHOLD {
            outcome.actions.push(self.top_memory(capabilities).await);
        }

        for action in &outcome.actions {
            if action.is_failure() {
                warn!("{action}");
            } else {
                debug!("{action}");
            }
        }

        outcome
    }

    /// `None` when there were no zombies to kill
    async fn kill_zombies(
        &self,
        capabilities: &dyn RemediationCapabilities,
    ) -> Option<RemediationAction> {
        let limit = self.timeouts.process();

        let zombies = match bounded(limit, capabilities.list_zombie_processes()).await {
            Ok(zombies) => zombies,
            Err(e) => {
                return Some(RemediationAction::ZombieScanFailed {
                    error: e.to_string(),
                });
            }
        };

        if zombies.is_empty() {
            return None;
        }

        let mut killed = vec![];
        for zombie in &zombies {
            match bounded(limit, capabilities.kill_process(zombie.pid)).await {
                Ok(()) => killed.push(zombie.pid),
                Err(e) => warn!("failed to kill {} ({}): {e}", zombie.pid, zombie.name),
            }
        }

        Some(RemediationAction::ZombiesKilled {
            found: zombies.len(),
            killed,
        })
    }

    async fn clear_temp(&self, capabilities: &dyn RemediationCapabilities) -> RemediationAction {
        match bounded(self.timeouts.cleanup(), capabilities.clear_temp_storage()).await {
            Ok(()) => RemediationAction::TempCleared,
            Err(e) => RemediationAction::TempClearFailed {
                error: e.to_string(),
            },
        }
    }

    async fn top_memory(&self, capabilities: &dyn RemediationCapabilities) -> RemediationAction {
        let call = capabilities.list_top_memory_processes(TOP_MEMORY_PROCESSES);
        match bounded(self.timeouts.process(), call).await {
            Ok(processes) => RemediationAction::TopMemoryProcesses { processes },
            Err(e) => RemediationAction::TopMemoryFailed {
                error: e.to_string(),
            },
        }
    }
}
