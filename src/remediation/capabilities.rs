//! External actions the remediation engine and the health prober rely on

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::ProcessInfo;

/// An injected external action failed
///
/// Always recoverable: callers record it and carry on with the cycle.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("command failed: {0}")]
    CommandFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Process and storage actions used by [`super::RemediationEngine`]
#[async_trait]
pub trait RemediationCapabilities: Send + Sync {
    async fn list_zombie_processes(&self) -> Result<Vec<ProcessInfo>, CapabilityError>;

    async fn kill_process(&self, pid: u32) -> Result<(), CapabilityError>;

    async fn clear_temp_storage(&self) -> Result<(), CapabilityError>;

    /// The `n` processes with the largest memory share, largest first
    async fn list_top_memory_processes(&self, n: usize)
    -> Result<Vec<ProcessInfo>, CapabilityError>;
}

/// Restarts a named service
#[async_trait]
pub trait ServiceRestarter: Send + Sync {
    async fn restart_service(&self, name: &str, timeout: Duration) -> Result<(), CapabilityError>;
}

/// Checks TCP reachability of a service
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe_tcp(&self, host: &str, port: u16, timeout: Duration) -> bool;
}
