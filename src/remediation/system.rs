//! Capabilities backed by the local operating system

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};
use tokio::net::TcpStream;
use tokio::process::Command;
use tracing::{debug, instrument, trace};

use crate::ProcessInfo;

use super::capabilities::{CapabilityError, Prober, RemediationCapabilities, ServiceRestarter};

fn io_to_capability(err: std::io::Error, subject: impl std::fmt::Display) -> CapabilityError {
    match err.kind() {
        ErrorKind::PermissionDenied => CapabilityError::PermissionDenied(subject.to_string()),
        ErrorKind::NotFound => CapabilityError::NotFound(subject.to_string()),
        _ => CapabilityError::Io(err),
    }
}

fn cleanup_result(
    dir: &Path,
    removed: usize,
    failures: &[std::io::Error],
) -> Result<(), CapabilityError> {
    let Some(first) = failures.first() else {
        return Ok(());
    };

    let summary = format!(
        "{} of {} entries in {} could not be removed ({first})",
        failures.len(),
        removed + failures.len(),
        dir.display()
    );
    if failures.iter().any(|e| e.kind() == ErrorKind::PermissionDenied) {
        Err(CapabilityError::PermissionDenied(summary))
    } else {
        Err(CapabilityError::Other(summary))
    }
}

async fn blocking<T, F>(task: F) -> Result<T, CapabilityError>
where
    F: FnOnce() -> Result<T, CapabilityError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| CapabilityError::Other(format!("capability task failed: {e}")))?
}

fn process_table() -> System {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.refresh_processes(ProcessesToUpdate::All, true);
    sys
}

/// Process and temp storage actions on the local host
#[derive(Debug, Clone)]
pub struct SystemCapabilities {
    temp_dir: PathBuf,
}

impl SystemCapabilities {
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
        }
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }
}

#[async_trait]
impl RemediationCapabilities for SystemCapabilities {
    #[instrument(skip_all)]
    async fn list_zombie_processes(&self) -> Result<Vec<ProcessInfo>, CapabilityError> {
        blocking(|| {
            let sys = process_table();
            let zombies = sys
                .processes()
                .values()
                .filter(|process| process.status() == ProcessStatus::Zombie)
                .map(|process| ProcessInfo {
                    pid: process.pid().as_u32(),
                    name: process.name().to_string_lossy().into_owned(),
                    memory_percent: None,
                })
                .collect::<Vec<_>>();

            trace!("found {} zombie processes", zombies.len());
            Ok(zombies)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn kill_process(&self, pid: u32) -> Result<(), CapabilityError> {
        blocking(move || {
            let sys = process_table();
            let process = sys
                .process(Pid::from_u32(pid))
                .ok_or_else(|| CapabilityError::NotFound(format!("process {pid}")))?;

            if process.kill() {
                debug!("killed process {pid}");
                Ok(())
            } else {
                Err(CapabilityError::PermissionDenied(format!(
                    "could not signal process {pid}"
                )))
            }
        })
        .await
    }

    /// Remove everything inside the temp directory, keeping the directory itself.
    ///
    /// Entries that cannot be removed are skipped; the pass fails once all others were tried.
    #[instrument(skip(self), fields(dir = %self.temp_dir.display()))]
    async fn clear_temp_storage(&self) -> Result<(), CapabilityError> {
        let mut entries = tokio::fs::read_dir(&self.temp_dir)
            .await
            .map_err(|e| io_to_capability(e, self.temp_dir.display()))?;

        let mut removed = 0usize;
        let mut failures = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_to_capability(e, self.temp_dir.display()))?
        {
            let path = entry.path();
            let result = match entry.file_type().await {
                Ok(file_type) if file_type.is_dir() => tokio::fs::remove_dir_all(&path).await,
                Ok(_) => tokio::fs::remove_file(&path).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => removed += 1,
                // another process cleaned it up first
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    trace!("could not remove {}: {e}", path.display());
                    failures.push(e);
                }
            }
        }

        debug!("removed {removed} entries, {} failed", failures.len());
        cleanup_result(&self.temp_dir, removed, &failures)
    }

    #[instrument(skip(self))]
    async fn list_top_memory_processes(
        &self,
        n: usize,
    ) -> Result<Vec<ProcessInfo>, CapabilityError> {
        blocking(move || {
            let sys = process_table();
            let total = sys.total_memory().max(1) as f64;

            let mut processes = sys
                .processes()
                .values()
                .map(|process| ProcessInfo {
                    pid: process.pid().as_u32(),
                    name: process.name().to_string_lossy().into_owned(),
                    memory_percent: Some(process.memory() as f64 / total * 100.0),
                })
                .collect::<Vec<_>>();

            processes.sort_by(|a, b| {
                b.memory_percent
                    .unwrap_or_default()
                    .total_cmp(&a.memory_percent.unwrap_or_default())
            });
            processes.truncate(n);
            Ok(processes)
        })
        .await
    }
}

/// Restarts services through `systemctl`
#[derive(Debug, Clone, Default)]
pub struct SystemdRestarter;

#[async_trait]
impl ServiceRestarter for SystemdRestarter {
    #[instrument(skip(self))]
    async fn restart_service(&self, name: &str, timeout: Duration) -> Result<(), CapabilityError> {
        let output = Command::new("sudo")
            .args(["systemctl", "restart", name])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(timeout, output)
            .await
            .map_err(|_| CapabilityError::Timeout(timeout))?
            .map_err(|e| io_to_capability(e, "sudo systemctl"))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(CapabilityError::CommandFailed(format!(
            "systemctl restart {name} exited with {}: {}",
            output.status,
            stderr.trim()
        )))
    }
}

/// Opens (and immediately drops) a TCP connection
#[derive(Debug, Clone, Default)]
pub struct TcpProber;

#[async_trait]
impl Prober for TcpProber {
    async fn probe_tcp(&self, host: &str, port: u16, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                trace!("{host}:{port} unreachable: {e}");
                false
            }
            Err(_) => {
                trace!("{host}:{port} timed out after {timeout:?}");
                false
            }
        }
    }
}
