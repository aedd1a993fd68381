//! Service reachability checks and the bounded restart policy
//!
//! ## Restart policy
//!
//! ```text
//! attempt 1 ─ fail ─ backoff ─ attempt 2 ─ fail ─ backoff ─ attempt 3 ─ fail → false
//!     │                            │                            │
//!     └─ ok ─ settle → true        └─ ok ─ settle → true        └─ ok ─ settle → true
//! ```
//!
//! A successful restart is reported without probing the service again; the next cycle's health
//! check picks up a restart that did not help.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::config::HealthConfig;
use crate::remediation::{Prober, ServiceRestarter, bounded};

pub struct ServiceHealthProber {
    config: HealthConfig,

    /// One lock per service name, so restarts of the same service never overlap
    restart_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ServiceHealthProber {
    pub fn new(config: HealthConfig) -> Self {
        Self {
            config,
            restart_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// Whether a TCP connection to `host:port` can be opened within `timeout`.
    ///
    /// Nothing is cached; every call probes again.
    #[instrument(skip(self, prober))]
    pub async fn is_healthy(
        &self,
        prober: &dyn Prober,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> bool {
        let healthy = tokio::time::timeout(timeout, prober.probe_tcp(host, port, timeout))
            .await
            .unwrap_or(false);

        debug!("{host}:{port} healthy: {healthy}");
        healthy
    }

    /// Try to restart `service` up to `max_attempts` times.
    #[instrument(skip(self, restarter))]
    pub async fn restart(
        &self,
        service: &str,
        restarter: &dyn ServiceRestarter,
        max_attempts: u32,
    ) -> bool {
        let lock = self.lock_for(service);
        let _guard = lock.lock().await;

        let timeout = self.config.restart_timeout();

        for attempt in 1..=max_attempts {
            match bounded(timeout, restarter.restart_service(service, timeout)).await {
                Ok(()) => {
                    tokio::time::sleep(self.config.settle()).await;
                    info!("restarted {service} (attempt {attempt}/{max_attempts})");
                    return true;
                }
                Err(e) => {
                    warn!("restart of {service} failed (attempt {attempt}/{max_attempts}): {e}");
                    if attempt < max_attempts {
                        tokio::time::sleep(self.config.backoff()).await;
                    }
                }
            }
        }

        false
    }

    fn lock_for(&self, service: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .restart_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        locks.entry(service.to_string()).or_default().clone()
    }
}
