use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Seconds between two monitoring cycles
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Stop after this many seconds (runs until interrupted if unset)
    #[serde(default)]
    pub duration: Option<u64>,

    /// Services to probe and restart, checked on every cycle
    #[serde(default)]
    pub services: Vec<ServiceConfig>,

    #[serde(default)]
    pub alerts: Vec<Alert>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub remediation: RemediationConfig,

    #[serde(default)]
    pub health: HealthConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            duration: None,
            services: vec![],
            alerts: vec![],
            logging: LoggingConfig::default(),
            remediation: RemediationConfig::default(),
            health: HealthConfig::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval == 0 {
            return Err(ConfigError::Invalid("interval must be at least 1 second".into()));
        }

        for service in &self.services {
            if service.name.trim().is_empty() {
                return Err(ConfigError::Invalid("service name must not be empty".into()));
            }
            if service.port == 0 {
                return Err(ConfigError::Invalid(format!(
                    "service '{}' needs a non-zero port",
                    service.name
                )));
            }
        }

        if self.health.max_attempts == 0 {
            return Err(ConfigError::Invalid("health.max_attempts must be at least 1".into()));
        }

        let timeouts = [
            ("remediation.timeouts.process_secs", self.remediation.timeouts.process_secs),
            ("remediation.timeouts.cleanup_secs", self.remediation.timeouts.cleanup_secs),
            ("health.probe_timeout_secs", self.health.probe_timeout_secs),
            ("health.restart_timeout_secs", self.health.restart_timeout_secs),
        ];
        for (name, secs) in timeouts {
            if secs == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be at least 1 second")));
            }
        }

        for alert in &self.alerts {
            if let Alert::Email(email) = alert {
                if email.recipients.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "email alert via {} needs at least one recipient",
                        email.smtp_server
                    )));
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alert {
    Discord(Discord),
    Webhook(Webhook),
    Email(Email),
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Webhook {
    pub url: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Discord {
    pub url: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct Email {
    pub smtp_server: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub sender: String,
    /// SMTP login, the sender address if unset
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    pub recipients: Vec<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_events_file")]
    pub events_file: PathBuf,
    #[serde(default = "default_metrics_file")]
    pub metrics_file: PathBuf,
    #[serde(default = "default_trends_file")]
    pub trends_file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            events_file: default_events_file(),
            metrics_file: default_metrics_file(),
            trends_file: default_trends_file(),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RemediationConfig {
    /// Directory whose contents are removed when the disk fills up
    #[serde(default = "std::env::temp_dir")]
    pub temp_dir: PathBuf,
    #[serde(default)]
    pub timeouts: RemediationTimeouts,
}

impl Default for RemediationConfig {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir(),
            timeouts: RemediationTimeouts::default(),
        }
    }
}

/// Upper bounds for remediation capability calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub struct RemediationTimeouts {
    /// Zombie scan, kill, and top memory listing
    #[serde(default = "default_process_timeout")]
    pub process_secs: u64,
    /// Temporary storage cleanup
    #[serde(default = "default_cleanup_timeout")]
    pub cleanup_secs: u64,
}

impl RemediationTimeouts {
    pub fn process(&self) -> Duration {
        Duration::from_secs(self.process_secs)
    }

    pub fn cleanup(&self) -> Duration {
        Duration::from_secs(self.cleanup_secs)
    }
}

impl Default for RemediationTimeouts {
    fn default() -> Self {
        Self {
            process_secs: default_process_timeout(),
            cleanup_secs: default_cleanup_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
    #[serde(default = "default_restart_timeout")]
    pub restart_timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Wait after a failed restart before the next attempt
    #[serde(default = "default_backoff")]
    pub backoff_secs: u64,
    /// Wait after a successful restart before reporting success
    #[serde(default = "default_settle")]
    pub settle_secs: u64,
}

impl HealthConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn restart_timeout(&self) -> Duration {
        Duration::from_secs(self.restart_timeout_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            probe_timeout_secs: default_probe_timeout(),
            restart_timeout_secs: default_restart_timeout(),
            max_attempts: default_max_attempts(),
            backoff_secs: default_backoff(),
            settle_secs: default_settle(),
        }
    }
}

fn default_interval() -> u64 {
    10
}

fn default_host() -> String {
    String::from("localhost")
}

fn default_smtp_port() -> u16 {
    587
}

fn default_events_file() -> PathBuf {
    PathBuf::from("server_events.json")
}

fn default_metrics_file() -> PathBuf {
    PathBuf::from("server_metrics.csv")
}

fn default_trends_file() -> PathBuf {
    PathBuf::from("performance_trends.csv")
}

fn default_process_timeout() -> u64 {
    5
}

fn default_cleanup_timeout() -> u64 {
    30
}

fn default_probe_timeout() -> u64 {
    3
}

fn default_restart_timeout() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff() -> u64 {
    5
}

fn default_settle() -> u64 {
    3
}

pub fn read_config_file(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let file_content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&file_content)?;
    config.validate()?;
    trace!("loaded config: {config:?}");
    Ok(config)
}
