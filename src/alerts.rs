use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, error, info, instrument};

use crate::config::{Alert, Webhook};
use crate::discord::DiscordManager;
use crate::email::EmailManager;
use crate::escalation::AlertLevel;

/// Delivers a notification at a given level
///
/// The monitoring core only decides whether and at which level to notify; delivery failures are
/// the notifier's business and never reach the caller.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, level: AlertLevel, subject: &str, message: &str);
}

/// Upper bound for a single delivery, connect included
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Attachment colour used for webhook alerts
pub fn webhook_color(level: AlertLevel) -> &'static str {
    match level {
        AlertLevel::Low => "#36a64f",
        AlertLevel::Medium => "#ff9900",
        AlertLevel::High => "#ff0000",
        AlertLevel::Critical => "#8b0000",
    }
}

/// Fans notifications out to every configured transport
#[derive(Debug, Clone)]
pub struct AlertManager {
    client: Client,
    alerts: Vec<Alert>,
    timeout: Duration,
    discord_manager: DiscordManager,
    email_manager: EmailManager,
}

impl AlertManager {
    pub fn new(alerts: Vec<Alert>, host: impl Into<String>) -> Self {
        let client = Client::new();
        let host = host.into();
        Self {
            discord_manager: DiscordManager::new(client.clone(), host.clone()),
            email_manager: EmailManager::new(host),
            client,
            alerts,
            timeout: DELIVERY_TIMEOUT,
        }
    }

    /// Override [`DELIVERY_TIMEOUT`] for every transport.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.discord_manager = self.discord_manager.with_timeout(timeout);
        self.email_manager = self.email_manager.with_timeout(timeout);
        self
    }

    /// Send to all transports and return how many accepted the alert.
    #[instrument(skip(self, message))]
    pub async fn send(&self, level: AlertLevel, subject: &str, message: &str) -> usize {
        if self.alerts.is_empty() {
            debug!("no alert transports configured");
            return 0;
        }

        let mut delivered = 0;
        for alert in &self.alerts {
            let ok = match alert {
                Alert::Discord(discord) => {
                    let payload =
                        self.discord_manager
                            .build_alert_message(discord, level, subject, message);
                    self.discord_manager.send_message(discord, &payload).await
                }
                Alert::Webhook(webhook) => {
                    self.send_webhook_alert(webhook, level, subject, message)
                        .await
                }
                Alert::Email(email) => self.email_manager.send(email, level, subject, message).await,
            };

            if ok {
                delivered += 1;
            }
        }

        delivered
    }

    #[instrument(skip(self, webhook, message))]
    async fn send_webhook_alert(
        &self,
        webhook: &Webhook,
        level: AlertLevel,
        subject: &str,
        message: &str,
    ) -> bool {
        let payload = json!({
            "attachments": [{
                "color": webhook_color(level),
                "title": format!("{} Alert", level.as_str().to_uppercase()),
                "text": format!("{subject}: {message}"),
                "ts": Utc::now().timestamp(),
            }]
        });

        let request = self
            .client
            .post(&webhook.url)
            .timeout(self.timeout)
            .json(&payload);

        match request.send().await {
            Ok(response) => {
                if response.status().is_success() {
                    info!("Successfully sent webhook alert");
                    true
                } else {
                    error!("Webhook alert failed with status: {}", response.status());
                    false
                }
            }
            Err(e) => {
                error!("Failed to send webhook alert: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl Notifier for AlertManager {
    async fn notify(&self, level: AlertLevel, subject: &str, message: &str) {
        let delivered = self.send(level, subject, message).await;
        debug!("{subject}: delivered to {delivered}/{} transports", self.alerts.len());
    }
}
