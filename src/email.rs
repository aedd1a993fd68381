//! SMTP delivery for alerts
//!
//! Mail goes out through STARTTLS on the configured relay. The login defaults to the sender
//! address; without a password the relay is used unauthenticated.

use std::time::Duration;

use chrono::Utc;
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::alerts::DELIVERY_TIMEOUT;
use crate::config::Email;
use crate::escalation::AlertLevel;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("no recipients configured")]
    NoRecipients,

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone)]
pub struct EmailManager {
    host: String,
    timeout: Duration,
}

impl EmailManager {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            timeout: DELIVERY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Plain text mail with subject `[LEVEL] subject`
    pub fn build_alert_message(
        &self,
        email: &Email,
        level: AlertLevel,
        subject: &str,
        message: &str,
    ) -> Result<Message, EmailError> {
        if email.recipients.is_empty() {
            return Err(EmailError::NoRecipients);
        }

        let level = level.as_str().to_uppercase();
        let mut builder = Message::builder()
            .from(email.sender.parse::<Mailbox>()?)
            .subject(format!("[{level}] {subject}"))
            .header(ContentType::TEXT_PLAIN);

        for recipient in &email.recipients {
            builder = builder.to(recipient.parse::<Mailbox>()?);
        }

        let body = format!(
            "Level: {level}\nTime: {}\nHost: {}\n\n{message}\n",
            Utc::now().to_rfc3339(),
            self.host
        );
        Ok(builder.body(body)?)
    }

    /// Returns whether the relay accepted the mail
    #[instrument(skip(self, email, message), fields(relay = %email.smtp_server))]
    pub async fn send(&self, email: &Email, level: AlertLevel, subject: &str, message: &str) -> bool {
        match self.try_send(email, level, subject, message).await {
            Ok(()) => {
                info!("Successfully sent email alert");
                true
            }
            Err(e) => {
                error!("Failed to send email alert: {e}");
                false
            }
        }
    }

    async fn try_send(
        &self,
        email: &Email,
        level: AlertLevel,
        subject: &str,
        message: &str,
    ) -> Result<(), EmailError> {
        let mail = self.build_alert_message(email, level, subject, message)?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&email.smtp_server)?
            .port(email.smtp_port)
            .timeout(Some(self.timeout));
        if let Some(password) = &email.password {
            let login = email.username.clone().unwrap_or_else(|| email.sender.clone());
            builder = builder.credentials(Credentials::new(login, password.clone()));
        }
        let transport: AsyncSmtpTransport<Tokio1Executor> = builder.build();

        tokio::time::timeout(self.timeout, transport.send(mail))
            .await
            .map_err(|_| EmailError::Timeout(self.timeout))??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn email() -> Email {
        Email {
            smtp_server: "smtp.example.com".to_string(),
            smtp_port: 587,
            sender: "sentinel@example.com".to_string(),
            username: None,
            password: Some("secret".to_string()),
            recipients: vec!["ops@example.com".to_string(), "oncall@example.com".to_string()],
        }
    }

    #[test]
    fn test_alert_message_layout() {
        let manager = EmailManager::new("web-1");
        let message = manager
            .build_alert_message(&email(), AlertLevel::High, "Critical CPU Usage", "CPU at 95.0%")
            .unwrap();

        assert_eq!(message.envelope().to().len(), 2);
        assert_eq!(
            message.envelope().from().map(ToString::to_string).as_deref(),
            Some("sentinel@example.com")
        );

        let formatted = String::from_utf8(message.formatted()).unwrap();
        assert!(formatted.contains("Subject: [HIGH] Critical CPU Usage"));
        assert!(formatted.contains("Level: HIGH"));
        assert!(formatted.contains("Host: web-1"));
        assert!(formatted.contains("CPU at 95.0%"));
    }

    #[test]
    fn test_invalid_addresses_rejected() {
        let manager = EmailManager::new("web-1");

        let bad_sender = Email {
            sender: "not an address".to_string(),
            ..email()
        };
        assert_matches!(
            manager.build_alert_message(&bad_sender, AlertLevel::Low, "s", "m"),
            Err(EmailError::Address(_))
        );

        let nobody = Email {
            recipients: vec![],
            ..email()
        };
        assert_matches!(
            manager.build_alert_message(&nobody, AlertLevel::Low, "s", "m"),
            Err(EmailError::NoRecipients)
        );
    }

    #[tokio::test]
    async fn test_unreachable_relay_is_logged_not_raised() {
        let manager = EmailManager::new("web-1").with_timeout(Duration::from_millis(500));
        let relay = Email {
            smtp_server: "127.0.0.1".to_string(),
            smtp_port: 9,
            ..email()
        };

        assert!(!manager.send(&relay, AlertLevel::Critical, "Critical Disk Usage", "Disk at 97.0%").await);
    }
}
