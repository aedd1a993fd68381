use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::alerts::DELIVERY_TIMEOUT;
use crate::config::Discord;
use crate::escalation::AlertLevel;

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Default)]
pub struct MessageBuilder {
    content: Option<String>,
    embeds: Vec<Embed>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: impl ToString) -> Self {
        self.content = Some(content.to_string());
        self
    }

    pub fn add_embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn build(self) -> Message {
        Message {
            content: self.content,
            embeds: self.embeds,
        }
    }
}

/// Embed colour for an alert level
pub fn level_color(level: AlertLevel) -> u32 {
    match level {
        AlertLevel::Low => 3066993,       // Green
        AlertLevel::Medium => 15105570,   // Orange
        AlertLevel::High => 15158332,     // Red
        AlertLevel::Critical => 10038562, // Dark red
    }
}

fn level_emoji(level: AlertLevel) -> &'static str {
    match level {
        AlertLevel::Low => "ℹ️",
        AlertLevel::Medium => "⚠️",
        AlertLevel::High => "🔥",
        AlertLevel::Critical => "🚨",
    }
}

#[derive(Debug, Clone)]
pub struct DiscordManager {
    client: Client,
    host: String,
    timeout: Duration,
}

impl DiscordManager {
    pub fn new(client: Client, host: impl Into<String>) -> Self {
        Self {
            client,
            host: host.into(),
            timeout: DELIVERY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build_alert_embed(&self, level: AlertLevel, subject: &str, message: &str) -> Embed {
        Embed {
            title: Some(format!("{} {subject}", level_emoji(level))),
            description: Some(message.to_string()),
            color: Some(level_color(level)),
            fields: vec![EmbedField {
                name: "Level".to_string(),
                value: level.as_str().to_uppercase(),
                inline: true,
            }],
            footer: Some(EmbedFooter {
                text: format!("Host: {}", self.host),
            }),
            timestamp: Some(Utc::now().to_rfc3339()),
        }
    }

    pub fn build_alert_message(
        &self,
        discord: &Discord,
        level: AlertLevel,
        subject: &str,
        message: &str,
    ) -> Message {
        let mut builder =
            MessageBuilder::new().add_embed(self.build_alert_embed(level, subject, message));

        if let Some(user_id) = &discord.user_id {
            builder = builder.content(format!(
                "{} ({} ~ {}) <@{user_id}>",
                level_emoji(level),
                self.host,
                level.as_str().to_uppercase()
            ));
        }

        builder.build()
    }

    /// Returns whether Discord accepted the message
    #[instrument(skip(self, discord, message))]
    pub async fn send_message(&self, discord: &Discord, message: &Message) -> bool {
        let request = self
            .client
            .post(&discord.url)
            .timeout(self.timeout)
            .json(message);

        match request.send().await {
            Ok(response) => {
                if response.status().is_success() {
                    info!("Successfully sent Discord message");
                    true
                } else {
                    error!("Discord message failed with status: {}", response.status());
                    if let Ok(error_text) = response.text().await {
                        error!("Discord API error response: {}", error_text);
                    }
                    false
                }
            }
            Err(e) => {
                error!("Failed to send Discord message: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mention_only_with_user_id() {
        let manager = DiscordManager::new(Client::new(), "web-1");
        let discord = Discord {
            url: "http://localhost".to_string(),
            user_id: None,
        };

        let message = manager.build_alert_message(&discord, AlertLevel::High, "Critical CPU Usage", "CPU at 95.0%");
        assert!(message.content.is_none());
        assert_eq!(message.embeds.len(), 1);
        assert_eq!(message.embeds[0].color, Some(level_color(AlertLevel::High)));

        let discord = Discord {
            user_id: Some("42".to_string()),
            ..discord
        };
        let message = manager.build_alert_message(&discord, AlertLevel::Critical, "Critical Disk Usage", "Disk at 97.0%");
        assert_eq!(message.content.as_deref(), Some("🚨 (web-1 ~ CRITICAL) <@42>"));
    }

    #[test]
    fn test_embed_serialization_skips_empty_fields() {
        let message = MessageBuilder::new().content("hello").build();
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json, serde_json::json!({ "content": "hello" }));
    }
}
