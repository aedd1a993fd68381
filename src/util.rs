use crate::config::{Alert, Config, Email, Webhook};

const SENTINEL_CONFIG: &str = "SENTINEL_CONFIG";

const DEFAULT_CONFIG: &str = "sentinel.json";

pub fn get_config_path() -> String {
    std::env::var(SENTINEL_CONFIG).unwrap_or_else(|_| String::from(DEFAULT_CONFIG))
}

const SENTINEL_INTERVAL: &str = "SENTINEL_INTERVAL";

pub fn get_interval() -> Option<u64> {
    let interval_from_env = std::env::var(SENTINEL_INTERVAL);
    interval_from_env
        .ok()
        .and_then(|res| res.parse().ok())
        .filter(|interval| *interval > 0)
}

const SLACK_WEBHOOK_URL: &str = "SLACK_WEBHOOK_URL";

pub fn get_webhook_url() -> Option<String> {
    std::env::var(SLACK_WEBHOOK_URL)
        .ok()
        .filter(|url| !url.trim().is_empty())
}

const SMTP_HOST: &str = "SMTP_HOST";
const SMTP_PORT: &str = "SMTP_PORT";
const SMTP_USER: &str = "SMTP_USER";
const SMTP_PASS: &str = "SMTP_PASS";
const EMAIL_FROM: &str = "EMAIL_FROM";
const EMAIL_TO: &str = "EMAIL_TO";

pub fn get_email_alert() -> Option<Email> {
    email_from(|key| std::env::var(key).ok())
}

/// Needs `SMTP_HOST`, `EMAIL_TO` (comma separated) and a sender from `EMAIL_FROM` or `SMTP_USER`.
fn email_from(lookup: impl Fn(&str) -> Option<String>) -> Option<Email> {
    let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    let smtp_server = var(SMTP_HOST)?;
    let recipients: Vec<String> = var(EMAIL_TO)?
        .split(',')
        .map(|recipient| recipient.trim().to_string())
        .filter(|recipient| !recipient.is_empty())
        .collect();
    if recipients.is_empty() {
        return None;
    }

    let username = var(SMTP_USER);
    let sender = var(EMAIL_FROM).or_else(|| username.clone())?;

    Some(Email {
        smtp_server,
        smtp_port: var(SMTP_PORT).and_then(|port| port.parse().ok()).unwrap_or(587),
        sender,
        username,
        password: var(SMTP_PASS),
        recipients,
    })
}

/// Add transports from the environment if the configuration has no alerts.
pub fn apply_env_alerts(config: &mut Config, webhook_url: Option<String>, email: Option<Email>) {
    if !config.alerts.is_empty() {
        return;
    }

    if let Some(url) = webhook_url {
        config.alerts.push(Alert::Webhook(Webhook { url }));
    }
    if let Some(email) = email {
        config.alerts.push(Alert::Email(email));
    }
}
